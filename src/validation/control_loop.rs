use tracing::{debug, info, warn};

use crate::catalog::FoodCatalog;
use crate::config::ValidationConfig;
use crate::report::ReportBundle;

use super::{CheckKind, RepairEngine, ValidationEngine, ValidationReport, ValidationStatus};

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub bundle: ReportBundle,
    pub report: ValidationReport,
}

/// Bounded check -> repair loop.
///
/// The loop owns the current snapshot. Checks read it, repairs return a
/// replacement, and a repair that returns an identical bundle is not
/// recorded as an adjustment. The caller's bundle is never modified.
pub struct ControlLoop<'c> {
    validator: ValidationEngine<'c>,
    repairs: RepairEngine<'c>,
    config: ValidationConfig,
}

impl<'c> ControlLoop<'c> {
    pub fn new(catalog: &'c FoodCatalog, config: ValidationConfig) -> Self {
        Self {
            validator: ValidationEngine::new(catalog),
            repairs: RepairEngine::new(catalog),
            config,
        }
    }

    fn apply(&self, kind: CheckKind, current: ReportBundle, adjustments: &mut Vec<String>) -> ReportBundle {
        let outcome = self.repairs.repair(kind, &current);
        if outcome.bundle == current {
            debug!(check = %kind, "Repair left the bundle unchanged");
            return current;
        }
        for adjustment in outcome.adjustments {
            if !adjustments.contains(&adjustment) {
                adjustments.push(adjustment);
            }
        }
        outcome.bundle
    }

    pub fn run(&self, input: &ReportBundle) -> ValidationOutcome {
        let max_iterations = self.config.max_iterations.max(1);
        let mut current = input.clone();
        let mut adjustments = Vec::new();
        let mut iteration = 0u32;

        while iteration < max_iterations {
            iteration += 1;
            let checks = self.validator.run(&current, &CheckKind::ALL);
            let failed: Vec<CheckKind> = CheckKind::ALL
                .into_iter()
                .zip(&checks)
                .filter(|(_, result)| !result.passed)
                .map(|(kind, _)| kind)
                .collect();

            if failed.is_empty() {
                info!(iteration, adjustments = adjustments.len(), "Validation passed");
                return ValidationOutcome {
                    bundle: current,
                    report: ValidationReport {
                        checks,
                        adjustments,
                        status: ValidationStatus::Pass,
                        iterations: iteration,
                    },
                };
            }

            for result in checks.iter().filter(|r| !r.passed) {
                warn!(iteration, check = %result.name, detail = %result.detail, "Validation check failed");
            }

            if failed.contains(&CheckKind::IntegrityAudit) {
                current = self.apply(CheckKind::IntegrityAudit, current, &mut adjustments);
                if self.config.integrity_double_step {
                    iteration += 1;
                }
                continue;
            }

            for kind in failed {
                current = self.apply(kind, current, &mut adjustments);
            }
        }

        let final_kinds: &[CheckKind] = if self.config.final_pass_includes_integrity {
            &CheckKind::ALL
        } else {
            &CheckKind::NON_INTEGRITY
        };
        let checks = self.validator.run(&current, final_kinds);
        let status = if checks.iter().all(|c| c.passed) {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Fail
        };
        let iterations = iteration.min(max_iterations);
        match status {
            ValidationStatus::Pass => info!(iterations, "Validation passed on the final pass"),
            ValidationStatus::Fail => warn!(iterations, "Validation budget exhausted"),
        }

        ValidationOutcome {
            bundle: current,
            report: ValidationReport {
                checks,
                adjustments,
                status,
                iterations,
            },
        }
    }
}
