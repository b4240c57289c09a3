//! Check/repair pipeline over a complete [`ReportBundle`].
//!
//! Checks are pure predicates. Every check has exactly one repair, and
//! repairs return a new bundle rather than touching the one they were
//! given. [`ControlLoop`] drives both under a bounded iteration budget.
//!
//! [`ReportBundle`]: crate::report::ReportBundle

pub mod checks;
pub mod control_loop;
pub mod gender;
pub mod repairs;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use checks::ValidationEngine;
pub use control_loop::{ControlLoop, ValidationOutcome};
pub use repairs::{RepairEngine, RepairOutcome};

/// The eight checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    GenderCondition,
    MacroAccuracy,
    NarrativeScoreConsistency,
    ActivityTrainingAlignment,
    FoodIntolerance,
    SupplementDedup,
    PlaceholderClean,
    IntegrityAudit,
}

impl CheckKind {
    pub const ALL: [CheckKind; 8] = [
        CheckKind::GenderCondition,
        CheckKind::MacroAccuracy,
        CheckKind::NarrativeScoreConsistency,
        CheckKind::ActivityTrainingAlignment,
        CheckKind::FoodIntolerance,
        CheckKind::SupplementDedup,
        CheckKind::PlaceholderClean,
        CheckKind::IntegrityAudit,
    ];

    /// Everything except the integrity audit.
    pub const NON_INTEGRITY: [CheckKind; 7] = [
        CheckKind::GenderCondition,
        CheckKind::MacroAccuracy,
        CheckKind::NarrativeScoreConsistency,
        CheckKind::ActivityTrainingAlignment,
        CheckKind::FoodIntolerance,
        CheckKind::SupplementDedup,
        CheckKind::PlaceholderClean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::GenderCondition => "gender_condition",
            CheckKind::MacroAccuracy => "macro_accuracy",
            CheckKind::NarrativeScoreConsistency => "narrative_score_consistency",
            CheckKind::ActivityTrainingAlignment => "activity_training_alignment",
            CheckKind::FoodIntolerance => "food_intolerance",
            CheckKind::SupplementDedup => "supplement_dedup",
            CheckKind::PlaceholderClean => "placeholder_clean",
            CheckKind::IntegrityAudit => "integrity_audit",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: "ok".to_string(),
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }

    /// Passes when `problems` is empty, otherwise fails with them joined.
    pub fn from_problems(kind: CheckKind, problems: &[String]) -> Self {
        if problems.is_empty() {
            Self::pass(kind.as_str())
        } else {
            Self::fail(kind.as_str(), problems.join("; "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Results of the last round that was evaluated.
    pub checks: Vec<CheckResult>,
    /// Distinct descriptions of every repair that changed the bundle.
    pub adjustments: Vec<String>,
    pub status: ValidationStatus,
    pub iterations: u32,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    /// `"<check>: <detail>"` for every failing check.
    pub fn failure_details(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| format!("{}: {}", c.name, c.detail))
            .collect()
    }
}
