//! The three request operations: meal plan, narratives and the full
//! validated report.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{load_food_catalog, FoodCatalog};
use crate::config::{PipelineConfig, MAX_PLAN_DAYS};
use crate::error::{ServiceError, ServiceResult};
use crate::meal_plan::{generate_meal_plan, MealPlanBundle};
use crate::narrative::{NarrativeComposer, NarrativeRewriter, Narratives, OpenRouterRewriter};
use crate::profile::{QuizAnswers, UserHealthProfile};
use crate::report::{ReportBundle, ReportMeta, ReportTier};
use crate::rules::{evaluate, RuleOutput};
use crate::validation::{ControlLoop, ValidationReport};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub profile: QuizAnswers,
    #[serde(default)]
    pub tier: ReportTier,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub add_ons: Vec<String>,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub num_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NarrativeBundle {
    pub narratives: Narratives,
    pub rules: RuleOutput,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullReport {
    pub bundle: ReportBundle,
    pub validation: ValidationReport,
}

pub struct ReportService {
    catalog: Arc<FoodCatalog>,
    config: PipelineConfig,
    composer: NarrativeComposer,
}

impl ReportService {
    pub fn new(
        catalog: Arc<FoodCatalog>,
        config: PipelineConfig,
        composer: NarrativeComposer,
    ) -> Self {
        Self {
            catalog,
            config,
            composer,
        }
    }

    /// Loads the catalog named by the config (or the embedded one) and wires
    /// the OpenRouter rewriter when `use_rewriter` is set and a key exists.
    pub fn from_config(config: PipelineConfig, use_rewriter: bool) -> anyhow::Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Arc::new(
                load_food_catalog(path)
                    .with_context(|| format!("Failed to load food catalog from '{}'", path.display()))?,
            ),
            None => FoodCatalog::builtin()?,
        };
        info!(entries = catalog.len(), "Food catalog ready");

        let rewriter = OpenRouterRewriter::new(&config.api_key_env_var, config.narrative_model.clone());
        let composer = if !use_rewriter {
            NarrativeComposer::templates_only()
        } else if rewriter.is_configured() {
            let rewriter: Arc<dyn NarrativeRewriter> = Arc::new(rewriter);
            NarrativeComposer::new(Some(rewriter))
        } else {
            warn!(
                env_var = %config.api_key_env_var,
                "No API key for the narrative service, using template narratives"
            );
            NarrativeComposer::templates_only()
        };

        Ok(Self::new(catalog, config, composer))
    }

    pub fn catalog(&self) -> &FoodCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn resolve_days(&self, requested: Option<u32>) -> ServiceResult<u32> {
        let days = requested.unwrap_or(self.config.default_days);
        if days == 0 || days > MAX_PLAN_DAYS {
            return Err(ServiceError::invalid_input(format!(
                "num_days must be between 1 and {}, got {}",
                MAX_PLAN_DAYS, days
            )));
        }
        Ok(days)
    }

    pub fn generate_meal_plan(
        &self,
        answers: &QuizAnswers,
        num_days: Option<u32>,
    ) -> ServiceResult<MealPlanBundle> {
        let days = self.resolve_days(num_days)?;
        let profile = UserHealthProfile::from_answers(answers)?;
        Ok(generate_meal_plan(&self.catalog, &profile, days))
    }

    pub async fn generate_narratives(
        &self,
        answers: &QuizAnswers,
    ) -> ServiceResult<NarrativeBundle> {
        let profile = UserHealthProfile::from_answers(answers)?;
        let rules = evaluate(&profile);
        let narratives = self.composer.compose(&profile, &rules).await;
        Ok(NarrativeBundle { narratives, rules })
    }

    pub async fn generate_full_report(&self, request: &ReportRequest) -> ServiceResult<FullReport> {
        let days = self.resolve_days(request.num_days)?;
        let profile = UserHealthProfile::from_answers(&request.profile)?;
        let rules = evaluate(&profile);
        let narratives = self.composer.compose(&profile, &rules).await;
        let meal_plan = generate_meal_plan(&self.catalog, &profile, days);
        let meta = ReportMeta {
            tier: request.tier,
            order_id: request.order_id.clone(),
            add_ons: request.add_ons.clone(),
        };
        let bundle = ReportBundle::new(profile, rules, narratives, meal_plan, meta);

        let outcome = ControlLoop::new(&self.catalog, self.config.validation.clone()).run(&bundle);
        if !outcome.report.passed() {
            return Err(ServiceError::ValidationExhausted {
                failures: outcome.report.failure_details(),
                report: Box::new(outcome.report),
            });
        }
        info!(
            tier = %request.tier,
            iterations = outcome.report.iterations,
            adjustments = outcome.report.adjustments.len(),
            "Full report generated"
        );
        Ok(FullReport {
            bundle: outcome.bundle,
            validation: outcome.report,
        })
    }
}
