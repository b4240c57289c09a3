use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_NARRATIVE_MODEL: &str = "qwen/qwen3-32b";
pub const DEFAULT_PLAN_DAYS: u32 = 7;
pub const MAX_PLAN_DAYS: u32 = 14;

const DAYS_VAR: &str = "MEAL_PLAN_DAYS";
const MAX_ITERATIONS_VAR: &str = "VALIDATION_MAX_ITERATIONS";
const DOUBLE_STEP_VAR: &str = "VALIDATION_INTEGRITY_DOUBLE_STEP";
const FINAL_INTEGRITY_VAR: &str = "VALIDATION_FINAL_INCLUDES_INTEGRITY";
const MODEL_VAR: &str = "NARRATIVE_MODEL";
const CATALOG_PATH_VAR: &str = "FOOD_CATALOG_PATH";

/// Knobs for the check/repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Upper bound on loop iterations.
    pub max_iterations: u32,
    /// An integrity_audit failure consumes two iterations instead of one.
    pub integrity_double_step: bool,
    /// Whether the post-exhaustion pass re-runs integrity_audit. Off by
    /// default, so a final PASS only covers the other seven checks.
    pub final_pass_includes_integrity: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            integrity_double_step: true,
            final_pass_includes_integrity: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub default_days: u32,
    pub validation: ValidationConfig,
    pub narrative_model: String,
    pub api_key_env_var: String,
    /// `None` means the catalog embedded in the binary.
    pub catalog_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_days: DEFAULT_PLAN_DAYS,
            validation: ValidationConfig::default(),
            narrative_model: DEFAULT_NARRATIVE_MODEL.to_string(),
            api_key_env_var: API_KEY_ENV_VAR.to_string(),
            catalog_path: None,
        }
    }
}

fn parse_var<T>(name: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: '{}'", name, raw)),
        _ => Ok(None),
    }
}

impl PipelineConfig {
    /// Reads configuration from the process environment (after `.env`).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let default_days = parse_var::<u32>(DAYS_VAR, &lookup)?.unwrap_or(defaults.default_days);
        if default_days == 0 || default_days > MAX_PLAN_DAYS {
            return Err(anyhow!("{} must be between 1 and {}, got {}", DAYS_VAR, MAX_PLAN_DAYS, default_days));
        }

        let max_iterations = parse_var::<u32>(MAX_ITERATIONS_VAR, &lookup)?
            .unwrap_or(defaults.validation.max_iterations);
        if max_iterations == 0 {
            return Err(anyhow!("{} must be at least 1", MAX_ITERATIONS_VAR));
        }

        let validation = ValidationConfig {
            max_iterations,
            integrity_double_step: parse_var::<bool>(DOUBLE_STEP_VAR, &lookup)?
                .unwrap_or(defaults.validation.integrity_double_step),
            final_pass_includes_integrity: parse_var::<bool>(FINAL_INTEGRITY_VAR, &lookup)?
                .unwrap_or(defaults.validation.final_pass_includes_integrity),
        };

        Ok(Self {
            default_days,
            validation,
            narrative_model: lookup(MODEL_VAR)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.narrative_model),
            api_key_env_var: defaults.api_key_env_var,
            catalog_path: lookup(CATALOG_PATH_VAR)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
