//! The bundle handed to the rendering layer, and the unit the validation
//! loop checks and repairs as a whole.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::meal_plan::MealPlanBundle;
use crate::narrative::Narratives;
use crate::profile::UserHealthProfile;
use crate::rules::RuleOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTier {
    #[default]
    Free,
    Essential,
    Premium,
}

impl FromStr for ReportTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(ReportTier::Free),
            "essential" => Ok(ReportTier::Essential),
            "premium" => Ok(ReportTier::Premium),
            other => Err(anyhow::anyhow!("Unknown report tier '{}'", other)),
        }
    }
}

impl fmt::Display for ReportTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReportTier::Free => "free",
            ReportTier::Essential => "essential",
            ReportTier::Premium => "premium",
        };
        f.write_str(label)
    }
}

/// Order data carried through untouched by validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportMeta {
    pub tier: ReportTier,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub add_ons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub profile: UserHealthProfile,
    pub rules: RuleOutput,
    pub narratives: Narratives,
    pub meal_plan: MealPlanBundle,
    pub meta: ReportMeta,
}

impl ReportBundle {
    pub fn new(
        profile: UserHealthProfile,
        rules: RuleOutput,
        narratives: Narratives,
        meal_plan: MealPlanBundle,
        meta: ReportMeta,
    ) -> Self {
        Self {
            profile,
            rules,
            narratives,
            meal_plan,
            meta,
        }
    }
}
