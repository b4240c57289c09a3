//! Maps a profile onto risk flags, report modules and supplement hints.
//!
//! Gender gating of modules is deliberately left to the validation loop so
//! there is one place that strips reserved modules.

use serde::{Deserialize, Serialize};

use crate::profile::{BmiCategory, Gender, Severity, UserHealthProfile};

pub const CORE_MODULE: &str = "core_nutrition";
pub const BEGINNER_MODULE: &str = "beginner_training";
pub const MUSCLE_MODULE: &str = "muscle_building";
pub const SLEEP_MODULE: &str = "sleep_recovery";
pub const STRESS_MODULE: &str = "stress_management";
pub const WEIGHT_MODULE: &str = "weight_management";

pub const FEMALE_RESERVED_MODULES: [&str; 4] =
    ["pcos_protocol", "ovarian_health", "menstrual_cycle", "women_hormone"];
pub const MALE_RESERVED_MODULES: [&str; 3] = ["prostate_health", "testosterone_support", "male_hormone"];

/// Condition keyword -> (modules, supplements).
const CONDITION_RULES: &[(&[&str], &[&str], &[&str])] = &[
    (&["pcos", "pcod"], &["pcos_protocol", "women_hormone"], &["Inositol", "Vitamin D3"]),
    (&["menstrual", "irregular period"], &["menstrual_cycle"], &["Iron bisglycinate"]),
    (&["ovarian"], &["ovarian_health"], &[]),
    (&["diabetes", "insulin"], &["blood_sugar_control"], &["Chromium picolinate", "Magnesium"]),
    (&["thyroid"], &["thyroid_support"], &["Selenium", "vitamin  D3"]),
    (&["hypertension", "blood pressure"], &["heart_health"], &["Omega-3"]),
    (&["cholesterol"], &["heart_health"], &["omega-3"]),
    (&["prostate"], &["prostate_health"], &["Zinc"]),
    (&["testosterone"], &["testosterone_support"], &["Zinc", "Vitamin D3"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl TrainingLevel {
    pub fn from_score(activity_score: u32) -> Self {
        match activity_score {
            0..=39 => TrainingLevel::Beginner,
            40..=69 => TrainingLevel::Intermediate,
            _ => TrainingLevel::Advanced,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityProfile {
    pub sleep: Severity,
    pub stress: Severity,
    pub bmi: BmiCategory,
    pub training: TrainingLevel,
}

impl SeverityProfile {
    pub fn for_profile(profile: &UserHealthProfile) -> Self {
        Self {
            sleep: Severity::from_score(profile.scores.sleep),
            stress: Severity::from_score(profile.scores.stress),
            bmi: profile.bmi_category(),
            training: TrainingLevel::from_score(profile.scores.activity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutput {
    pub risk_flags: Vec<String>,
    pub active_modules: Vec<String>,
    pub severity: SeverityProfile,
    pub supplements: Vec<String>,
}

/// Modules a person of `gender` must never receive.
pub fn reserved_modules_for_opposite(gender: Gender) -> &'static [&'static str] {
    match gender {
        Gender::Male => &FEMALE_RESERVED_MODULES,
        Gender::Female => &MALE_RESERVED_MODULES,
        Gender::Other => &[],
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

pub fn evaluate(profile: &UserHealthProfile) -> RuleOutput {
    let severity = SeverityProfile::for_profile(profile);
    let mut risk_flags = Vec::new();
    let mut active_modules = vec![CORE_MODULE.to_string()];
    let mut supplements = Vec::new();

    for condition in &profile.medical_conditions {
        let lowered = condition.to_lowercase();
        for (keywords, modules, suggested) in CONDITION_RULES {
            if keywords.iter().any(|k| lowered.contains(k)) {
                for module in modules.iter() {
                    push_unique(&mut active_modules, module);
                }
                // Raw append; normalisation happens in supplement_dedup.
                supplements.extend(suggested.iter().map(|s| s.to_string()));
            }
        }
        push_unique(&mut risk_flags, &format!("condition:{}", lowered));
    }

    match severity.bmi {
        BmiCategory::Underweight => push_unique(&mut risk_flags, "low_bmi"),
        BmiCategory::Overweight | BmiCategory::Obese => {
            push_unique(&mut risk_flags, "high_bmi");
            push_unique(&mut active_modules, WEIGHT_MODULE);
        }
        BmiCategory::Normal => {}
    }

    if severity.sleep >= Severity::Moderate {
        push_unique(&mut risk_flags, "poor_sleep");
        push_unique(&mut active_modules, SLEEP_MODULE);
        supplements.push("Magnesium glycinate".to_string());
    }
    if severity.stress >= Severity::Moderate {
        push_unique(&mut risk_flags, "high_stress");
        push_unique(&mut active_modules, STRESS_MODULE);
        supplements.push("Ashwagandha".to_string());
    }

    if severity.training == TrainingLevel::Beginner {
        push_unique(&mut risk_flags, "sedentary");
        push_unique(&mut active_modules, BEGINNER_MODULE);
    } else {
        push_unique(&mut active_modules, MUSCLE_MODULE);
    }

    if profile.is_senior() {
        push_unique(&mut risk_flags, "senior");
    }

    RuleOutput {
        risk_flags,
        active_modules,
        severity,
        supplements,
    }
}
