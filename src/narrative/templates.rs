//! Deterministic narrative text. Used when no rewriter is configured, when
//! the rewriter fails, and as the repair default for tone mismatches.

use std::collections::BTreeMap;

use crate::profile::{BmiCategory, Severity, UserHealthProfile};
use crate::rules::{RuleOutput, TrainingLevel};

use super::{NarrativeSection, NarrativeSource, Narratives, SECTION_KEYS};

fn bmi_text(profile: &UserHealthProfile) -> String {
    let bmi = profile.bmi;
    match profile.bmi_category() {
        BmiCategory::Underweight => format!(
            "Your BMI of {:.1} sits below the healthy range. The plan leans on energy-dense whole foods to help you rebuild steadily.",
            bmi
        ),
        BmiCategory::Normal => format!(
            "Your BMI of {:.1} is within the healthy range. The plan is designed to keep it there while supporting your goal.",
            bmi
        ),
        BmiCategory::Overweight => format!(
            "Your BMI of {:.1} is above the healthy range. A steady, moderate calorie target and high-fibre meals will help bring it down.",
            bmi
        ),
        BmiCategory::Obese => format!(
            "Your BMI of {:.1} is well above the healthy range. Gradual weight loss through consistent meals and daily movement is the priority.",
            bmi
        ),
    }
}

fn sleep_text(profile: &UserHealthProfile, severity: Severity) -> String {
    let score = profile.scores.sleep;
    match severity {
        Severity::Normal => format!(
            "Your sleep score of {}/100 is excellent. Keep your current bedtime routine and regular wake-up time.",
            score
        ),
        Severity::Mild => format!(
            "Your sleep score of {}/100 is fair. A fixed wake-up time and a lighter dinner should lift it further.",
            score
        ),
        Severity::Moderate => format!(
            "Your sleep score of {}/100 shows clear room for improvement. Aim for 7 to 9 hours and keep screens out of the last hour before bed.",
            score
        ),
        Severity::Severe => format!(
            "Your sleep score of {}/100 is a serious concern. Short or broken sleep affects appetite, recovery and mood, so please discuss it with a doctor.",
            score
        ),
    }
}

fn stress_text(profile: &UserHealthProfile, severity: Severity) -> String {
    let score = profile.scores.stress;
    match severity {
        Severity::Normal => format!(
            "Your stress score of {}/100 is excellent. Your current routines are keeping pressure well managed.",
            score
        ),
        Severity::Mild => format!(
            "Your stress score of {}/100 suggests occasional pressure. Short breathing breaks during the day can help.",
            score
        ),
        Severity::Moderate => format!(
            "Your stress score of {}/100 points to ongoing pressure. Regular meals, daily walks and a wind-down routine will help you cope.",
            score
        ),
        Severity::Severe => format!(
            "Your stress score of {}/100 is a serious concern. Persistent high stress affects sleep and blood sugar, so consider speaking with a professional.",
            score
        ),
    }
}

fn activity_text(training: TrainingLevel) -> String {
    match training {
        TrainingLevel::Beginner => "Start with three 20-minute walks a week and two short bodyweight sessions. Build the habit before the intensity.".to_string(),
        TrainingLevel::Intermediate => "Keep three to four sessions a week and add progressive resistance training twice a week to build lean muscle.".to_string(),
        TrainingLevel::Advanced => "Your activity level supports a structured strength programme. Protein is spread across the day to support recovery.".to_string(),
    }
}

pub fn template_section(
    key: &str,
    profile: &UserHealthProfile,
    rules: &RuleOutput,
) -> Option<String> {
    let targets = profile.macro_targets;
    let text = match key {
        "profile_summary" => format!(
            "{}, this report is built from your answers: age {}, BMI {:.1} and a daily energy target of {:.0} kcal.",
            profile.display_name(),
            profile.age,
            profile.bmi,
            profile.calorie_target
        ),
        "bmi_analysis" => bmi_text(profile),
        "sleep_analysis" => sleep_text(profile, rules.severity.sleep),
        "stress_analysis" => stress_text(profile, rules.severity.stress),
        "activity_guidance" => activity_text(rules.severity.training),
        "nutrition_overview" => format!(
            "Your plan targets {:.0} kcal per day with {:.0}g protein, {:.0}g carbohydrate and {:.0}g fat.",
            profile.calorie_target, targets.protein_g, targets.carbs_g, targets.fat_g
        ),
        "closing_note" => format!(
            "{}, small consistent steps matter more than perfect days. Revisit this plan in four weeks.",
            profile.display_name()
        ),
        _ => return None,
    };
    Some(text)
}

pub fn condition_template(condition: &str) -> String {
    format!(
        "{}: meals favour foods that support {} management and leave out common triggers. Keep your doctor informed of any changes.",
        condition,
        condition.to_lowercase()
    )
}

pub fn template_narratives(profile: &UserHealthProfile, rules: &RuleOutput) -> Narratives {
    let sections = SECTION_KEYS
        .iter()
        .filter_map(|key| {
            template_section(key, profile, rules).map(|text| NarrativeSection {
                key: key.to_string(),
                text,
            })
        })
        .collect();
    let condition_notes: BTreeMap<String, String> = profile
        .medical_conditions
        .iter()
        .map(|condition| (condition.clone(), condition_template(condition)))
        .collect();

    Narratives {
        sections,
        condition_notes,
        source: NarrativeSource::Template,
    }
}
