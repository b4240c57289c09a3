//! Quiz answers in, health profile out.
//!
//! Energy formulas: Mifflin-St Jeor BMR, activity multiplier for TDEE and a
//! flat goal adjustment. Wellness scores are all on 0..=100, higher is better.

use serde::{Deserialize, Serialize};

use crate::catalog::Diet;
use crate::error::{ServiceError, ServiceResult};

pub const SENIOR_AGE: u32 = 60;
pub const BEGINNER_ACTIVITY_SCORE: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    fn tdee_multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }

    fn score_bonus(self) -> u32 {
        match self {
            ActivityLevel::Sedentary => 0,
            ActivityLevel::Light => 10,
            ActivityLevel::Moderate => 20,
            ActivityLevel::Active => 25,
            ActivityLevel::VeryActive => 30,
        }
    }

    fn protein_g_per_kg(self) -> f64 {
        match self {
            ActivityLevel::Sedentary | ActivityLevel::Light => 1.2,
            _ => 1.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Lose,
    #[default]
    Maintain,
    Gain,
}

impl Goal {
    fn calorie_factor(self) -> f64 {
        match self {
            Goal::Lose => 0.85,
            Goal::Maintain => 1.0,
            Goal::Gain => 1.10,
        }
    }
}

/// Narrative tone bucket for a 0..=100 wellness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn from_score(score: u32) -> Self {
        match score {
            75.. => Severity::Normal,
            50..=74 => Severity::Mild,
            25..=49 => Severity::Moderate,
            _ => Severity::Severe,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

/// Raw questionnaire payload as received from the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswers {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub diet_preference: Diet,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub food_intolerances: Vec<String>,
    pub sleep_hours: f64,
    /// 1 (terrible) to 10 (excellent).
    pub sleep_quality: u32,
    /// 1 (calm) to 10 (overwhelmed).
    pub stress_level: u32,
    pub exercise_days_per_week: u32,
    #[serde(default)]
    pub calorie_target_override: Option<f64>,
    #[serde(default)]
    pub protein_target_override: Option<f64>,
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> ServiceResult<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ServiceError::invalid_input(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

impl QuizAnswers {
    pub fn validate(&self) -> ServiceResult<()> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::invalid_input("name must not be empty"));
        }
        check_range("age", f64::from(self.age), 13.0, 100.0)?;
        check_range("height_cm", self.height_cm, 100.0, 250.0)?;
        check_range("weight_kg", self.weight_kg, 25.0, 300.0)?;
        check_range("sleep_hours", self.sleep_hours, 0.0, 24.0)?;
        check_range("sleep_quality", f64::from(self.sleep_quality), 1.0, 10.0)?;
        check_range("stress_level", f64::from(self.stress_level), 1.0, 10.0)?;
        check_range("exercise_days_per_week", f64::from(self.exercise_days_per_week), 0.0, 7.0)?;
        if let Some(kcal) = self.calorie_target_override {
            check_range("calorie_target_override", kcal, 800.0, 6000.0)?;
        }
        if let Some(protein) = self.protein_target_override {
            check_range("protein_target_override", protein, 20.0, 400.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl MacroTargets {
    /// Fat takes a fixed 25% of energy, carbohydrate fills the remainder.
    pub fn for_calories(calorie_target: f64, protein_g: f64) -> Self {
        let fat_g = (calorie_target * 0.25 / 9.0).round();
        let carbs_g = ((calorie_target - protein_g * 4.0 - fat_g * 9.0) / 4.0).max(0.0).round();
        Self { protein_g, carbs_g, fat_g }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellnessScores {
    pub sleep: u32,
    pub stress: u32,
    pub activity: u32,
}

impl WellnessScores {
    pub fn from_answers(answers: &QuizAnswers) -> Self {
        let hours_gap = if answers.sleep_hours < 7.0 {
            7.0 - answers.sleep_hours
        } else if answers.sleep_hours > 9.0 {
            answers.sleep_hours - 9.0
        } else {
            0.0
        };
        let hours_part = (50.0 - hours_gap * 10.0).max(0.0).round() as u32;
        let sleep = (hours_part + answers.sleep_quality * 5).min(100);

        let stress = 100u32.saturating_sub(answers.stress_level * 10);

        let activity =
            (answers.exercise_days_per_week.min(7) * 10 + answers.activity_level.score_bonus()).min(100);

        Self { sleep, stress, activity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHealthProfile {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub diet_preference: Diet,
    pub goal: Goal,
    pub bmi: f64,
    pub bmr: f64,
    pub tdee: f64,
    pub calorie_target: f64,
    pub macro_targets: MacroTargets,
    pub scores: WellnessScores,
    pub medical_conditions: Vec<String>,
    pub food_intolerances: Vec<String>,
}

pub fn mifflin_st_jeor(gender: Gender, weight_kg: f64, height_cm: f64, age: u32) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
        Gender::Other => base - 78.0,
    }
}

fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl UserHealthProfile {
    pub fn from_answers(answers: &QuizAnswers) -> ServiceResult<Self> {
        answers.validate()?;

        let height_m = answers.height_cm / 100.0;
        let bmi = round1(answers.weight_kg / (height_m * height_m));
        let bmr = round1(mifflin_st_jeor(answers.gender, answers.weight_kg, answers.height_cm, answers.age));
        let tdee = round1(bmr * answers.activity_level.tdee_multiplier());

        let calorie_target = match answers.calorie_target_override {
            Some(kcal) => kcal.round(),
            None => {
                let target = round_to(tdee * answers.goal.calorie_factor(), 10.0);
                if answers.age >= SENIOR_AGE && target < bmr {
                    (bmr / 10.0).ceil() * 10.0
                } else {
                    target
                }
            }
        };

        let protein_g = answers.protein_target_override.map(f64::round).unwrap_or_else(|| {
            let mut per_kg = answers.activity_level.protein_g_per_kg();
            if answers.goal == Goal::Gain {
                per_kg += 0.2;
            }
            (answers.weight_kg * per_kg).round()
        });

        Ok(Self {
            name: answers.name.trim().to_string(),
            age: answers.age,
            gender: answers.gender,
            height_cm: answers.height_cm,
            weight_kg: answers.weight_kg,
            activity_level: answers.activity_level,
            diet_preference: answers.diet_preference,
            goal: answers.goal,
            bmi,
            bmr,
            tdee,
            calorie_target,
            macro_targets: MacroTargets::for_calories(calorie_target, protein_g),
            scores: WellnessScores::from_answers(answers),
            medical_conditions: clean_list(&answers.medical_conditions),
            food_intolerances: clean_list(&answers.food_intolerances),
        })
    }

    pub fn is_senior(&self) -> bool {
        self.age >= SENIOR_AGE
    }

    pub fn is_beginner(&self) -> bool {
        self.scores.activity < BEGINNER_ACTIVITY_SCORE
    }

    pub fn bmi_category(&self) -> BmiCategory {
        BmiCategory::from_bmi(self.bmi)
    }

    pub fn salutation(&self) -> Option<&'static str> {
        match self.gender {
            Gender::Male => Some("Mr."),
            Gender::Female => Some("Ms."),
            Gender::Other => None,
        }
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(self.name.as_str())
    }

    /// "Mr. Rahul", "Ms. Priya", or just the first name.
    pub fn display_name(&self) -> String {
        match self.salutation() {
            Some(prefix) => format!("{} {}", prefix, self.first_name()),
            None => self.first_name().to_string(),
        }
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() || cleaned.iter().any(|c| c.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        cleaned.push(trimmed.to_string());
    }
    cleaned
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_answers() -> QuizAnswers {
        QuizAnswers {
            name: "Rahul Sharma".to_string(),
            age: 30,
            gender: Gender::Male,
            height_cm: 175.0,
            weight_kg: 70.0,
            activity_level: ActivityLevel::Moderate,
            diet_preference: Diet::Veg,
            goal: Goal::Maintain,
            medical_conditions: vec![],
            food_intolerances: vec![],
            sleep_hours: 7.5,
            sleep_quality: 7,
            stress_level: 4,
            exercise_days_per_week: 4,
            calorie_target_override: None,
            protein_target_override: None,
        }
    }

    #[test]
    fn test_energy_values_for_reference_male() {
        let profile = UserHealthProfile::from_answers(&sample_answers()).unwrap();
        assert_eq!(profile.bmi, 22.9);
        assert_eq!(profile.bmr, 1648.8);
        // 1648.8 * 1.55 = 2555.6 -> nearest 10
        assert_eq!(profile.calorie_target, 2560.0);
        assert_eq!(profile.macro_targets.protein_g, 112.0);
        assert_eq!(profile.macro_targets.fat_g, 71.0);
        assert_eq!(profile.display_name(), "Mr. Rahul");
    }

    #[test]
    fn test_senior_target_never_below_bmr() {
        let mut answers = sample_answers();
        answers.age = 72;
        answers.goal = Goal::Lose;
        answers.activity_level = ActivityLevel::Sedentary;
        let profile = UserHealthProfile::from_answers(&answers).unwrap();
        assert!(profile.calorie_target >= profile.bmr);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut answers = sample_answers();
        answers.calorie_target_override = Some(2000.0);
        answers.protein_target_override = Some(150.0);
        let profile = UserHealthProfile::from_answers(&answers).unwrap();
        assert_eq!(profile.calorie_target, 2000.0);
        assert_eq!(profile.macro_targets.protein_g, 150.0);
        // (2000 - 600 - 504) / 4
        assert_eq!(profile.macro_targets.carbs_g, 224.0);
    }

    #[test]
    fn test_validation_rejects_out_of_range_fields() {
        let mut answers = sample_answers();
        answers.stress_level = 11;
        let err = UserHealthProfile::from_answers(&answers).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(msg) if msg.contains("stress_level")));

        let mut answers = sample_answers();
        answers.name = "   ".to_string();
        assert!(answers.validate().is_err());
    }

    #[test]
    fn test_wellness_scores_and_buckets() {
        let mut answers = sample_answers();
        answers.sleep_hours = 4.0;
        answers.sleep_quality = 2;
        answers.stress_level = 9;
        answers.exercise_days_per_week = 0;
        answers.activity_level = ActivityLevel::Sedentary;
        let scores = WellnessScores::from_answers(&answers);
        assert_eq!(scores.sleep, 30);
        assert_eq!(scores.stress, 10);
        assert_eq!(scores.activity, 0);
        assert_eq!(Severity::from_score(scores.sleep), Severity::Moderate);
        assert_eq!(Severity::from_score(scores.stress), Severity::Severe);
        assert_eq!(Severity::from_score(80), Severity::Normal);
    }

    #[test]
    fn test_condition_lists_are_deduplicated() {
        let mut answers = sample_answers();
        answers.medical_conditions = vec!["Thyroid".into(), " thyroid ".into(), "".into()];
        let profile = UserHealthProfile::from_answers(&answers).unwrap();
        assert_eq!(profile.medical_conditions, vec!["Thyroid".to_string()]);
    }
}
