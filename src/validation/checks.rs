//! The eight bundle checks. Each one is a pure function of the bundle (and
//! the read-only catalog) and reports every problem it finds, not just the
//! first.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use crate::catalog::{item_conflicts_with, FoodCatalog};
use crate::meal_plan::portions::{within_calorie_tolerance, within_protein_tolerance, TRIVIAL_PORTION_G};
use crate::meal_plan::MealSlot;
use crate::narrative::tone::tone_matches;
use crate::profile::Severity;
use crate::report::ReportBundle;
use crate::rules::{reserved_modules_for_opposite, BEGINNER_MODULE, MUSCLE_MODULE};

use super::gender;
use super::{CheckKind, CheckResult};

/// Sections whose tone must follow a wellness score.
pub const SCORED_SECTIONS: [&str; 2] = ["sleep_analysis", "stress_analysis"];

const PLACEHOLDER_PATTERNS: [&str; 6] = [
    r"\{\{[^{}]*\}\}",
    r"(?i)\[(?:placeholder|todo|tbd|name|first_name|insert[^\]]*)\]",
    r"\bundefined\b",
    r"\bNaN\b",
    r"\[object Object\]",
    r"(?i)lorem ipsum",
];

// Mojibake left behind by double-encoded UTF-8, plus the replacement char.
const ENCODING_ARTIFACTS: [&str; 6] = ["â€™", "â€œ", "â€\u{9d}", "â€", "Ã©", "\u{FFFD}"];

static PLACEHOLDERS: OnceLock<Vec<Regex>> = OnceLock::new();

pub(crate) fn placeholder_patterns() -> &'static [Regex] {
    PLACEHOLDERS.get_or_init(|| {
        PLACEHOLDER_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

pub(crate) fn encoding_artifacts() -> &'static [&'static str] {
    &ENCODING_ARTIFACTS
}

/// Severity bucket a scored section has to match.
pub fn section_severity(bundle: &ReportBundle, key: &str) -> Option<Severity> {
    match key {
        "sleep_analysis" => Some(Severity::from_score(bundle.profile.scores.sleep)),
        "stress_analysis" => Some(Severity::from_score(bundle.profile.scores.stress)),
        _ => None,
    }
}

/// Structural problems found by the integrity audit. The repair dispatches
/// on these, so they stay typed until they are rendered for the report.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityIssue {
    DuplicateModule(String),
    DuplicateSection(String),
    PrefixMismatch(String),
    ReservedModule(String),
    TrivialPortion { day: u32, item: String, grams: u32 },
    NonPositiveCalories { day: u32, item: String },
    TargetBelowBmr { target: f64, bmr: f64 },
}

impl IntegrityIssue {
    /// Portion and calorie problems are fixed by regenerating the plan;
    /// everything else is a module or naming problem.
    pub fn needs_plan_regeneration(&self) -> bool {
        matches!(
            self,
            IntegrityIssue::TrivialPortion { .. }
                | IntegrityIssue::NonPositiveCalories { .. }
                | IntegrityIssue::TargetBelowBmr { .. }
        )
    }

    pub fn detail(&self) -> String {
        match self {
            IntegrityIssue::DuplicateModule(module) => format!("duplicate module '{}'", module),
            IntegrityIssue::DuplicateSection(key) => format!("duplicate narrative section '{}'", key),
            IntegrityIssue::PrefixMismatch(found) => format!("name prefix '{}' does not match gender", found),
            IntegrityIssue::ReservedModule(module) => format!("gender-restricted module '{}'", module),
            IntegrityIssue::TrivialPortion { day, item, grams } => {
                format!("day {} {} has trivial portion {}g", day, item, grams)
            }
            IntegrityIssue::NonPositiveCalories { day, item } => {
                format!("day {} {} has non-positive calories", day, item)
            }
            IntegrityIssue::TargetBelowBmr { target, bmr } => {
                format!("calorie target {:.0} is below BMR {:.0} for a senior profile", target, bmr)
            }
        }
    }
}

pub fn integrity_issues(bundle: &ReportBundle) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    let profile = &bundle.profile;

    let mut seen = HashSet::new();
    for module in &bundle.rules.active_modules {
        if !seen.insert(module.as_str()) {
            issues.push(IntegrityIssue::DuplicateModule(module.clone()));
        }
    }
    let reserved = reserved_modules_for_opposite(profile.gender);
    for module in &bundle.rules.active_modules {
        if reserved.contains(&module.as_str()) {
            issues.push(IntegrityIssue::ReservedModule(module.clone()));
        }
    }

    let mut keys = HashSet::new();
    for section in &bundle.narratives.sections {
        if !keys.insert(section.key.as_str()) {
            issues.push(IntegrityIssue::DuplicateSection(section.key.clone()));
        }
    }
    for text in bundle.narratives.texts() {
        issues.extend(
            gender::mismatched_prefixes(profile, text)
                .into_iter()
                .map(IntegrityIssue::PrefixMismatch),
        );
    }

    for day in &bundle.meal_plan.days {
        for item in day.items() {
            if item.portion_g <= TRIVIAL_PORTION_G {
                issues.push(IntegrityIssue::TrivialPortion {
                    day: day.day,
                    item: item.name.clone(),
                    grams: item.portion_g,
                });
            }
            if item.calories <= 0.0 {
                issues.push(IntegrityIssue::NonPositiveCalories {
                    day: day.day,
                    item: item.name.clone(),
                });
            }
        }
    }

    if profile.is_senior() {
        let target = profile.calorie_target.min(bundle.meal_plan.daily_calorie_target);
        if target < profile.bmr {
            issues.push(IntegrityIssue::TargetBelowBmr {
                target,
                bmr: profile.bmr,
            });
        }
    }
    issues
}

/// Runs checks over a bundle. Holds only the shared catalog.
pub struct ValidationEngine<'c> {
    catalog: &'c FoodCatalog,
}

impl<'c> ValidationEngine<'c> {
    pub fn new(catalog: &'c FoodCatalog) -> Self {
        Self { catalog }
    }

    pub fn run(&self, bundle: &ReportBundle, kinds: &[CheckKind]) -> Vec<CheckResult> {
        kinds.iter().map(|kind| self.check(*kind, bundle)).collect()
    }

    pub fn check(&self, kind: CheckKind, bundle: &ReportBundle) -> CheckResult {
        let problems = match kind {
            CheckKind::GenderCondition => gender_condition(bundle),
            CheckKind::MacroAccuracy => macro_accuracy(bundle),
            CheckKind::NarrativeScoreConsistency => narrative_score_consistency(bundle),
            CheckKind::ActivityTrainingAlignment => activity_training_alignment(bundle),
            CheckKind::FoodIntolerance => food_intolerance(self.catalog, bundle),
            CheckKind::SupplementDedup => supplement_dedup(bundle),
            CheckKind::PlaceholderClean => placeholder_clean(bundle),
            CheckKind::IntegrityAudit => integrity_issues(bundle).iter().map(IntegrityIssue::detail).collect(),
        };
        if !problems.is_empty() {
            debug!(check = %kind, problems = problems.len(), "Check failed");
        }
        CheckResult::from_problems(kind, &problems)
    }
}

fn gender_condition(bundle: &ReportBundle) -> Vec<String> {
    let gender = bundle.profile.gender;
    let mut problems = Vec::new();

    for condition in &bundle.profile.medical_conditions {
        if gender::is_reserved_condition(gender, condition) {
            problems.push(format!("condition '{}' does not apply to this gender", condition));
        }
    }
    let reserved = reserved_modules_for_opposite(gender);
    for module in &bundle.rules.active_modules {
        if reserved.contains(&module.as_str()) {
            problems.push(format!("module '{}' is reserved for the opposite gender", module));
        }
    }
    for section in &bundle.narratives.sections {
        for term in gender::reserved_terms_in(gender, &section.text) {
            problems.push(format!("section '{}' mentions '{}'", section.key, term));
        }
    }
    for (condition, note) in &bundle.narratives.condition_notes {
        for term in gender::reserved_terms_in(gender, note) {
            problems.push(format!("condition note '{}' mentions '{}'", condition, term));
        }
    }
    problems
}

fn macro_accuracy(bundle: &ReportBundle) -> Vec<String> {
    let calorie_target = bundle.meal_plan.daily_calorie_target;
    let protein_target = bundle.profile.macro_targets.protein_g;
    let mut problems = Vec::new();

    for day in &bundle.meal_plan.days {
        if !day.totals_consistent() {
            problems.push(format!("day {} totals do not match its items", day.day));
        }
        if !within_calorie_tolerance(day.totals.calories, calorie_target) {
            problems.push(format!(
                "day {} calories {:.1} outside ±3% of {:.0}",
                day.day, day.totals.calories, calorie_target
            ));
        }
        if !within_protein_tolerance(day.totals.protein, protein_target) {
            problems.push(format!(
                "day {} protein {:.1}g outside ±5g of {:.0}g",
                day.day, day.totals.protein, protein_target
            ));
        }
    }
    problems
}

fn narrative_score_consistency(bundle: &ReportBundle) -> Vec<String> {
    SCORED_SECTIONS
        .iter()
        .filter_map(|key| {
            let severity = section_severity(bundle, key)?;
            let text = bundle.narratives.section(key)?;
            (!tone_matches(text, severity))
                .then(|| format!("section '{}' tone does not match {} score", key, severity.label()))
        })
        .collect()
}

fn activity_training_alignment(bundle: &ReportBundle) -> Vec<String> {
    let modules = &bundle.rules.active_modules;
    let has = |module: &str| modules.iter().any(|m| m == module);

    if bundle.profile.is_beginner() {
        if has(MUSCLE_MODULE) {
            return vec![format!(
                "beginner activity score {} carries '{}'",
                bundle.profile.scores.activity, MUSCLE_MODULE
            )];
        }
    } else if has(BEGINNER_MODULE) && !has(MUSCLE_MODULE) {
        return vec![format!(
            "activity score {} carries only '{}'",
            bundle.profile.scores.activity, BEGINNER_MODULE
        )];
    }
    Vec::new()
}

fn food_intolerance(catalog: &FoodCatalog, bundle: &ReportBundle) -> Vec<String> {
    let profile = &bundle.profile;
    let mut problems = Vec::new();

    for day in &bundle.meal_plan.days {
        for slot in MealSlot::ALL {
            for item in day.slot(slot) {
                for intolerance in &profile.food_intolerances {
                    if item_conflicts_with(catalog, &item.name, intolerance) {
                        problems.push(format!(
                            "day {} {}: '{}' conflicts with {}",
                            day.day,
                            slot.label(),
                            item.name,
                            intolerance
                        ));
                    }
                }
                let avoided = catalog
                    .find_by_name(&item.name)
                    .is_some_and(|entry| entry.is_avoided_for(&profile.medical_conditions));
                if avoided {
                    problems.push(format!(
                        "day {} {}: '{}' is excluded for a medical condition",
                        day.day,
                        slot.label(),
                        item.name
                    ));
                }
            }
        }
    }
    problems
}

pub(crate) fn normalize_supplement(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn supplement_dedup(bundle: &ReportBundle) -> Vec<String> {
    let mut seen = HashSet::new();
    bundle
        .rules
        .supplements
        .iter()
        .filter(|name| !seen.insert(normalize_supplement(name)))
        .map(|name| format!("duplicate supplement '{}'", name))
        .collect()
}

fn placeholder_clean(bundle: &ReportBundle) -> Vec<String> {
    let serialized = match serde_json::to_string(bundle) {
        Ok(json) => json,
        Err(e) => return vec![format!("bundle could not be serialized: {}", e)],
    };
    let mut problems: Vec<String> = placeholder_patterns()
        .iter()
        .flat_map(|re| re.find_iter(&serialized).map(|m| format!("placeholder '{}'", m.as_str())))
        .collect();
    problems.extend(
        encoding_artifacts()
            .iter()
            .filter(|artifact| serialized.contains(**artifact))
            .map(|artifact| format!("encoding artifact '{}'", artifact.escape_unicode())),
    );
    problems
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::meal_plan::generate_meal_plan;
    use crate::narrative::template_narratives;
    use crate::profile::tests::sample_answers;
    use crate::profile::{QuizAnswers, UserHealthProfile};
    use crate::report::ReportMeta;
    use crate::rules::evaluate;

    pub(crate) fn bundle_for(answers: &QuizAnswers, days: u32) -> ReportBundle {
        let catalog = FoodCatalog::builtin().unwrap();
        let profile = UserHealthProfile::from_answers(answers).unwrap();
        let rules = evaluate(&profile);
        let narratives = template_narratives(&profile, &rules);
        let meal_plan = generate_meal_plan(&catalog, &profile, days);
        ReportBundle::new(profile, rules, narratives, meal_plan, ReportMeta::default())
    }

    fn failing(bundle: &ReportBundle) -> Vec<CheckKind> {
        let catalog = FoodCatalog::builtin().unwrap();
        let engine = ValidationEngine::new(&catalog);
        CheckKind::ALL
            .into_iter()
            .filter(|kind| !engine.check(*kind, bundle).passed)
            .collect()
    }

    #[test]
    fn test_generated_bundle_passes_everything() {
        assert!(failing(&bundle_for(&sample_answers(), 3)).is_empty());
    }

    #[test]
    fn test_pcos_on_male_profile_is_flagged_twice() {
        let mut answers = sample_answers();
        answers.medical_conditions = vec!["PCOS".to_string()];
        let failed = failing(&bundle_for(&answers, 1));
        assert!(failed.contains(&CheckKind::GenderCondition));
        assert!(failed.contains(&CheckKind::IntegrityAudit));
    }

    #[test]
    fn test_raw_supplements_collide_after_normalising() {
        let mut answers = sample_answers();
        answers.gender = crate::profile::Gender::Female;
        answers.medical_conditions = vec!["PCOS".to_string(), "Thyroid".to_string()];
        let bundle = bundle_for(&answers, 1);
        assert_eq!(failing(&bundle), vec![CheckKind::SupplementDedup]);
        assert_eq!(normalize_supplement(" vitamin  D3"), "vitamind3");
    }

    #[test]
    fn test_macro_drift_is_reported_per_day() {
        let mut bundle = bundle_for(&sample_answers(), 2);
        for item in bundle.meal_plan.days[1].items_mut() {
            item.calories *= 1.2;
        }
        bundle.meal_plan.days[1].recompute_totals();
        let catalog = FoodCatalog::builtin().unwrap();
        let result = ValidationEngine::new(&catalog).check(CheckKind::MacroAccuracy, &bundle);
        assert!(!result.passed);
        assert!(result.detail.starts_with("day 2 calories"));
    }

    #[test]
    fn test_alarm_tone_on_good_sleep_is_inconsistent() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        for section in bundle.narratives.sections.iter_mut() {
            if section.key == "sleep_analysis" {
                section.text = "Your sleep is at a dangerous level.".to_string();
            }
        }
        assert_eq!(failing(&bundle), vec![CheckKind::NarrativeScoreConsistency]);
    }

    #[test]
    fn test_placeholders_and_artifacts_are_found() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        bundle.narratives.sections[0].text = "Hello {{first_name}}, your score is NaN.".to_string();
        bundle.narratives.sections[1].text = "Itâ€™s fine.".to_string();
        let catalog = FoodCatalog::builtin().unwrap();
        let result = ValidationEngine::new(&catalog).check(CheckKind::PlaceholderClean, &bundle);
        assert!(!result.passed);
        assert!(result.detail.contains("{{first_name}}"));
        assert!(result.detail.contains("'NaN'"));
        assert!(result.detail.contains("encoding artifact"));
    }

    #[test]
    fn test_integrity_issue_classes() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        bundle.rules.active_modules.push("core_nutrition".to_string());
        bundle.meal_plan.days[0].lunch[0].portion_g = 1;
        let issues = integrity_issues(&bundle);
        assert!(issues.contains(&IntegrityIssue::DuplicateModule("core_nutrition".to_string())));
        assert!(issues.iter().any(|i| i.needs_plan_regeneration()));
        assert!(!IntegrityIssue::DuplicateModule("x".to_string()).needs_plan_regeneration());
    }
}
