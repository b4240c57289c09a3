//! One repair per check. A repair takes the current snapshot by reference
//! and returns a new one together with a description of what it changed;
//! the input is never modified.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::catalog::{item_conflicts_with, FoodCatalog};
use crate::meal_plan::portions::{within_calorie_tolerance, within_protein_tolerance, MIN_PORTION_G};
use crate::meal_plan::{generate_meal_plan, round1, MealSlot};
use crate::narrative::template_section;
use crate::narrative::tone::tone_matches;
use crate::profile::MacroTargets;
use crate::report::ReportBundle;
use crate::rules::{reserved_modules_for_opposite, SeverityProfile, BEGINNER_MODULE, MUSCLE_MODULE};

use super::checks::{
    encoding_artifacts, integrity_issues, normalize_supplement, placeholder_patterns, section_severity,
    SCORED_SECTIONS,
};
use super::gender;
use super::CheckKind;

/// Sections whose text quotes the calorie target.
const TARGET_SECTIONS: [&str; 2] = ["profile_summary", "nutrition_overview"];

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub bundle: ReportBundle,
    pub adjustments: Vec<String>,
}

impl RepairOutcome {
    fn unchanged(bundle: &ReportBundle) -> Self {
        Self {
            bundle: bundle.clone(),
            adjustments: Vec::new(),
        }
    }
}

pub struct RepairEngine<'c> {
    catalog: &'c FoodCatalog,
}

impl<'c> RepairEngine<'c> {
    pub fn new(catalog: &'c FoodCatalog) -> Self {
        Self { catalog }
    }

    pub fn repair(&self, kind: CheckKind, bundle: &ReportBundle) -> RepairOutcome {
        let outcome = match kind {
            CheckKind::GenderCondition => gender_condition(bundle),
            CheckKind::MacroAccuracy => macro_accuracy(bundle),
            CheckKind::NarrativeScoreConsistency => narrative_score_consistency(bundle),
            CheckKind::ActivityTrainingAlignment => activity_training_alignment(bundle),
            CheckKind::FoodIntolerance => self.food_intolerance(bundle),
            CheckKind::SupplementDedup => supplement_dedup(bundle),
            CheckKind::PlaceholderClean => placeholder_clean(bundle),
            CheckKind::IntegrityAudit => self.integrity_audit(bundle),
        };
        for adjustment in &outcome.adjustments {
            info!(check = %kind, adjustment = %adjustment, "Applied repair");
        }
        outcome
    }

    fn food_intolerance(&self, bundle: &ReportBundle) -> RepairOutcome {
        let mut next = bundle.clone();
        let mut adjustments = Vec::new();
        let intolerances = &bundle.profile.food_intolerances;
        let conditions = &bundle.profile.medical_conditions;

        for day in next.meal_plan.days.iter_mut() {
            let mut dropped = Vec::new();
            for slot in MealSlot::ALL {
                day.slot_mut(slot).retain(|item| {
                    let conflicts = intolerances
                        .iter()
                        .any(|intolerance| item_conflicts_with(self.catalog, &item.name, intolerance))
                        || self
                            .catalog
                            .find_by_name(&item.name)
                            .is_some_and(|entry| entry.is_avoided_for(conditions));
                    if conflicts {
                        dropped.push(item.name.clone());
                    }
                    !conflicts
                });
            }
            if !dropped.is_empty() {
                day.recompute_totals();
                adjustments.push(format!("Removed {} from day {}", dropped.join(", "), day.day));
            }
        }
        RepairOutcome { bundle: next, adjustments }
    }

    fn integrity_audit(&self, bundle: &ReportBundle) -> RepairOutcome {
        let issues = integrity_issues(bundle);
        if issues.is_empty() {
            return RepairOutcome::unchanged(bundle);
        }

        let mut next = bundle.clone();
        let mut adjustments = Vec::new();

        if issues.iter().any(|issue| issue.needs_plan_regeneration()) {
            let profile = &mut next.profile;
            if profile.is_senior() && profile.calorie_target < profile.bmr {
                let raised = (profile.bmr / 10.0).ceil() * 10.0;
                adjustments.push(format!(
                    "Raised calorie target from {:.0} to {:.0} kcal (BMR floor)",
                    profile.calorie_target, raised
                ));
                profile.calorie_target = raised;
                profile.macro_targets = MacroTargets::for_calories(raised, profile.macro_targets.protein_g);
                for key in TARGET_SECTIONS {
                    if let Some(text) = template_section(key, &next.profile, &next.rules) {
                        set_section(&mut next, key, text);
                    }
                }
            }
            let num_days = u32::try_from(next.meal_plan.days.len()).unwrap_or(1).max(1);
            next.meal_plan = generate_meal_plan(self.catalog, &next.profile, num_days);
            adjustments.push(format!("Regenerated {}-day meal plan", num_days));
        }

        if issues.iter().any(|issue| !issue.needs_plan_regeneration()) {
            let mut seen = HashSet::new();
            let before = next.narratives.sections.len();
            next.narratives.sections.retain(|s| seen.insert(s.key.clone()));
            if next.narratives.sections.len() != before {
                adjustments.push("Removed duplicate narrative sections".to_string());
            }
            let gendered = gender_condition(&next);
            next = gendered.bundle;
            adjustments.extend(gendered.adjustments);
        }

        RepairOutcome { bundle: next, adjustments }
    }
}

fn set_section(bundle: &mut ReportBundle, key: &str, text: String) {
    if let Some(section) = bundle.narratives.sections.iter_mut().find(|s| s.key == key) {
        section.text = text;
    }
}

fn dedup_in_place(list: &mut Vec<String>) -> usize {
    let mut seen = HashSet::new();
    let before = list.len();
    list.retain(|value| seen.insert(value.clone()));
    before - list.len()
}

/// Strips opposite-gender conditions and modules, neutralises terms in
/// every narrative text and realigns salutations with the profile.
fn gender_condition(bundle: &ReportBundle) -> RepairOutcome {
    let mut next = bundle.clone();
    let mut adjustments = Vec::new();
    let gender = next.profile.gender;

    let (removed, kept): (Vec<String>, Vec<String>) = next
        .profile
        .medical_conditions
        .iter()
        .cloned()
        .partition(|condition| gender::is_reserved_condition(gender, condition));
    if !removed.is_empty() {
        next.profile.medical_conditions = kept;
        for condition in &removed {
            next.narratives.condition_notes.remove(condition);
            let flag = format!("condition:{}", condition.to_lowercase());
            next.rules.risk_flags.retain(|f| *f != flag);
        }
        adjustments.push(format!("Removed conditions not applicable to gender: {}", removed.join(", ")));
    }

    let reserved = reserved_modules_for_opposite(gender);
    let before = next.rules.active_modules.len();
    next.rules.active_modules.retain(|m| !reserved.contains(&m.as_str()));
    if next.rules.active_modules.len() != before {
        adjustments.push("Removed gender-restricted modules".to_string());
    }
    if dedup_in_place(&mut next.rules.active_modules) > 0 {
        adjustments.push("Removed duplicate modules".to_string());
    }

    let profile = next.profile.clone();
    let mut neutralized = false;
    let mut prefixed = false;
    for text in next.narratives.texts_mut() {
        let cleaned = gender::neutralize(gender, text);
        let fixed = gender::fix_prefixes(&profile, &cleaned);
        neutralized |= cleaned != *text;
        prefixed |= fixed != cleaned;
        *text = fixed;
    }
    if neutralized {
        adjustments.push("Replaced gender-specific terms in narratives".to_string());
    }
    if prefixed {
        adjustments.push("Corrected name prefixes in narratives".to_string());
    }

    RepairOutcome { bundle: next, adjustments }
}

/// Rescales every out-of-tolerance day: calories, carbs, fats and portions
/// by the calorie ratio, protein by the protein ratio, then recomputes the
/// totals from the items so they stay an exact sum.
fn macro_accuracy(bundle: &ReportBundle) -> RepairOutcome {
    let mut next = bundle.clone();
    let mut adjustments = Vec::new();
    let calorie_target = next.meal_plan.daily_calorie_target;
    let protein_target = next.profile.macro_targets.protein_g;

    for day in next.meal_plan.days.iter_mut() {
        day.recompute_totals();
        let current = day.totals;
        if current.calories <= 0.0 || current.protein <= 0.0 {
            warn!(day = day.day, "Day has no energy to rescale");
            continue;
        }
        let calorie_ratio = calorie_target / current.calories;
        let protein_ratio = protein_target / current.protein;
        let calories_ok = within_calorie_tolerance(current.calories, calorie_target);
        let protein_ok = within_protein_tolerance(current.protein, protein_target);
        if calories_ok && protein_ok {
            continue;
        }

        for item in day.items_mut() {
            if !calories_ok {
                item.calories = round1(item.calories * calorie_ratio);
                item.carbs = round1(item.carbs * calorie_ratio);
                item.fats = round1(item.fats * calorie_ratio);
                item.portion_g = ((f64::from(item.portion_g) * calorie_ratio).round() as u32).max(MIN_PORTION_G);
            }
            if !protein_ok {
                item.protein = round1(item.protein * protein_ratio);
            }
        }
        day.recompute_totals();
        adjustments.push(format!(
            "Rescaled day {} to {:.0} kcal and {:.0}g protein",
            day.day, calorie_target, protein_target
        ));
    }

    if adjustments.is_empty() && next != *bundle {
        adjustments.push("Recomputed day totals".to_string());
    }
    RepairOutcome { bundle: next, adjustments }
}

fn narrative_score_consistency(bundle: &ReportBundle) -> RepairOutcome {
    let mut next = bundle.clone();
    let mut adjustments = Vec::new();
    let mut rules = bundle.rules.clone();
    rules.severity = SeverityProfile::for_profile(&bundle.profile);

    for key in SCORED_SECTIONS {
        let (Some(severity), Some(text)) = (section_severity(bundle, key), bundle.narratives.section(key)) else {
            continue;
        };
        if tone_matches(text, severity) {
            continue;
        }
        if let Some(template) = template_section(key, &bundle.profile, &rules) {
            set_section(&mut next, key, template);
            adjustments.push(format!("Replaced '{}' with the {} template", key, severity.label()));
        }
    }
    RepairOutcome { bundle: next, adjustments }
}

fn activity_training_alignment(bundle: &ReportBundle) -> RepairOutcome {
    let mut next = bundle.clone();
    let modules = &mut next.rules.active_modules;

    let (remove, add) = if bundle.profile.is_beginner() {
        (MUSCLE_MODULE, BEGINNER_MODULE)
    } else {
        (BEGINNER_MODULE, MUSCLE_MODULE)
    };
    let had_wrong = modules.iter().any(|m| m == remove);
    if !had_wrong {
        return RepairOutcome::unchanged(bundle);
    }
    modules.retain(|m| m != remove);
    if !modules.iter().any(|m| m == add) {
        modules.push(add.to_string());
    }
    RepairOutcome {
        bundle: next,
        adjustments: vec![format!("Swapped '{}' for '{}'", remove, add)],
    }
}

fn supplement_dedup(bundle: &ReportBundle) -> RepairOutcome {
    let mut next = bundle.clone();
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    next.rules.supplements.retain(|name| {
        let keep = seen.insert(normalize_supplement(name));
        if !keep {
            dropped.push(name.clone());
        }
        keep
    });
    let adjustments = if dropped.is_empty() {
        Vec::new()
    } else {
        vec![format!("Removed duplicate supplements: {}", dropped.join(", "))]
    };
    RepairOutcome { bundle: next, adjustments }
}

fn strip_placeholders(text: &str) -> String {
    let dirty = placeholder_patterns().iter().any(|re| re.is_match(text))
        || encoding_artifacts().iter().any(|artifact| text.contains(artifact));
    if !dirty {
        return text.to_string();
    }
    let mut cleaned = text.to_string();
    for re in placeholder_patterns() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    for artifact in encoding_artifacts() {
        cleaned = cleaned.replace(artifact, "");
    }
    let collapsed: Vec<&str> = cleaned.split_whitespace().collect();
    collapsed.join(" ")
}

fn placeholder_clean(bundle: &ReportBundle) -> RepairOutcome {
    let mut next = bundle.clone();
    let mut touched = 0usize;
    for text in next.narratives.texts_mut() {
        let cleaned = strip_placeholders(text);
        if cleaned != *text {
            *text = cleaned;
            touched += 1;
        }
    }
    let adjustments = if touched == 0 {
        Vec::new()
    } else {
        vec![format!("Stripped placeholder tokens from {} narrative texts", touched)]
    };
    RepairOutcome { bundle: next, adjustments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::tests::sample_answers;
    use crate::profile::Gender;
    use crate::validation::checks::tests::bundle_for;
    use crate::validation::ValidationEngine;

    fn passes(kind: CheckKind, bundle: &ReportBundle) -> bool {
        let catalog = FoodCatalog::builtin().unwrap();
        ValidationEngine::new(&catalog).check(kind, bundle).passed
    }

    fn repair(kind: CheckKind, bundle: &ReportBundle) -> RepairOutcome {
        let catalog = FoodCatalog::builtin().unwrap();
        RepairEngine::new(&catalog).repair(kind, bundle)
    }

    #[test]
    fn test_gender_repair_strips_pcos_for_male() {
        let mut answers = sample_answers();
        answers.medical_conditions = vec!["PCOS".to_string(), "Thyroid".to_string()];
        let bundle = bundle_for(&answers, 1);
        let snapshot = bundle.clone();

        let outcome = repair(CheckKind::GenderCondition, &bundle);
        assert_eq!(bundle, snapshot);
        let fixed = &outcome.bundle;
        assert_eq!(fixed.profile.medical_conditions, vec!["Thyroid".to_string()]);
        assert!(!fixed.narratives.condition_notes.contains_key("PCOS"));
        for module in ["pcos_protocol", "ovarian_health", "menstrual_cycle", "women_hormone"] {
            assert!(!fixed.rules.active_modules.iter().any(|m| m == module));
        }
        assert!(passes(CheckKind::GenderCondition, fixed));
        assert!(passes(CheckKind::IntegrityAudit, fixed));
        assert!(!outcome.adjustments.is_empty());
    }

    #[test]
    fn test_macro_repair_restores_tolerances() {
        let mut bundle = bundle_for(&sample_answers(), 2);
        for item in bundle.meal_plan.days[0].items_mut() {
            item.calories *= 0.8;
            item.protein *= 0.7;
        }
        bundle.meal_plan.days[0].recompute_totals();
        assert!(!passes(CheckKind::MacroAccuracy, &bundle));

        let outcome = repair(CheckKind::MacroAccuracy, &bundle);
        let day = &outcome.bundle.meal_plan.days[0];
        assert!(within_calorie_tolerance(day.totals.calories, outcome.bundle.meal_plan.daily_calorie_target));
        assert!(within_protein_tolerance(day.totals.protein, outcome.bundle.profile.macro_targets.protein_g));
        assert!(day.totals_consistent());
        assert_eq!(outcome.bundle.meal_plan.days[1], bundle.meal_plan.days[1]);
        assert_eq!(outcome.adjustments.len(), 1);
    }

    #[test]
    fn test_macro_repair_fixes_stale_totals() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        bundle.meal_plan.days[0].totals.carbs += 40.0;
        let outcome = repair(CheckKind::MacroAccuracy, &bundle);
        assert!(outcome.bundle.meal_plan.days[0].totals_consistent());
        assert_eq!(outcome.adjustments, vec!["Recomputed day totals".to_string()]);
    }

    #[test]
    fn test_tone_repair_uses_template() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        let template = bundle.narratives.section("sleep_analysis").unwrap().to_string();
        set_section(&mut bundle, "sleep_analysis", "Your sleep is critical.".to_string());
        let outcome = repair(CheckKind::NarrativeScoreConsistency, &bundle);
        assert_eq!(outcome.bundle.narratives.section("sleep_analysis"), Some(template.as_str()));
    }

    #[test]
    fn test_activity_repair_swaps_modules() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        bundle.rules.active_modules.retain(|m| m != MUSCLE_MODULE);
        bundle.rules.active_modules.push(BEGINNER_MODULE.to_string());
        let outcome = repair(CheckKind::ActivityTrainingAlignment, &bundle);
        let modules = &outcome.bundle.rules.active_modules;
        assert!(modules.contains(&MUSCLE_MODULE.to_string()));
        assert!(!modules.contains(&BEGINNER_MODULE.to_string()));
    }

    #[test]
    fn test_intolerance_repair_drops_without_replacing() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        bundle.profile.food_intolerances = vec!["dairy".to_string()];
        let snack = bundle.meal_plan.days[0].evening_snack[0].clone();
        bundle.meal_plan.days[0].evening_snack = vec![crate::meal_plan::MealItem {
            name: "Paneer Tikka".to_string(),
            ..snack
        }];
        bundle.meal_plan.days[0].recompute_totals();

        let outcome = repair(CheckKind::FoodIntolerance, &bundle);
        let day = &outcome.bundle.meal_plan.days[0];
        assert!(day.evening_snack.is_empty());
        assert!(day.totals_consistent());
        assert!(passes(CheckKind::FoodIntolerance, &outcome.bundle));
    }

    #[test]
    fn test_supplement_repair_keeps_first_spelling() {
        let mut answers = sample_answers();
        answers.gender = Gender::Female;
        answers.medical_conditions = vec!["PCOS".to_string(), "Thyroid".to_string()];
        let outcome = repair(CheckKind::SupplementDedup, &bundle_for(&answers, 1));
        let supplements = &outcome.bundle.rules.supplements;
        assert!(supplements.contains(&"Vitamin D3".to_string()));
        assert!(!supplements.contains(&"vitamin  D3".to_string()));
    }

    #[test]
    fn test_placeholder_repair_only_touches_narratives() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        set_section(&mut bundle, "closing_note", "See you soon [TODO] {{name}} â€™".to_string());
        let outcome = repair(CheckKind::PlaceholderClean, &bundle);
        assert_eq!(outcome.bundle.narratives.section("closing_note"), Some("See you soon"));
        assert_eq!(outcome.bundle.meal_plan, bundle.meal_plan);
        assert!(passes(CheckKind::PlaceholderClean, &outcome.bundle));
    }

    #[test]
    fn test_integrity_repair_lifts_senior_target_and_regenerates() {
        let mut answers = sample_answers();
        answers.age = 68;
        answers.calorie_target_override = Some(1200.0);
        let bundle = bundle_for(&answers, 2);
        assert!(!passes(CheckKind::IntegrityAudit, &bundle));

        let outcome = repair(CheckKind::IntegrityAudit, &bundle);
        let fixed = &outcome.bundle;
        assert!(fixed.profile.calorie_target >= fixed.profile.bmr);
        assert_eq!(fixed.meal_plan.daily_calorie_target, fixed.profile.calorie_target);
        assert_eq!(fixed.meal_plan.days.len(), 2);
        assert!(passes(CheckKind::IntegrityAudit, fixed));
        assert!(passes(CheckKind::MacroAccuracy, fixed));
    }

    #[test]
    fn test_integrity_repair_fixes_prefix() {
        let mut bundle = bundle_for(&sample_answers(), 1);
        set_section(&mut bundle, "closing_note", "Ms. Rahul, see you soon.".to_string());
        let outcome = repair(CheckKind::IntegrityAudit, &bundle);
        assert_eq!(outcome.bundle.narratives.section("closing_note"), Some("Mr. Rahul, see you soon."));
        assert_eq!(outcome.bundle.meal_plan, bundle.meal_plan);
    }
}
