//! Gram portions for selected foods, plus the two whole-day corrective passes.
//!
//! Pass ordering is a policy: protein (±5g) is locked first, calories (±3%)
//! are corrected afterwards without touching protein. Pass 2 does not
//! recompute carbs or fats, so a corrected day's macro breakdown can drift
//! slightly from its calories.

use crate::catalog::FoodEntry;

use super::{round1, DayPlan, MealItem};

pub const MIN_PORTION_G: u32 = 10;
/// Portions at or below this are placeholders, not food.
pub const TRIVIAL_PORTION_G: u32 = 1;
pub const PROTEIN_KCAL_PER_G: f64 = 4.0;
pub const CALORIE_TOLERANCE: f64 = 0.03;
pub const PROTEIN_TOLERANCE_G: f64 = 5.0;

fn scaled_grams(grams: u32, factor: f64) -> u32 {
    ((f64::from(grams) * factor).round() as u32).max(MIN_PORTION_G)
}

/// Splits `slot_calories` evenly over `foods` and converts each share into
/// whole grams. Macros come from the rounded grams, not the raw factor.
pub fn scale_slot(foods: &[&FoodEntry], slot_calories: f64) -> Vec<MealItem> {
    if foods.is_empty() {
        return Vec::new();
    }
    let per_food = slot_calories / foods.len() as f64;

    foods
        .iter()
        .map(|food| {
            let factor = per_food / food.per_100g.kcal;
            let grams = ((factor * 100.0).round() as u32).max(MIN_PORTION_G);
            let actual = f64::from(grams) / 100.0;
            MealItem {
                name: food.name.clone(),
                calories: round1(food.per_100g.kcal * actual),
                protein: round1(food.per_100g.protein_g * actual),
                carbs: round1(food.per_100g.carbs_g * actual),
                fats: round1(food.per_100g.fat_g * actual),
                portion_g: grams,
            }
        })
        .collect()
}

/// Pass 1: scale every item's protein so the day hits `protein_target`,
/// moving 4 kcal per gram gained or lost and resizing the portion to match.
pub fn lock_protein(day: &mut DayPlan, protein_target: f64) {
    day.recompute_totals();
    let current = day.totals.protein;
    if current <= 0.0 || protein_target <= 0.0 {
        return;
    }
    let ratio = protein_target / current;

    for item in day.items_mut() {
        let new_protein = round1(item.protein * ratio);
        let new_calories = round1(item.calories + (new_protein - item.protein) * PROTEIN_KCAL_PER_G);
        if item.calories > 0.0 {
            item.portion_g = scaled_grams(item.portion_g, new_calories / item.calories);
        }
        item.protein = new_protein;
        item.calories = new_calories;
    }
    day.recompute_totals();
}

/// Pass 2: when calories are off by more than the tolerance, scale item
/// calories and portions to the target. Protein is left alone.
pub fn correct_calories(day: &mut DayPlan, calorie_target: f64) {
    day.recompute_totals();
    let current = day.totals.calories;
    if current <= 0.0 || calorie_target <= 0.0 {
        return;
    }
    if ((current - calorie_target) / calorie_target).abs() <= CALORIE_TOLERANCE {
        return;
    }
    let ratio = calorie_target / current;

    for item in day.items_mut() {
        item.calories = round1(item.calories * ratio);
        item.portion_g = scaled_grams(item.portion_g, ratio);
    }
    day.recompute_totals();
}

pub fn apply_corrective_passes(day: &mut DayPlan, calorie_target: f64, protein_target: f64) {
    lock_protein(day, protein_target);
    correct_calories(day, calorie_target);
}

pub fn within_calorie_tolerance(actual: f64, target: f64) -> bool {
    target > 0.0 && ((actual - target) / target).abs() <= CALORIE_TOLERANCE
}

pub fn within_protein_tolerance(actual: f64, target: f64) -> bool {
    (actual - target).abs() <= PROTEIN_TOLERANCE_G
}
