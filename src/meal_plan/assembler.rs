use std::collections::HashMap;

use crate::catalog::FoodCatalog;
use crate::profile::UserHealthProfile;

use super::portions::{apply_corrective_passes, scale_slot};
use super::{filter_eligible, DayPlan, DaySelector, EligiblePools, MealPlanBundle, MealSlot};

pub struct PlanAssembler<'c> {
    catalog: &'c FoodCatalog,
}

impl<'c> PlanAssembler<'c> {
    pub fn new(catalog: &'c FoodCatalog) -> Self {
        Self { catalog }
    }

    fn build_day(
        &self,
        pools: &EligiblePools<'c>,
        profile: &UserHealthProfile,
        day_index: u32,
        previous: &HashMap<MealSlot, Vec<String>>,
    ) -> DayPlan {
        let calorie_target = profile.calorie_target;
        let mut selector = DaySelector::new(self.catalog, pools, profile, day_index);
        let mut day = DayPlan::new(day_index + 1);

        for slot in MealSlot::ALL {
            let last_time = previous.get(&slot).map(Vec::as_slice).unwrap_or(&[]);
            let foods = selector.select(slot, last_time);
            *day.slot_mut(slot) = scale_slot(&foods, calorie_target * slot.calorie_share());
        }
        day.recompute_totals();

        apply_corrective_passes(&mut day, calorie_target, profile.macro_targets.protein_g);
        day.recompute_totals();

        tracing::debug!(
            day = day.day,
            calories = day.totals.calories,
            protein = day.totals.protein,
            "Assembled day plan"
        );
        day
    }

    pub fn assemble(&self, profile: &UserHealthProfile, num_days: u32) -> MealPlanBundle {
        let pools = filter_eligible(self.catalog, profile);
        let mut days = Vec::with_capacity(num_days as usize);
        let mut previous: HashMap<MealSlot, Vec<String>> = HashMap::new();

        for day_index in 0..num_days {
            let day = self.build_day(&pools, profile, day_index, &previous);
            previous = MealSlot::ALL
                .into_iter()
                .map(|slot| (slot, day.slot_names(slot)))
                .collect();
            days.push(day);
        }

        MealPlanBundle {
            days,
            daily_calorie_target: profile.calorie_target,
            macro_targets: profile.macro_targets,
            notes: plan_notes(profile),
        }
    }
}

fn plan_notes(profile: &UserHealthProfile) -> Vec<String> {
    let mut notes = vec![
        "Portions are cooked weights in grams.".to_string(),
        format!(
            "Each day is tuned to about {:.0} kcal and {:.0}g protein.",
            profile.calorie_target, profile.macro_targets.protein_g
        ),
        "Carb and fat figures are computed from the base portion and may differ slightly after calorie tuning."
            .to_string(),
    ];
    if !profile.food_intolerances.is_empty() {
        notes.push(format!("Foods excluded for: {}.", profile.food_intolerances.join(", ")));
    }
    notes
}

/// Convenience entry point for a single plan.
pub fn generate_meal_plan(
    catalog: &FoodCatalog,
    profile: &UserHealthProfile,
    num_days: u32,
) -> MealPlanBundle {
    PlanAssembler::new(catalog).assemble(profile, num_days)
}
