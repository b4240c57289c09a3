//! Multi-day meal plan generation.
//!
//! The pipeline per request is eligibility filter -> per-day selection ->
//! per-slot portion scaling -> whole-day corrective passes. Everything is
//! deterministic for a given profile and day count.

pub mod assembler;
pub mod eligibility;
pub mod portions;
pub mod selector;

use serde::{Deserialize, Serialize};

use crate::catalog::FoodCategory;
use crate::profile::MacroTargets;

pub use assembler::{generate_meal_plan, PlanAssembler};
pub use eligibility::{filter_eligible, EligiblePools};
pub use portions::{CALORIE_TOLERANCE, MIN_PORTION_G, PROTEIN_TOLERANCE_G};
pub use selector::{day_seed, DaySelector, SeededRng};

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    MidMorning,
    Lunch,
    EveningSnack,
    Dinner,
}

impl MealSlot {
    /// Iteration order for every per-day pass.
    pub const ALL: [MealSlot; 5] = [
        MealSlot::Breakfast,
        MealSlot::MidMorning,
        MealSlot::Lunch,
        MealSlot::EveningSnack,
        MealSlot::Dinner,
    ];

    pub fn category(self) -> FoodCategory {
        match self {
            MealSlot::Breakfast => FoodCategory::Breakfast,
            MealSlot::MidMorning | MealSlot::EveningSnack => FoodCategory::Snack,
            MealSlot::Lunch => FoodCategory::Lunch,
            MealSlot::Dinner => FoodCategory::Dinner,
        }
    }

    /// Fraction of the daily calorie target this slot should carry.
    pub fn calorie_share(self) -> f64 {
        match self {
            MealSlot::Breakfast => 0.25,
            MealSlot::MidMorning => 0.10,
            MealSlot::Lunch => 0.30,
            MealSlot::EveningSnack => 0.10,
            MealSlot::Dinner => 0.25,
        }
    }

    pub fn max_items(self) -> usize {
        match self {
            MealSlot::MidMorning | MealSlot::EveningSnack => 1,
            _ => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::MidMorning => "mid-morning snack",
            MealSlot::Lunch => "lunch",
            MealSlot::EveningSnack => "evening snack",
            MealSlot::Dinner => "dinner",
        }
    }
}

/// Portions travel as `"<grams>g"` strings on the wire.
mod portion_format {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(grams: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}g", grams))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim()
            .trim_end_matches('g')
            .trim()
            .parse::<u32>()
            .map_err(|_| D::Error::custom(format!("invalid portion '{}'", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    #[serde(rename = "portion", with = "portion_format")]
    pub portion_g: u32,
}

impl MealItem {
    pub fn portion(&self) -> String {
        format!("{}g", self.portion_g)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl MacroTotals {
    pub fn sum<'a>(items: impl IntoIterator<Item = &'a MealItem>) -> Self {
        let mut totals = items.into_iter().fold(MacroTotals::default(), |acc, item| MacroTotals {
            calories: acc.calories + item.calories,
            protein: acc.protein + item.protein,
            carbs: acc.carbs + item.carbs,
            fats: acc.fats + item.fats,
        });
        totals.calories = round1(totals.calories);
        totals.protein = round1(totals.protein);
        totals.carbs = round1(totals.carbs);
        totals.fats = round1(totals.fats);
        totals
    }
}

/// One day of the plan. `totals` must equal the sum of all slot items;
/// call [`DayPlan::recompute_totals`] after touching any item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u32,
    pub breakfast: Vec<MealItem>,
    pub mid_morning: Vec<MealItem>,
    pub lunch: Vec<MealItem>,
    pub evening_snack: Vec<MealItem>,
    pub dinner: Vec<MealItem>,
    pub totals: MacroTotals,
}

impl DayPlan {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            ..Default::default()
        }
    }

    pub fn slot(&self, slot: MealSlot) -> &[MealItem] {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::MidMorning => &self.mid_morning,
            MealSlot::Lunch => &self.lunch,
            MealSlot::EveningSnack => &self.evening_snack,
            MealSlot::Dinner => &self.dinner,
        }
    }

    pub fn slot_mut(&mut self, slot: MealSlot) -> &mut Vec<MealItem> {
        match slot {
            MealSlot::Breakfast => &mut self.breakfast,
            MealSlot::MidMorning => &mut self.mid_morning,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::EveningSnack => &mut self.evening_snack,
            MealSlot::Dinner => &mut self.dinner,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &MealItem> {
        MealSlot::ALL.into_iter().flat_map(move |slot| self.slot(slot).iter())
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut MealItem> {
        self.breakfast
            .iter_mut()
            .chain(self.mid_morning.iter_mut())
            .chain(self.lunch.iter_mut())
            .chain(self.evening_snack.iter_mut())
            .chain(self.dinner.iter_mut())
    }

    pub fn recompute_totals(&mut self) {
        self.totals = MacroTotals::sum(self.items());
    }

    pub fn totals_consistent(&self) -> bool {
        let fresh = MacroTotals::sum(self.items());
        (fresh.calories - self.totals.calories).abs() < 0.05
            && (fresh.protein - self.totals.protein).abs() < 0.05
            && (fresh.carbs - self.totals.carbs).abs() < 0.05
            && (fresh.fats - self.totals.fats).abs() < 0.05
    }

    pub fn slot_names(&self, slot: MealSlot) -> Vec<String> {
        self.slot(slot).iter().map(|item| item.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanBundle {
    pub days: Vec<DayPlan>,
    pub daily_calorie_target: f64,
    pub macro_targets: MacroTargets,
    pub notes: Vec<String>,
}
