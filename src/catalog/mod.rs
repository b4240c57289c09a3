//! Static food table shared read-only by every request.

pub mod allergens;
pub mod data_loader;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

pub use allergens::Allergen;
pub use data_loader::{load_food_catalog, parse_food_catalog};

/// Catalog shipped with the binary; parsed on first use.
const EMBEDDED_CATALOG_CSV: &str = include_str!("../../data/food_catalog.csv");

static BUILTIN_CATALOG: OnceLock<Arc<FoodCatalog>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl FromStr for FoodCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(FoodCategory::Breakfast),
            "lunch" => Ok(FoodCategory::Lunch),
            "dinner" => Ok(FoodCategory::Dinner),
            "snack" => Ok(FoodCategory::Snack),
            other => Err(anyhow!("Unknown food category '{}'", other)),
        }
    }
}

/// Coarse macro profile of a food, kept for display and future balancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroArchetype {
    Protein,
    Carb,
    Fat,
    Balanced,
}

impl FromStr for MacroArchetype {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "protein" => Ok(MacroArchetype::Protein),
            "carb" => Ok(MacroArchetype::Carb),
            "fat" => Ok(MacroArchetype::Fat),
            "balanced" => Ok(MacroArchetype::Balanced),
            other => Err(anyhow!("Unknown macro archetype '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Diet {
    Veg,
    NonVeg,
    Vegan,
    Eggetarian,
}

impl FromStr for Diet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "veg" | "vegetarian" => Ok(Diet::Veg),
            "non-veg" | "nonveg" | "non-vegetarian" => Ok(Diet::NonVeg),
            "vegan" => Ok(Diet::Vegan),
            "eggetarian" => Ok(Diet::Eggetarian),
            other => Err(anyhow!("Unknown diet '{}'", other)),
        }
    }
}

impl fmt::Display for Diet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Diet::Veg => "veg",
            Diet::NonVeg => "non-veg",
            Diet::Vegan => "vegan",
            Diet::Eggetarian => "eggetarian",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionPer100g {
    pub kcal: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub name: String,
    pub category: FoodCategory,
    pub archetype: MacroArchetype,
    pub per_100g: NutritionPer100g,
    pub default_portion_g: u32,
    pub diets: Vec<Diet>,
    pub relevant_conditions: Vec<String>,
    pub avoid_conditions: Vec<String>,
    pub intolerance_tags: Vec<Allergen>,
}

impl FoodEntry {
    pub fn suits_diet(&self, diet: Diet) -> bool {
        self.diets.contains(&diet)
    }

    /// Avoidance terms are matched as case-insensitive substrings of the
    /// user's condition, so "type 2 diabetes" hits an entry avoiding "diabetes".
    pub fn is_avoided_for(&self, conditions: &[String]) -> bool {
        conditions.iter().any(|condition| {
            let condition = condition.to_lowercase();
            self.avoid_conditions
                .iter()
                .any(|avoid| condition.contains(&avoid.to_lowercase()))
        })
    }

    pub fn is_relevant_for(&self, conditions: &[String]) -> bool {
        conditions.iter().any(|condition| {
            let condition = condition.to_lowercase();
            self.relevant_conditions
                .iter()
                .any(|relevant| condition.contains(&relevant.to_lowercase()))
        })
    }

    /// A tag or a name pattern hit is enough; a tag never vouches for the
    /// absence of another allergen.
    pub fn conflicts_with(&self, intolerance: &str) -> bool {
        match Allergen::from_intolerance(intolerance) {
            Some(allergen) => {
                self.intolerance_tags.contains(&allergen) || allergen.matches_name(&self.name)
            }
            None => allergens::legacy_name_match(&self.name, intolerance),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodCatalog {
    entries: Vec<FoodEntry>,
}

impl FoodCatalog {
    pub fn new(entries: Vec<FoodEntry>) -> Self {
        Self { entries }
    }

    /// The embedded catalog, parsed once per process.
    pub fn builtin() -> Result<Arc<FoodCatalog>> {
        if let Some(catalog) = BUILTIN_CATALOG.get() {
            return Ok(Arc::clone(catalog));
        }
        let parsed = Arc::new(parse_food_catalog(EMBEDDED_CATALOG_CSV.as_bytes())?);
        Ok(Arc::clone(BUILTIN_CATALOG.get_or_init(|| parsed)))
    }

    pub fn entries(&self) -> &[FoodEntry] {
        &self.entries
    }

    pub fn by_category(&self, category: FoodCategory) -> impl Iterator<Item = &FoodEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&FoodEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Intolerance test for a meal item that is only known by name: use the
/// catalog entry when the name resolves, the legacy pattern otherwise.
pub fn item_conflicts_with(catalog: &FoodCatalog, item_name: &str, intolerance: &str) -> bool {
    match catalog.find_by_name(item_name) {
        Some(entry) => entry.conflicts_with(intolerance),
        None => match Allergen::from_intolerance(intolerance) {
            Some(allergen) => allergen.matches_name(item_name),
            None => allergens::legacy_name_match(item_name, intolerance),
        },
    }
}
