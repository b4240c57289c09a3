use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

/// Structured intolerance tag carried by catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allergen {
    Dairy,
    Gluten,
    Nuts,
    Egg,
    Soy,
    Seafood,
}

// Name patterns, checked alongside the structured tags.
const DAIRY_PATTERN: &str =
    r"(?i)\b(milk|buttermilk|paneer|curd|yogh?urt|cheese|butter|ghee|cream|lassi|chaas|whey|dahi|raita|kheer)\b";
const GLUTEN_PATTERN: &str =
    r"(?i)\b(wheat|roti|chapati|bread|toast|pasta|barley|semolina|suji|rava|upma|paratha|dalia|naan)\b";
const NUTS_PATTERN: &str = r"(?i)\b(nuts?|almonds?|cashews?|walnuts?|peanuts?|pistachios?)\b";
const EGG_PATTERN: &str = r"(?i)\b(eggs?|omelette)\b";
const SOY_PATTERN: &str = r"(?i)\b(soy|soya|tofu|tempeh|edamame)\b";
const SEAFOOD_PATTERN: &str = r"(?i)\b(fish|prawns?|shrimps?|salmon|tuna|crab)\b";

static NAME_PATTERNS: OnceLock<Vec<(Allergen, Regex)>> = OnceLock::new();

fn name_patterns() -> &'static [(Allergen, Regex)] {
    NAME_PATTERNS.get_or_init(|| {
        [
            (Allergen::Dairy, DAIRY_PATTERN),
            (Allergen::Gluten, GLUTEN_PATTERN),
            (Allergen::Nuts, NUTS_PATTERN),
            (Allergen::Egg, EGG_PATTERN),
            (Allergen::Soy, SOY_PATTERN),
            (Allergen::Seafood, SEAFOOD_PATTERN),
        ]
        .into_iter()
        .filter_map(|(allergen, pattern)| Regex::new(pattern).ok().map(|re| (allergen, re)))
        .collect()
    })
}

impl Allergen {
    pub const ALL: [Allergen; 6] = [
        Allergen::Dairy,
        Allergen::Gluten,
        Allergen::Nuts,
        Allergen::Egg,
        Allergen::Soy,
        Allergen::Seafood,
    ];

    /// Maps a free-text intolerance from the quiz onto a tag. Unknown
    /// intolerances return `None` and are handled by plain substring matching.
    pub fn from_intolerance(intolerance: &str) -> Option<Self> {
        match intolerance.trim().to_lowercase().as_str() {
            "dairy" | "lactose" | "milk" | "lactose intolerance" => Some(Allergen::Dairy),
            "gluten" | "wheat" | "celiac" | "coeliac" => Some(Allergen::Gluten),
            "nuts" | "nut" | "peanut" | "peanuts" | "tree nuts" => Some(Allergen::Nuts),
            "egg" | "eggs" => Some(Allergen::Egg),
            "soy" | "soya" => Some(Allergen::Soy),
            "seafood" | "fish" | "shellfish" => Some(Allergen::Seafood),
            _ => None,
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        name_patterns()
            .iter()
            .find(|(allergen, _)| allergen == self)
            .is_some_and(|(_, re)| re.is_match(name))
    }
}

impl FromStr for Allergen {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Allergen::from_intolerance(s).ok_or_else(|| anyhow::anyhow!("Unknown intolerance tag '{}'", s))
    }
}

/// Last-resort match for intolerances with no known tag.
pub fn legacy_name_match(name: &str, intolerance: &str) -> bool {
    let needle = intolerance.trim().to_lowercase();
    !needle.is_empty() && name.to_lowercase().contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dairy_pattern_matches_whole_words() {
        assert!(Allergen::Dairy.matches_name("Paneer Bhurji"));
        assert!(Allergen::Dairy.matches_name("Greek Yoghurt"));
        assert!(Allergen::Dairy.matches_name("Buttermilk"));
        assert!(!Allergen::Dairy.matches_name("Butternut Squash Soup"));
    }

    #[test]
    fn test_nut_pattern_does_not_hit_coconut() {
        assert!(Allergen::Nuts.matches_name("Mixed Nuts"));
        assert!(Allergen::Nuts.matches_name("Peanut Chikki"));
        assert!(!Allergen::Nuts.matches_name("Coconut Chutney"));
    }

    #[test]
    fn test_intolerance_synonyms() {
        assert_eq!(Allergen::from_intolerance("Lactose"), Some(Allergen::Dairy));
        assert_eq!(Allergen::from_intolerance(" celiac "), Some(Allergen::Gluten));
        assert_eq!(Allergen::from_intolerance("sesame"), None);
    }
}
