use crate::catalog::{FoodCatalog, FoodCategory, FoodEntry};
use crate::profile::UserHealthProfile;

/// Foods a profile may eat, split by whether they target one of its
/// conditions. The two pools are disjoint and keep catalog order.
#[derive(Debug, Clone, Default)]
pub struct EligiblePools<'a> {
    pub preferred: Vec<&'a FoodEntry>,
    pub regular: Vec<&'a FoodEntry>,
}

impl<'a> EligiblePools<'a> {
    /// Preferred foods first, then regular ones.
    pub fn for_category(&self, category: FoodCategory) -> Vec<&'a FoodEntry> {
        self.preferred
            .iter()
            .chain(self.regular.iter())
            .filter(|entry| entry.category == category)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.preferred.len() + self.regular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Diet, then condition avoidance, then intolerances. An empty result is not
/// an error: the selector falls back to the raw catalog per category.
pub fn filter_eligible<'a>(
    catalog: &'a FoodCatalog,
    profile: &UserHealthProfile,
) -> EligiblePools<'a> {
    let mut pools = EligiblePools::default();

    for entry in catalog.entries() {
        if !entry.suits_diet(profile.diet_preference) {
            continue;
        }
        if entry.is_avoided_for(&profile.medical_conditions) {
            continue;
        }
        if profile
            .food_intolerances
            .iter()
            .any(|intolerance| entry.conflicts_with(intolerance))
        {
            continue;
        }

        if entry.is_relevant_for(&profile.medical_conditions) {
            pools.preferred.push(entry);
        } else {
            pools.regular.push(entry);
        }
    }

    tracing::debug!(
        preferred = pools.preferred.len(),
        regular = pools.regular.len(),
        diet = %profile.diet_preference,
        "Filtered food catalog for profile"
    );
    pools
}
