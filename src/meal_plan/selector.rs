use crate::catalog::{FoodCatalog, FoodEntry};
use crate::profile::{Gender, UserHealthProfile};

use super::{EligiblePools, MealSlot};

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233280;

/// Small linear-congruential generator. Only used for shuffling; the exact
/// sequence is part of the reproducibility contract, so do not swap it for
/// a "better" RNG.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed % LCG_MODULUS }
    }

    /// Next value in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_f64() * (i + 1) as f64).floor() as usize;
            items.swap(i, j.min(i));
        }
    }
}

fn gender_offset(gender: Gender) -> u64 {
    match gender {
        Gender::Male => 100,
        Gender::Female | Gender::Other => 200,
    }
}

/// `age + weight + genderOffset + day * 1000`, with weight rounded to whole kg.
pub fn day_seed(profile: &UserHealthProfile, day_index: u32) -> u64 {
    u64::from(profile.age)
        + profile.weight_kg.max(0.0).round() as u64
        + gender_offset(profile.gender)
        + u64::from(day_index) * 1000
}

/// Picks foods for every slot of one day.
pub struct DaySelector<'c, 'p> {
    catalog: &'c FoodCatalog,
    pools: &'p EligiblePools<'c>,
    rng: SeededRng,
}

impl<'c, 'p> DaySelector<'c, 'p> {
    pub fn new(
        catalog: &'c FoodCatalog,
        pools: &'p EligiblePools<'c>,
        profile: &UserHealthProfile,
        day_index: u32,
    ) -> Self {
        Self {
            catalog,
            pools,
            rng: SeededRng::new(day_seed(profile, day_index)),
        }
    }

    /// `previous` holds the names chosen for this slot on the day before.
    pub fn select(&mut self, slot: MealSlot, previous: &[String]) -> Vec<&'c FoodEntry> {
        let category = slot.category();
        let mut pool = self.pools.for_category(category);
        if pool.is_empty() {
            tracing::warn!(
                slot = slot.label(),
                "No eligible foods, falling back to full catalog category"
            );
            pool = self.catalog.by_category(category).collect();
        }

        let fresh: Vec<&'c FoodEntry> = pool
            .iter()
            .filter(|entry| !previous.iter().any(|name| name == &entry.name))
            .copied()
            .collect();
        if !fresh.is_empty() {
            pool = fresh;
        }

        self.rng.shuffle(&mut pool);
        pool.truncate(slot.max_items());
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_food_catalog, Diet};
    use crate::meal_plan::filter_eligible;
    use crate::profile::tests::sample_answers;

    const FIXTURE: &str = "name,category,archetype,kcal_per_100g,protein_g_per_100g,carbs_g_per_100g,fat_g_per_100g,default_portion_g,diets,relevant_conditions,avoid_conditions,intolerance_tags
Oats Bowl,breakfast,carb,150,5,27,3,250,vegan|veg,,,
Chicken Rice,lunch,protein,180,12,20,5,300,non-veg,,,
Dal Soup,dinner,balanced,110,7,15,2,300,vegan|veg,,,
Apple,snack,carb,52,0.3,14,0.2,150,vegan|veg,,,
";

    fn vegan_profile() -> UserHealthProfile {
        let mut answers = sample_answers();
        answers.diet_preference = Diet::Vegan;
        UserHealthProfile::from_answers(&answers).unwrap()
    }

    #[test]
    fn test_lcg_sequence_is_fixed() {
        let mut rng = SeededRng::new(0);
        // (0 * 9301 + 49297) % 233280
        assert_eq!(rng.next_f64(), 49297.0 / 233280.0);
        let mut a = SeededRng::new(1200);
        let mut b = SeededRng::new(1200);
        for _ in 0..10 {
            let x = a.next_f64();
            assert_eq!(x, b.next_f64());
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_day_seed_formula() {
        let profile = UserHealthProfile::from_answers(&sample_answers()).unwrap();
        assert_eq!(day_seed(&profile, 0), 30 + 70 + 100);
        assert_eq!(day_seed(&profile, 2), 30 + 70 + 100 + 2000);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut values: Vec<u32> = (0..20).collect();
        SeededRng::new(42).shuffle(&mut values);
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_selection_sizes_and_repeat_avoidance() {
        let catalog = FoodCatalog::builtin().unwrap();
        let profile = UserHealthProfile::from_answers(&sample_answers()).unwrap();
        let pools = filter_eligible(&catalog, &profile);

        let mut day0 = DaySelector::new(&catalog, &pools, &profile, 0);
        let lunch = day0.select(MealSlot::Lunch, &[]);
        let snack = day0.select(MealSlot::MidMorning, &[]);
        assert_eq!(lunch.len(), 2);
        assert_eq!(snack.len(), 1);

        let previous: Vec<String> = lunch.iter().map(|e| e.name.clone()).collect();
        let mut day1 = DaySelector::new(&catalog, &pools, &profile, 1);
        let next_lunch = day1.select(MealSlot::Lunch, &previous);
        assert!(next_lunch.iter().all(|e| !previous.contains(&e.name)));
    }

    #[test]
    fn test_same_inputs_same_picks() {
        let catalog = FoodCatalog::builtin().unwrap();
        let profile = UserHealthProfile::from_answers(&sample_answers()).unwrap();
        let pools = filter_eligible(&catalog, &profile);
        let pick = |day| {
            let mut selector = DaySelector::new(&catalog, &pools, &profile, day);
            MealSlot::ALL
                .iter()
                .flat_map(|slot| selector.select(*slot, &[]))
                .map(|e| e.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(3), pick(3));
    }

    #[test]
    fn test_empty_category_falls_back_to_catalog() {
        let catalog = parse_food_catalog(FIXTURE.as_bytes()).unwrap();
        let profile = vegan_profile();
        let pools = filter_eligible(&catalog, &profile);
        assert!(pools.for_category(MealSlot::Lunch.category()).is_empty());

        for day in 0..2 {
            let mut selector = DaySelector::new(&catalog, &pools, &profile, day);
            let lunch: Vec<&str> = selector
                .select(MealSlot::Lunch, &[])
                .iter()
                .map(|e| e.name.as_str())
                .collect();
            assert_eq!(lunch, vec!["Chicken Rice"]);
        }
    }

    #[test]
    fn test_single_entry_repeats_rather_than_empties() {
        let catalog = parse_food_catalog(FIXTURE.as_bytes()).unwrap();
        let profile = vegan_profile();
        let pools = filter_eligible(&catalog, &profile);

        let mut day0 = DaySelector::new(&catalog, &pools, &profile, 0);
        let first = day0.select(MealSlot::MidMorning, &[]);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "Apple");

        let previous = vec![first[0].name.clone()];
        let mut day1 = DaySelector::new(&catalog, &pools, &profile, 1);
        let second = day1.select(MealSlot::MidMorning, &previous);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "Apple");
    }
}
