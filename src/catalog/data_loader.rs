use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::warn;

use super::{Allergen, Diet, FoodCatalog, FoodCategory, FoodEntry, MacroArchetype, NutritionPer100g};

// Expected column headers
const NAME_COL: &str = "name";
const CATEGORY_COL: &str = "category";
const ARCHETYPE_COL: &str = "archetype";
const KCAL_COL: &str = "kcal_per_100g";
const PROTEIN_COL: &str = "protein_g_per_100g";
const CARB_COL: &str = "carbs_g_per_100g";
const FAT_COL: &str = "fat_g_per_100g";
const PORTION_COL: &str = "default_portion_g";
const DIETS_COL: &str = "diets";
const RELEVANT_COL: &str = "relevant_conditions";
const AVOID_COL: &str = "avoid_conditions";
const TAGS_COL: &str = "intolerance_tags";

const LIST_SEPARATOR: char = '|';

fn split_list(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_nutrient(raw: &str, column: &str, row_index: usize) -> Result<f64> {
    let value = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Column '{}' at row {} is not a number: '{}'", column, row_index, raw))?;
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("Column '{}' at row {} must be a non-negative number, got {}", column, row_index, value));
    }
    Ok(value)
}

/// Adds every tag the name implies but the row left out.
fn with_name_tags(name: &str, mut tags: Vec<Allergen>) -> Vec<Allergen> {
    for allergen in Allergen::ALL {
        if allergen.matches_name(name) && !tags.contains(&allergen) {
            warn!(food = %name, allergen = ?allergen, "Catalog row missing intolerance tag, adding it");
            tags.push(allergen);
        }
    }
    tags
}

pub fn load_food_catalog(csv_path: &Path) -> Result<FoodCatalog> {
    if !csv_path.exists() {
        return Err(anyhow!("Food catalog CSV file not found at: {:?}", csv_path));
    }
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open food catalog CSV file at {:?}", csv_path))?;
    parse_food_catalog(file).with_context(|| format!("Failed to parse food catalog at {:?}", csv_path))
}

pub fn parse_food_catalog<R: Read>(reader: R) -> Result<FoodCatalog> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| anyhow!("Column '{}' not found", name))
    };
    let name_idx = column(NAME_COL)?;
    let category_idx = column(CATEGORY_COL)?;
    let archetype_idx = column(ARCHETYPE_COL)?;
    let kcal_idx = column(KCAL_COL)?;
    let protein_idx = column(PROTEIN_COL)?;
    let carb_idx = column(CARB_COL)?;
    let fat_idx = column(FAT_COL)?;
    let portion_idx = column(PORTION_COL)?;
    let diets_idx = column(DIETS_COL)?;
    let relevant_idx = column(RELEVANT_COL)?;
    let avoid_idx = column(AVOID_COL)?;
    let tags_idx = column(TAGS_COL)?;

    let mut entries = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let name = field(name_idx).trim().to_string();
        if name.is_empty() {
            continue;
        }

        let category: FoodCategory = field(category_idx)
            .parse()
            .with_context(|| format!("Row {} ('{}')", row_index, name))?;
        let archetype: MacroArchetype = field(archetype_idx)
            .parse()
            .with_context(|| format!("Row {} ('{}')", row_index, name))?;
        let diets = split_list(field(diets_idx))
            .iter()
            .map(|d| d.parse::<Diet>())
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Row {} ('{}')", row_index, name))?;
        let listed_tags = split_list(field(tags_idx))
            .iter()
            .map(|t| t.parse::<Allergen>())
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Row {} ('{}')", row_index, name))?;
        let intolerance_tags = with_name_tags(&name, listed_tags);

        let per_100g = NutritionPer100g {
            kcal: parse_nutrient(field(kcal_idx), KCAL_COL, row_index)?,
            protein_g: parse_nutrient(field(protein_idx), PROTEIN_COL, row_index)?,
            carbs_g: parse_nutrient(field(carb_idx), CARB_COL, row_index)?,
            fat_g: parse_nutrient(field(fat_idx), FAT_COL, row_index)?,
        };
        if per_100g.kcal == 0.0 {
            return Err(anyhow!("Row {} ('{}') has zero calories per 100g", row_index, name));
        }

        let default_portion_g = field(portion_idx)
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Column '{}' at row {} is not a whole number of grams", PORTION_COL, row_index))?;

        entries.push(FoodEntry {
            name,
            category,
            archetype,
            per_100g,
            default_portion_g,
            diets,
            relevant_conditions: split_list(field(relevant_idx)),
            avoid_conditions: split_list(field(avoid_idx)),
            intolerance_tags,
        });
    }

    if entries.is_empty() {
        return Err(anyhow!("No valid food entries loaded"));
    }

    Ok(FoodCatalog::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "name,category,archetype,kcal_per_100g,protein_g_per_100g,carbs_g_per_100g,fat_g_per_100g,default_portion_g,diets,relevant_conditions,avoid_conditions,intolerance_tags";

    fn create_test_csv_file(rows: &[&str]) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", HEADER)?;
        for row in rows {
            writeln!(file, "{}", row)?;
        }
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_food_catalog_success() -> Result<()> {
        let file = create_test_csv_file(&[
            "Apple Slices,snack,carb,52,0.3,13.8,0.2,150,vegan|veg,diabetes,,",
            ",snack,carb,10,1,1,1,100,veg,,,", // empty name is skipped
            "Paneer Roll,lunch,protein,250,12,20,14,200,veg,,kidney,dairy|gluten",
        ])?;
        let catalog = load_food_catalog(file.path())?;
        assert_eq!(catalog.len(), 2);

        let roll = catalog.find_by_name("paneer roll").unwrap();
        assert_eq!(roll.category, FoodCategory::Lunch);
        assert_eq!(roll.intolerance_tags, vec![Allergen::Dairy, Allergen::Gluten]);
        assert_eq!(roll.avoid_conditions, vec!["kidney".to_string()]);
        assert!(roll.relevant_conditions.is_empty());

        let apple = catalog.find_by_name("Apple Slices").unwrap();
        assert_eq!(apple.diets, vec![Diet::Vegan, Diet::Veg]);
        assert_eq!(apple.per_100g.kcal, 52.0);
        Ok(())
    }

    #[test]
    fn test_load_food_catalog_adds_tags_implied_by_name() -> Result<()> {
        let file = create_test_csv_file(&["Paneer Paratha,breakfast,balanced,290,11,30,14,150,veg,,,gluten"])?;
        let catalog = load_food_catalog(file.path())?;
        let paratha = catalog.find_by_name("Paneer Paratha").unwrap();
        assert_eq!(paratha.intolerance_tags, vec![Allergen::Gluten, Allergen::Dairy]);
        assert!(paratha.conflicts_with("dairy"));
        Ok(())
    }

    #[test]
    fn test_load_food_catalog_missing_column() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "name,category,archetype")?;
        writeln!(file, "Apple,snack,carb")?;
        file.flush()?;

        let result = load_food_catalog(file.path());
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains(&format!("Column '{}' not found", KCAL_COL)));
        Ok(())
    }

    #[test]
    fn test_load_food_catalog_rejects_bad_numbers() -> Result<()> {
        let file = create_test_csv_file(&["Apple,snack,carb,lots,0.3,13.8,0.2,150,veg,,,"])?;
        let result = load_food_catalog(file.path());
        assert!(format!("{:#}", result.unwrap_err()).contains("is not a number"));

        let file = create_test_csv_file(&["Apple,snack,carb,52,-1,13.8,0.2,150,veg,,,"])?;
        let result = load_food_catalog(file.path());
        assert!(format!("{:#}", result.unwrap_err()).contains("non-negative"));
        Ok(())
    }

    #[test]
    fn test_load_food_catalog_rejects_unknown_category() -> Result<()> {
        let file = create_test_csv_file(&["Apple,brunch,carb,52,0.3,13.8,0.2,150,veg,,,"])?;
        let result = load_food_catalog(file.path());
        assert!(format!("{:#}", result.unwrap_err()).contains("Unknown food category"));
        Ok(())
    }

    #[test]
    fn test_load_food_catalog_empty_file_with_headers() -> Result<()> {
        let file = create_test_csv_file(&[])?;
        let result = load_food_catalog(file.path());
        assert!(format!("{:#}", result.unwrap_err()).contains("No valid food entries loaded"));
        Ok(())
    }

    #[test]
    fn test_load_food_catalog_file_not_found() {
        let path = Path::new("this_file_does_not_exist.csv");
        let result = load_food_catalog(path);
        assert!(result.unwrap_err().to_string().contains("Food catalog CSV file not found"));
    }
}
