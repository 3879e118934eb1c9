use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reserved id prefix for recipes created through the service. Anything
/// without it belongs to the built-in catalog and is read-only.
pub const USER_RECIPE_PREFIX: &str = "user-recipe-";

pub const DEFAULT_RECIPE_IMAGE: &str =
    "https://images.unsplash.com/photo-1546069901-ba9599a7e63c?w=800&auto=format";

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snacks"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => bail!("Invalid difficulty '{s}'. Must be one of: easy, medium, hard"),
        }
    }
}

fn default_image() -> String {
    DEFAULT_RECIPE_IMAGE.to_string()
}

fn default_servings() -> u32 {
    1
}

/// A recipe as stored under `nutricoach_user_recipes` or bundled in the catalog.
///
/// Every field except `id` carries a serde default so that loosely-shaped
/// imports still parse and can be rejected by validation with a useful message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prep_time: u32,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

impl Recipe {
    #[must_use]
    pub fn is_user_created(&self) -> bool {
        is_user_recipe_id(&self.id)
    }

    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Case-insensitive substring match against title, ingredients, and categories.
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn matches_term(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .ingredients
                .iter()
                .any(|i| i.to_lowercase().contains(needle))
            || self
                .categories
                .iter()
                .any(|c| c.to_lowercase().contains(needle))
    }
}

/// Recipe payload without an id, as accepted by create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prep_time: u32,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

impl NewRecipe {
    #[must_use]
    pub fn into_recipe(self, id: String) -> Recipe {
        Recipe {
            id,
            title: self.title,
            image: if self.image.trim().is_empty() {
                default_image()
            } else {
                self.image
            },
            difficulty: self.difficulty,
            prep_time: self.prep_time,
            servings: self.servings,
            categories: self.categories,
            ingredients: self.ingredients,
            instructions: self.instructions,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

impl From<Recipe> for NewRecipe {
    fn from(recipe: Recipe) -> Self {
        Self {
            title: recipe.title,
            image: recipe.image,
            difficulty: recipe.difficulty,
            prep_time: recipe.prep_time,
            servings: recipe.servings,
            categories: recipe.categories,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            calories: recipe.calories,
            protein: recipe.protein,
            carbs: recipe.carbs,
            fat: recipe.fat,
        }
    }
}

#[must_use]
pub fn is_user_recipe_id(id: &str) -> bool {
    id.starts_with(USER_RECIPE_PREFIX)
}

// --- Meal plan types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanEntry {
    pub date: String,
    pub recipe_id: String,
    pub meal_type: String,
}

/// A meal plan entry with its recipe resolved, as returned for a single day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMeal {
    pub meal_type: String,
    pub recipe: Recipe,
}

/// Nutrition totals for a planned day, one serving per planned meal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub meal_count: usize,
}

#[must_use]
pub fn summarize_planned_meals(meals: &[PlannedMeal]) -> NutritionTotals {
    NutritionTotals {
        calories: meals.iter().map(|m| m.recipe.calories).sum(),
        protein: meals.iter().map(|m| m.recipe.protein).sum(),
        carbs: meals.iter().map(|m| m.recipe.carbs).sum(),
        fat: meals.iter().map(|m| m.recipe.fat).sum(),
        meal_count: meals.len(),
    }
}

/// Normalize a meal type: trimmed, lowercased, `snack` folded into `snacks`.
///
/// Meal types are open-ended, so anything non-empty is accepted.
pub fn normalize_meal_type(meal: &str) -> Result<String> {
    let lower = meal.trim().to_lowercase();
    if lower.is_empty() {
        bail!(
            "Meal type must not be empty. Common values: {}",
            MEAL_TYPES.join(", ")
        );
    }
    if lower == "snack" {
        return Ok("snacks".to_string());
    }
    Ok(lower)
}

/// Parse a plan date, accepting only `YYYY-MM-DD`.
pub fn parse_plan_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{date}'. Must be YYYY-MM-DD"))
}

// --- Validation ---

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid recipe: {}", join_field_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a user-created recipe before it is written. Reports every problem
/// at once rather than stopping at the first.
pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    let mut push = |field: &'static str, message: &str| {
        errors.push(FieldError {
            field,
            message: message.to_string(),
        });
    };

    if recipe.title.trim().is_empty() {
        push("title", "must not be empty");
    }
    if !(recipe.calories.is_finite() && recipe.calories > 0.0) {
        push("calories", "must be greater than 0");
    }
    for (field, value) in [
        ("protein", recipe.protein),
        ("carbs", recipe.carbs),
        ("fat", recipe.fat),
    ] {
        if !value.is_finite() || value < 0.0 {
            push(field, "must not be negative");
        }
    }
    if recipe.prep_time == 0 {
        push("prepTime", "must be greater than 0");
    }
    if recipe.servings == 0 {
        push("servings", "must be at least 1");
    }
    if recipe.categories.is_empty() {
        push("categories", "at least one category is required");
    } else if recipe.categories.iter().any(|c| c.trim().is_empty()) {
        push("categories", "categories must not be blank");
    }
    if recipe.ingredients.is_empty() {
        push("ingredients", "at least one ingredient is required");
    } else if recipe.ingredients.iter().any(|i| i.trim().is_empty()) {
        push("ingredients", "ingredients must not be blank");
    }
    if recipe.instructions.is_empty() {
        push("instructions", "at least one step is required");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

#[cfg(test)]
pub(crate) fn sample_new_recipe(title: &str) -> NewRecipe {
    NewRecipe {
        title: title.to_string(),
        image: DEFAULT_RECIPE_IMAGE.to_string(),
        difficulty: Difficulty::Easy,
        prep_time: 10,
        servings: 2,
        categories: vec!["snack".to_string()],
        ingredients: vec!["a".to_string()],
        instructions: vec!["b".to_string()],
        calories: 100.0,
        protein: 5.0,
        carbs: 10.0,
        fat: 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("Medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" HARD ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_recipe_json_uses_camel_case() {
        let recipe = sample_new_recipe("Toast").into_recipe("user-recipe-1".to_string());
        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["prepTime"], 10);
        assert_eq!(json["difficulty"], "easy");
        assert!(json.get("prep_time").is_none());
    }

    #[test]
    fn test_recipe_deserialize_fills_defaults() {
        let recipe: Recipe = serde_json::from_str(r#"{"id":"x","title":"Plain"}"#).unwrap();
        assert_eq!(recipe.image, DEFAULT_RECIPE_IMAGE);
        assert_eq!(recipe.servings, 1);
        assert_eq!(recipe.difficulty, Difficulty::Easy);
        assert!(recipe.ingredients.is_empty());
    }

    #[test]
    fn test_into_recipe_replaces_blank_image() {
        let mut new = sample_new_recipe("Toast");
        new.image = "  ".to_string();
        let recipe = new.into_recipe("user-recipe-1".to_string());
        assert_eq!(recipe.image, DEFAULT_RECIPE_IMAGE);
    }

    #[test]
    fn test_is_user_recipe_id() {
        assert!(is_user_recipe_id("user-recipe-1718000000000"));
        assert!(!is_user_recipe_id("1"));
        assert!(!is_user_recipe_id("recipe-user-1"));
    }

    #[test]
    fn test_matches_term() {
        let recipe = sample_new_recipe("Greek Salad").into_recipe("1".to_string());
        assert!(recipe.matches_term("salad"));
        assert!(recipe.matches_term("snack"));
        assert!(recipe.matches_term("a"));
        assert!(!recipe.matches_term("salmon"));
    }

    #[test]
    fn test_normalize_meal_type() {
        assert_eq!(normalize_meal_type("Lunch").unwrap(), "lunch");
        assert_eq!(normalize_meal_type(" breakfast ").unwrap(), "breakfast");
        assert_eq!(normalize_meal_type("snack").unwrap(), "snacks");
        assert_eq!(normalize_meal_type("brunch").unwrap(), "brunch");
        assert!(normalize_meal_type("  ").is_err());
    }

    #[test]
    fn test_parse_plan_date() {
        assert_eq!(
            parse_plan_date("2024-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert!(parse_plan_date("01/01/2024").is_err());
        assert!(parse_plan_date("2024-13-01").is_err());
    }

    #[test]
    fn test_validate_new_recipe_valid() {
        assert!(validate_new_recipe(&sample_new_recipe("Test")).is_ok());
    }

    #[test]
    fn test_validate_new_recipe_collects_all_fields() {
        let mut recipe = sample_new_recipe(" ");
        recipe.calories = 0.0;
        recipe.ingredients.clear();
        recipe.categories.clear();
        recipe.fat = -1.0;

        let err = validate_new_recipe(&recipe).unwrap_err();
        assert_eq!(err.errors.len(), 5);
        assert!(err.has_field("title"));
        assert!(err.has_field("calories"));
        assert!(err.has_field("ingredients"));
        assert!(err.has_field("categories"));
        assert!(err.has_field("fat"));
        assert!(!err.has_field("protein"));
    }

    #[test]
    fn test_validate_new_recipe_rejects_blank_ingredient() {
        let mut recipe = sample_new_recipe("Test");
        recipe.ingredients.push(String::new());
        let err = validate_new_recipe(&recipe).unwrap_err();
        assert!(err.has_field("ingredients"));
    }

    #[test]
    fn test_validation_error_message_lists_fields() {
        let mut recipe = sample_new_recipe("Test");
        recipe.calories = -5.0;
        recipe.servings = 0;
        let message = validate_new_recipe(&recipe).unwrap_err().to_string();
        assert_eq!(
            message,
            "invalid recipe: calories: must be greater than 0; servings: must be at least 1"
        );
    }

    #[test]
    fn test_summarize_planned_meals() {
        let breakfast = sample_new_recipe("Oats").into_recipe("1".to_string());
        let lunch = sample_new_recipe("Soup").into_recipe("2".to_string());
        let meals = vec![
            PlannedMeal {
                meal_type: "breakfast".to_string(),
                recipe: breakfast,
            },
            PlannedMeal {
                meal_type: "lunch".to_string(),
                recipe: lunch,
            },
        ];
        let totals = summarize_planned_meals(&meals);
        assert_eq!(totals.meal_count, 2);
        assert!((totals.calories - 200.0).abs() < f64::EPSILON);
        assert!((totals.protein - 10.0).abs() < f64::EPSILON);
        assert!((totals.carbs - 20.0).abs() < f64::EPSILON);
        assert!((totals.fat - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize_empty_day() {
        let totals = summarize_planned_meals(&[]);
        assert_eq!(totals, NutritionTotals::default());
    }
}
