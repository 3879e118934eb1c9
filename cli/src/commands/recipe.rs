use anyhow::{Result, bail};
use std::process;

use nutricoach_core::models::{Difficulty, NewRecipe, Recipe, validate_new_recipe};
use nutricoach_core::service::RecipeService;

use super::helpers::{json_error, json_field_errors, print_recipe_table};

/// Recipe fields shared by `recipe create` and `recipe update`.
#[derive(clap::Args)]
pub(crate) struct RecipeInput {
    /// Recipe title
    #[arg(long)]
    pub title: String,
    /// Calories per serving
    #[arg(long)]
    pub calories: f64,
    /// Protein per serving (g)
    #[arg(long, default_value = "0")]
    pub protein: f64,
    /// Carbs per serving (g)
    #[arg(long, default_value = "0")]
    pub carbs: f64,
    /// Fat per serving (g)
    #[arg(long, default_value = "0")]
    pub fat: f64,
    /// Ingredient line (repeat for each ingredient)
    #[arg(long = "ingredient", value_name = "TEXT")]
    pub ingredients: Vec<String>,
    /// Instruction step (repeat for each step)
    #[arg(long = "step", value_name = "TEXT")]
    pub steps: Vec<String>,
    /// Category tag (repeat for each category)
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,
    /// Difficulty: easy, medium, hard
    #[arg(long, default_value = "easy")]
    pub difficulty: String,
    /// Preparation time in minutes
    #[arg(long, default_value = "15")]
    pub prep_time: u32,
    /// Number of servings
    #[arg(long, default_value = "1")]
    pub servings: u32,
    /// Image URL (defaults to a placeholder)
    #[arg(long)]
    pub image: Option<String>,
}

impl RecipeInput {
    fn into_new_recipe(self) -> Result<NewRecipe> {
        let difficulty: Difficulty = self.difficulty.parse()?;
        Ok(NewRecipe {
            title: self.title,
            image: self.image.unwrap_or_default(),
            difficulty,
            prep_time: self.prep_time,
            servings: self.servings,
            categories: self.categories,
            ingredients: self.ingredients,
            instructions: self.steps,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        })
    }
}

/// Parse and validate input, printing field errors and exiting 1 when invalid.
fn checked_input(input: RecipeInput, json: bool) -> Result<NewRecipe> {
    let data = input.into_new_recipe()?;
    if let Err(invalid) = validate_new_recipe(&data) {
        if json {
            println!("{}", json_field_errors(&invalid.errors));
        } else {
            eprintln!("Recipe is invalid:");
            for error in &invalid.errors {
                eprintln!("  {error}");
            }
        }
        process::exit(1);
    }
    Ok(data)
}

fn not_found(id: &str, json: bool) -> ! {
    let message = format!("Recipe {id} not found");
    if json {
        println!("{}", json_error(&message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn cmd_recipe_list(service: &RecipeService, json: bool) -> Result<()> {
    let recipes = service.list_all_recipes()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else {
        print_recipe_table(&recipes);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(service: &RecipeService, id: &str, json: bool) -> Result<()> {
    let Some(recipe) = service.get_recipe_by_id(id)? else {
        not_found(id, json);
    };
    let saved = service.is_recipe_saved(&recipe.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    let title = &recipe.title;
    let marker = if saved { " [saved]" } else { "" };
    println!("=== {title}{marker} ===");
    println!(
        "{} | {} min | serves {}",
        recipe.difficulty, recipe.prep_time, recipe.servings
    );
    if !recipe.categories.is_empty() {
        println!("Categories: {}", recipe.categories.join(", "));
    }
    println!(
        "Per serving: {:.0} kcal | P: {:.1}g | C: {:.1}g | F: {:.1}g",
        recipe.calories, recipe.protein, recipe.carbs, recipe.fat
    );
    println!();
    println!("Ingredients:");
    for item in &recipe.ingredients {
        println!("  - {item}");
    }
    println!();
    println!("Instructions:");
    for (i, step) in recipe.instructions.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_search(service: &RecipeService, term: &str, json: bool) -> Result<()> {
    let results = service.search_recipes(term);
    print_results(&results, &format!("No recipes match '{term}'"), json)
}

pub(crate) fn cmd_recipe_category(
    service: &RecipeService,
    category: &str,
    json: bool,
) -> Result<()> {
    let results = service.get_recipes_by_category(category);
    print_results(&results, &format!("No recipes in category '{category}'"), json)
}

fn print_results(results: &[Recipe], empty_message: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    if results.is_empty() {
        eprintln!("{empty_message}");
        process::exit(2);
    }
    print_recipe_table(results);
    Ok(())
}

pub(crate) fn cmd_recipe_create(
    service: &RecipeService,
    input: RecipeInput,
    json: bool,
) -> Result<()> {
    let data = checked_input(input, json)?;
    let recipe = service.create_recipe(data)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let id = &recipe.id;
        let title = &recipe.title;
        println!("Created recipe: {title} (id: {id})");
        println!("Plan it with: nutricoach plan add {id} --meal dinner");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_update(
    service: &RecipeService,
    id: &str,
    input: RecipeInput,
    json: bool,
) -> Result<()> {
    if service.get_builtin_recipe(id).is_some() {
        bail!("Recipe {id} is built in and cannot be changed");
    }
    let data = checked_input(input, json)?;
    let Some(recipe) = service.update_recipe(id, data)? else {
        not_found(id, json);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        println!("Updated recipe {id}: {}", recipe.title);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_delete(service: &RecipeService, id: &str, json: bool) -> Result<()> {
    if service.get_builtin_recipe(id).is_some() {
        bail!("Recipe {id} is built in and cannot be deleted");
    }
    if !service.delete_recipe(id)? {
        not_found(id, json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted recipe {id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RecipeInput {
        RecipeInput {
            title: "Toast".to_string(),
            calories: 150.0,
            protein: 5.0,
            carbs: 25.0,
            fat: 3.0,
            ingredients: vec!["bread".to_string()],
            steps: vec!["toast it".to_string()],
            categories: vec!["breakfast".to_string()],
            difficulty: "Medium".to_string(),
            prep_time: 5,
            servings: 1,
            image: None,
        }
    }

    #[test]
    fn test_into_new_recipe_maps_fields() {
        let data = input().into_new_recipe().unwrap();
        assert_eq!(data.title, "Toast");
        assert_eq!(data.difficulty, Difficulty::Medium);
        assert_eq!(data.instructions, vec!["toast it"]);
        assert!(data.image.is_empty());
        assert!(validate_new_recipe(&data).is_ok());
    }

    #[test]
    fn test_into_new_recipe_rejects_unknown_difficulty() {
        let mut bad = input();
        bad.difficulty = "extreme".to_string();
        assert!(bad.into_new_recipe().is_err());
    }

    #[test]
    fn test_created_recipe_gets_default_image() {
        let service = RecipeService::new_in_memory();
        let recipe = service
            .create_recipe(input().into_new_recipe().unwrap())
            .unwrap();
        assert!(!recipe.image.is_empty());
        assert!(recipe.is_user_created());
    }

    #[test]
    fn test_delete_builtin_is_refused() {
        let service = RecipeService::new_in_memory();
        let err = cmd_recipe_delete(&service, "1", false).unwrap_err();
        assert!(err.to_string().contains("built in"));
        assert!(service.get_recipe_by_id("1").unwrap().is_some());
    }

    #[test]
    fn test_update_builtin_is_refused() {
        let service = RecipeService::new_in_memory();
        assert!(cmd_recipe_update(&service, "2", input(), false).is_err());
        assert_eq!(
            service.get_recipe_by_id("2").unwrap().unwrap().title,
            "Quinoa Salad with Chickpeas"
        );
    }
}
