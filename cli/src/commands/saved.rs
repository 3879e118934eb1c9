use anyhow::Result;
use std::process;

use nutricoach_core::service::RecipeService;

use super::helpers::{json_error, print_recipe_table};

pub(crate) fn cmd_saved_list(service: &RecipeService, json: bool) -> Result<()> {
    let recipes = service.get_all_saved_recipes()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        println!("No saved recipes. Bookmark one with: nutricoach saved toggle <id>");
        return Ok(());
    }
    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_saved_toggle(service: &RecipeService, id: &str, json: bool) -> Result<()> {
    let Some(recipe) = service.get_recipe_by_id(id)? else {
        let message = format!("Recipe {id} not found");
        if json {
            println!("{}", json_error(&message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    };
    let saved = service.toggle_save_recipe(&recipe.id)?;
    if json {
        println!("{}", serde_json::json!({ "id": recipe.id, "saved": saved }));
    } else if saved {
        println!("Saved {}", recipe.title);
    } else {
        println!("Removed {} from saved recipes", recipe.title);
    }
    Ok(())
}

pub(crate) fn cmd_saved_status(service: &RecipeService, id: &str, json: bool) -> Result<()> {
    let saved = service.is_recipe_saved(id)?;
    if json {
        println!("{}", serde_json::json!({ "id": id, "saved": saved }));
    } else if saved {
        println!("Recipe {id} is saved");
    } else {
        println!("Recipe {id} is not saved");
    }
    Ok(())
}
