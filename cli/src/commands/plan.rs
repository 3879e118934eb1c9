use anyhow::Result;
use std::collections::BTreeMap;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutricoach_core::models::{
    MEAL_TYPES, MealPlanEntry, PlannedMeal, normalize_meal_type, summarize_planned_meals,
};
use nutricoach_core::service::RecipeService;

use super::helpers::{format_date, json_error, parse_date, truncate};

/// Known meal types first in day order, anything else after, alphabetically.
fn meal_order(meal_type: &str) -> (usize, String) {
    let rank = MEAL_TYPES
        .iter()
        .position(|m| *m == meal_type)
        .unwrap_or(MEAL_TYPES.len());
    (rank, meal_type.to_string())
}

pub(crate) fn sort_planned_meals(meals: &mut [PlannedMeal]) {
    meals.sort_by_key(|m| meal_order(&m.meal_type));
}

pub(crate) fn cmd_plan_show(
    service: &RecipeService,
    date_str: Option<String>,
    json: bool,
) -> Result<()> {
    let date = format_date(parse_date(date_str)?);
    let mut meals = service.get_meal_plan_for_date(&date)?;
    sort_planned_meals(&mut meals);
    let totals = summarize_planned_meals(&meals);

    if json {
        let output = serde_json::json!({
            "date": date,
            "meals": meals,
            "totals": totals,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("=== {date} ===");
    if meals.is_empty() {
        println!("\nNothing planned.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Kcal")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
    }

    let rows: Vec<PlanRow> = meals
        .iter()
        .map(|m| PlanRow {
            meal: m.meal_type.clone(),
            recipe: truncate(&m.recipe.title, 35),
            id: m.recipe.id.clone(),
            calories: format!("{:.0}", m.recipe.calories),
            protein: format!("{:.0}g", m.recipe.protein),
            carbs: format!("{:.0}g", m.recipe.carbs),
            fat: format!("{:.0}g", m.recipe.fat),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!(
        "Total: {:.0} kcal | P: {:.0}g | C: {:.0}g | F: {:.0}g ({} meals)",
        totals.calories, totals.protein, totals.carbs, totals.fat, totals.meal_count
    );
    Ok(())
}

pub(crate) fn cmd_plan_list(service: &RecipeService, json: bool) -> Result<()> {
    let plan = service.get_meal_plan()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    if plan.is_empty() {
        println!("Meal plan is empty.");
        return Ok(());
    }

    let mut by_date: BTreeMap<&str, Vec<&MealPlanEntry>> = BTreeMap::new();
    for entry in &plan {
        by_date.entry(entry.date.as_str()).or_default().push(entry);
    }
    for (date, mut entries) in by_date {
        entries.sort_by_key(|e| meal_order(&e.meal_type));
        println!("{date}");
        for entry in entries {
            let title = service
                .get_recipe_by_id(&entry.recipe_id)?
                .map_or_else(|| "(missing recipe)".to_string(), |r| r.title);
            println!("  {:<10} {title} [{}]", entry.meal_type, entry.recipe_id);
        }
    }
    Ok(())
}

pub(crate) fn cmd_plan_add(
    service: &RecipeService,
    recipe_id: &str,
    date_str: Option<String>,
    meal: &str,
    json: bool,
) -> Result<()> {
    let Some(recipe) = service.get_recipe_by_id(recipe_id)? else {
        let message = format!("Recipe {recipe_id} not found");
        if json {
            println!("{}", json_error(&message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    };
    let date = format_date(parse_date(date_str)?);
    let entry = service.add_to_meal_plan(&recipe.id, &date, meal)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "Planned {} for {} on {}",
            recipe.title, entry.meal_type, entry.date
        );
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove(
    service: &RecipeService,
    date_str: Option<String>,
    meal: &str,
    json: bool,
) -> Result<()> {
    let date = format_date(parse_date(date_str)?);
    let meal = normalize_meal_type(meal)?;
    if !service.remove_from_meal_plan(&date, &meal)? {
        let message = format!("Nothing planned for {meal} on {date}");
        if json {
            println!("{}", json_error(&message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    }
    if json {
        println!("{}", serde_json::json!({ "removed": { "date": date, "mealType": meal } }));
    } else {
        println!("Removed {meal} on {date}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_planned_meals_day_order() {
        let service = RecipeService::new_in_memory();
        for (meal, id) in [("snacks", "6"), ("brunch", "4"), ("breakfast", "1"), ("dinner", "3")] {
            service.add_to_meal_plan(id, "2024-05-01", meal).unwrap();
        }
        let mut meals = service.get_meal_plan_for_date("2024-05-01").unwrap();
        sort_planned_meals(&mut meals);
        let order: Vec<&str> = meals.iter().map(|m| m.meal_type.as_str()).collect();
        assert_eq!(order, vec!["breakfast", "dinner", "snacks", "brunch"]);
    }

    #[test]
    fn test_plan_add_normalizes_meal_and_date_keyword() {
        let service = RecipeService::new_in_memory();
        cmd_plan_add(&service, "1", Some("2024-05-01".to_string()), "Snack", false).unwrap();
        let plan = service.get_meal_plan().unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].meal_type, "snacks");
        assert_eq!(plan[0].date, "2024-05-01");

        cmd_plan_add(&service, "2", Some("today".to_string()), "lunch", false).unwrap();
        let today = format_date(parse_date(None).unwrap());
        assert!(
            service
                .get_meal_plan()
                .unwrap()
                .iter()
                .any(|e| e.date == today && e.recipe_id == "2")
        );
    }

    #[test]
    fn test_plan_remove_accepts_unnormalized_meal() {
        let service = RecipeService::new_in_memory();
        service.add_to_meal_plan("6", "2024-05-01", "snacks").unwrap();
        service.add_to_meal_plan("1", "2024-05-01", "breakfast").unwrap();

        cmd_plan_remove(&service, Some("2024-05-01".to_string()), " Snack ", false).unwrap();

        let plan = service.get_meal_plan().unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].meal_type, "breakfast");
    }

    #[test]
    fn test_totals_from_loaded_meals_match_day_totals() {
        let service = RecipeService::new_in_memory();
        service.add_to_meal_plan("1", "2024-05-01", "breakfast").unwrap();
        service.add_to_meal_plan("2", "2024-05-01", "lunch").unwrap();
        service.add_to_meal_plan("3", "2024-05-02", "dinner").unwrap();

        let meals = service.get_meal_plan_for_date("2024-05-01").unwrap();
        let totals = summarize_planned_meals(&meals);
        assert_eq!(totals, service.get_day_totals("2024-05-01").unwrap());
        assert_eq!(totals.meal_count, 2);
        assert!((totals.calories - 770.0).abs() < f64::EPSILON);
    }
}
