use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::catalog::{builtin_recipes, find_builtin};
use crate::models::{
    MealPlanEntry, NewRecipe, NutritionTotals, PlannedMeal, Recipe, USER_RECIPE_PREFIX,
    is_user_recipe_id, normalize_meal_type, parse_plan_date, summarize_planned_meals,
};
use crate::store::{
    KeyValueStore, MEAL_PLAN_KEY, MemoryStore, SAVED_RECIPES_KEY, SqliteStore, USER_RECIPES_KEY,
};
use crate::transfer::{self, ImportSummary};

/// Sole reader and writer of recipe, bookmark, and meal-plan state.
///
/// Each mutating call is a read-modify-write of one or more whole keys.
/// Callers sharing a service across threads must serialize access.
pub struct RecipeService {
    store: Box<dyn KeyValueStore>,
    last_issued_millis: Cell<i64>,
}

impl RecipeService {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            last_issued_millis: Cell::new(0),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let store = SqliteStore::open(path)?;
        Ok(Self::new(Box::new(store)))
    }

    #[must_use]
    pub fn new_in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Creation timestamp for a new id, strictly greater than any this
    /// service has issued and any still carried by a stored recipe, so the
    /// same service never hands out the id of a deleted recipe.
    fn issue_millis(&self, recipes: &[Recipe]) -> i64 {
        let stored = recipes
            .iter()
            .filter_map(|r| id_millis(&r.id))
            .max()
            .unwrap_or(0);
        let floor = self.last_issued_millis.get().max(stored);
        let millis = Utc::now().timestamp_millis().max(floor + 1);
        self.last_issued_millis.set(millis);
        millis
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(key, error = %err, "stored value is not a valid list, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn save_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.store.set(key, &raw)?;
        debug!(key, count = items.len(), "persisted list");
        Ok(())
    }

    // --- Catalog queries ---

    pub fn list_user_recipes(&self) -> Result<Vec<Recipe>> {
        self.load_list(USER_RECIPES_KEY)
    }

    /// Built-ins first, then user recipes in creation order.
    pub fn list_all_recipes(&self) -> Result<Vec<Recipe>> {
        let mut all = builtin_recipes().to_vec();
        all.extend(self.list_user_recipes()?);
        Ok(all)
    }

    #[must_use]
    pub fn get_builtin_recipe(&self, id: &str) -> Option<Recipe> {
        find_builtin(id).cloned()
    }

    /// Looks in the catalog, then among user-created recipes.
    pub fn get_recipe_by_id(&self, id: &str) -> Result<Option<Recipe>> {
        if let Some(recipe) = self.get_builtin_recipe(id) {
            return Ok(Some(recipe));
        }
        Ok(self
            .list_user_recipes()?
            .into_iter()
            .find(|r| r.id == id))
    }

    /// Case-insensitive match on title, ingredients, or categories. Built-ins only.
    #[must_use]
    pub fn search_recipes(&self, term: &str) -> Vec<Recipe> {
        let needle = term.trim().to_lowercase();
        builtin_recipes()
            .iter()
            .filter(|r| r.matches_term(&needle))
            .cloned()
            .collect()
    }

    /// Exact category match. Built-ins only.
    #[must_use]
    pub fn get_recipes_by_category(&self, category: &str) -> Vec<Recipe> {
        builtin_recipes()
            .iter()
            .filter(|r| r.has_category(category))
            .cloned()
            .collect()
    }

    // --- User recipes ---

    /// Appends a user recipe under a fresh id. Field contents are not checked
    /// here; run `validate_new_recipe` first.
    pub fn create_recipe(&self, data: NewRecipe) -> Result<Recipe> {
        let mut recipes = self.list_user_recipes()?;
        let taken: HashSet<String> = recipes.iter().map(|r| r.id.clone()).collect();
        let millis = self.issue_millis(&recipes);
        let recipe = data.into_recipe(next_recipe_id(millis, &taken, false));
        recipes.push(recipe.clone());
        self.save_list(USER_RECIPES_KEY, &recipes)?;
        info!(id = %recipe.id, title = %recipe.title, "created recipe");
        Ok(recipe)
    }

    /// Bulk variant of [`Self::create_recipe`]. Every id carries a random
    /// suffix so a batch created within one millisecond stays distinct.
    pub fn create_recipes(&self, batch: Vec<NewRecipe>) -> Result<Vec<Recipe>> {
        let mut recipes = self.list_user_recipes()?;
        let mut taken: HashSet<String> = recipes.iter().map(|r| r.id.clone()).collect();
        let millis = self.issue_millis(&recipes);
        let mut created = Vec::with_capacity(batch.len());
        for data in batch {
            let id = next_recipe_id(millis, &taken, true);
            taken.insert(id.clone());
            created.push(data.into_recipe(id));
        }
        recipes.extend(created.iter().cloned());
        self.save_list(USER_RECIPES_KEY, &recipes)?;
        info!(count = created.len(), "created recipes");
        Ok(created)
    }

    /// Replaces a user recipe in place. `None` for built-ins and unknown ids.
    pub fn update_recipe(&self, id: &str, data: NewRecipe) -> Result<Option<Recipe>> {
        if !is_user_recipe_id(id) {
            return Ok(None);
        }
        let mut recipes = self.list_user_recipes()?;
        let Some(slot) = recipes.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        *slot = data.into_recipe(id.to_string());
        let updated = slot.clone();
        self.save_list(USER_RECIPES_KEY, &recipes)?;
        info!(id, "updated recipe");
        Ok(Some(updated))
    }

    /// Deletes a user recipe along with its bookmark and every plan entry
    /// pointing at it. `false` for built-ins and unknown ids.
    ///
    /// References go first. If a later write fails the recipe survives
    /// without its plan entries or bookmark, which readers tolerate.
    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        if !is_user_recipe_id(id) {
            return Ok(false);
        }
        let mut recipes = self.list_user_recipes()?;
        let before = recipes.len();
        recipes.retain(|r| r.id != id);
        if recipes.len() == before {
            return Ok(false);
        }

        let mut plan: Vec<MealPlanEntry> = self.load_list(MEAL_PLAN_KEY)?;
        let plan_before = plan.len();
        plan.retain(|e| e.recipe_id != id);
        if plan.len() != plan_before {
            self.save_list(MEAL_PLAN_KEY, &plan)?;
        }

        let mut saved: Vec<String> = self.load_list(SAVED_RECIPES_KEY)?;
        let saved_before = saved.len();
        saved.retain(|s| s != id);
        if saved.len() != saved_before {
            self.save_list(SAVED_RECIPES_KEY, &saved)?;
        }

        self.save_list(USER_RECIPES_KEY, &recipes)?;

        info!(
            id,
            plan_entries_removed = plan_before - plan.len(),
            bookmark_removed = saved_before != saved.len(),
            "deleted recipe"
        );
        Ok(true)
    }

    // --- Saved recipes ---

    pub fn get_saved_recipe_ids(&self) -> Result<Vec<String>> {
        self.load_list(SAVED_RECIPES_KEY)
    }

    pub fn is_recipe_saved(&self, id: &str) -> Result<bool> {
        Ok(self.get_saved_recipe_ids()?.iter().any(|s| s == id))
    }

    /// Flips bookmark membership and returns the new state.
    pub fn toggle_save_recipe(&self, id: &str) -> Result<bool> {
        let mut saved = self.get_saved_recipe_ids()?;
        let now_saved = if let Some(pos) = saved.iter().position(|s| s == id) {
            saved.remove(pos);
            false
        } else {
            saved.push(id.to_string());
            true
        };
        self.save_list(SAVED_RECIPES_KEY, &saved)?;
        Ok(now_saved)
    }

    /// Bookmarked recipes in bookmark order. Ids that no longer resolve are dropped.
    pub fn get_all_saved_recipes(&self) -> Result<Vec<Recipe>> {
        let saved = self.get_saved_recipe_ids()?;
        let all = self.list_all_recipes()?;
        Ok(saved
            .iter()
            .filter_map(|id| all.iter().find(|r| &r.id == id).cloned())
            .collect())
    }

    // --- Meal plan ---

    pub fn get_meal_plan(&self) -> Result<Vec<MealPlanEntry>> {
        self.load_list(MEAL_PLAN_KEY)
    }

    /// Entries for `date` with recipes resolved. Entries pointing at missing
    /// recipes are left out.
    pub fn get_meal_plan_for_date(&self, date: &str) -> Result<Vec<PlannedMeal>> {
        let date = parse_plan_date(date)?.format("%Y-%m-%d").to_string();
        let plan = self.get_meal_plan()?;
        let all = self.list_all_recipes()?;
        Ok(plan
            .into_iter()
            .filter(|e| e.date == date)
            .filter_map(|e| {
                all.iter()
                    .find(|r| r.id == e.recipe_id)
                    .map(|recipe| PlannedMeal {
                        meal_type: e.meal_type,
                        recipe: recipe.clone(),
                    })
            })
            .collect())
    }

    pub fn get_day_totals(&self, date: &str) -> Result<NutritionTotals> {
        let meals = self.get_meal_plan_for_date(date)?;
        Ok(summarize_planned_meals(&meals))
    }

    /// Upsert: at most one entry per (date, meal type). An existing slot has
    /// its recipe replaced in place.
    pub fn add_to_meal_plan(
        &self,
        recipe_id: &str,
        date: &str,
        meal_type: &str,
    ) -> Result<MealPlanEntry> {
        let date = parse_plan_date(date)?.format("%Y-%m-%d").to_string();
        let meal_type = normalize_meal_type(meal_type)?;
        let mut plan = self.get_meal_plan()?;

        let entry = if let Some(existing) = plan
            .iter_mut()
            .find(|e| e.date == date && e.meal_type == meal_type)
        {
            existing.recipe_id = recipe_id.to_string();
            existing.clone()
        } else {
            let entry = MealPlanEntry {
                date,
                recipe_id: recipe_id.to_string(),
                meal_type,
            };
            plan.push(entry.clone());
            entry
        };

        self.save_list(MEAL_PLAN_KEY, &plan)?;
        Ok(entry)
    }

    /// Removes the entry for (date, meal type). Returns whether one existed.
    pub fn remove_from_meal_plan(&self, date: &str, meal_type: &str) -> Result<bool> {
        let date = parse_plan_date(date)?.format("%Y-%m-%d").to_string();
        let meal_type = normalize_meal_type(meal_type)?;
        let mut plan = self.get_meal_plan()?;
        let before = plan.len();
        plan.retain(|e| !(e.date == date && e.meal_type == meal_type));
        if plan.len() == before {
            return Ok(false);
        }
        self.save_list(MEAL_PLAN_KEY, &plan)?;
        Ok(true)
    }

    // --- Export / Import / Reset ---

    pub fn export_user_recipes(&self) -> Result<String> {
        transfer::render_export(&self.list_user_recipes()?)
    }

    /// Merges an exported recipe array. Ids already present (including
    /// built-ins and repeats within the payload) are skipped, never overwritten.
    pub fn import_recipes(&self, payload: &str) -> Result<ImportSummary> {
        let incoming = transfer::parse_import_payload(payload)?;
        let mut recipes = self.list_user_recipes()?;
        let mut known: HashSet<String> = builtin_recipes()
            .iter()
            .chain(recipes.iter())
            .map(|r| r.id.clone())
            .collect();

        let mut summary = ImportSummary::default();
        for recipe in incoming {
            if known.insert(recipe.id.clone()) {
                recipes.push(recipe);
                summary.imported += 1;
            } else {
                summary.skipped += 1;
            }
        }

        if summary.imported > 0 {
            self.save_list(USER_RECIPES_KEY, &recipes)?;
        }
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "imported recipes"
        );
        Ok(summary)
    }

    /// Drops every user recipe. Bookmarks and plan entries are left as-is and
    /// stop resolving.
    pub fn reset_user_recipes(&self) -> Result<bool> {
        let removed = self.store.remove(USER_RECIPES_KEY)?;
        info!(removed, "reset user recipes");
        Ok(removed)
    }
}

/// `user-recipe-<millis>`, with a random hex suffix when `bulk` is set or the
/// plain id is already taken.
fn next_recipe_id(millis: i64, taken: &HashSet<String>, bulk: bool) -> String {
    let base = format!("{USER_RECIPE_PREFIX}{millis}");
    if !bulk && !taken.contains(&base) {
        return base;
    }
    let mut rng = rand::rng();
    loop {
        let candidate = format!("{base}-{:08x}", rng.random::<u32>());
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}

/// Timestamp part of a generated user id, if it has one.
fn id_millis(id: &str) -> Option<i64> {
    let rest = id.strip_prefix(USER_RECIPE_PREFIX)?;
    rest.split('-').next()?.parse().ok()
}
