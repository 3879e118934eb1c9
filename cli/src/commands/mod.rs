mod helpers;
mod plan;
mod recipe;
mod saved;
mod transfer;

pub(crate) use plan::{cmd_plan_add, cmd_plan_list, cmd_plan_remove, cmd_plan_show};
pub(crate) use recipe::{
    RecipeInput, cmd_recipe_category, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list,
    cmd_recipe_search, cmd_recipe_show, cmd_recipe_update,
};
pub(crate) use saved::{cmd_saved_list, cmd_saved_status, cmd_saved_toggle};
pub(crate) use transfer::{cmd_export, cmd_import, cmd_reset};
