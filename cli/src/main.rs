mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    RecipeInput, cmd_export, cmd_import, cmd_plan_add, cmd_plan_list, cmd_plan_remove,
    cmd_plan_show, cmd_recipe_category, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list,
    cmd_recipe_search, cmd_recipe_show, cmd_recipe_update, cmd_reset, cmd_saved_list,
    cmd_saved_status, cmd_saved_toggle,
};
use crate::config::Config;
use nutricoach_core::service::RecipeService;

#[derive(Parser)]
#[command(
    name = "nutricoach",
    version,
    about = "Recipes, bookmarks, and meal plans for NutriCoach"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Bookmark recipes
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
    /// Plan meals by date
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Export user-created recipes as JSON
    Export {
        /// Write to this file (or into this directory with a dated name) instead of stdout
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import recipes from an export file (existing ids are skipped)
    Import {
        /// Path to the export file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every user-created recipe
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List built-in and user-created recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with ingredients and instructions
    Show {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search built-in recipes by title, ingredient, or category
    Search {
        /// Search term
        term: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List built-in recipes in a category
    Category {
        /// Category name (exact match)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a recipe
    Create {
        #[command(flatten)]
        input: RecipeInput,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a user-created recipe
    Update {
        /// Recipe ID
        id: String,
        #[command(flatten)]
        input: RecipeInput,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a user-created recipe (also removes its bookmark and plan entries)
    Delete {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save or unsave a recipe
    Toggle {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a recipe is saved
    Status {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Show the plan and nutrition totals for a day (defaults to today)
    Show {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every planned meal
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plan a recipe (replaces whatever is already planned for that meal)
    Add {
        /// Recipe ID
        recipe_id: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Meal type: breakfast, lunch, dinner, snacks
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a planned meal
    Remove {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Meal type: breakfast, lunch, dinner, snacks
        #[arg(short, long)]
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_tracing(matches!(cli.command, Commands::Serve { .. }));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service = RecipeService::open(&config.store_path)?;

    match cli.command {
        Commands::Recipe { command } => match command {
            RecipeCommands::List { json } => cmd_recipe_list(&service, json),
            RecipeCommands::Show { id, json } => cmd_recipe_show(&service, &id, json),
            RecipeCommands::Search { term, json } => cmd_recipe_search(&service, &term, json),
            RecipeCommands::Category { name, json } => cmd_recipe_category(&service, &name, json),
            RecipeCommands::Create { input, json } => cmd_recipe_create(&service, input, json),
            RecipeCommands::Update { id, input, json } => {
                cmd_recipe_update(&service, &id, input, json)
            }
            RecipeCommands::Delete { id, json } => cmd_recipe_delete(&service, &id, json),
        },
        Commands::Saved { command } => match command {
            SavedCommands::List { json } => cmd_saved_list(&service, json),
            SavedCommands::Toggle { id, json } => cmd_saved_toggle(&service, &id, json),
            SavedCommands::Status { id, json } => cmd_saved_status(&service, &id, json),
        },
        Commands::Plan { command } => match command {
            PlanCommands::Show { date, json } => cmd_plan_show(&service, date, json),
            PlanCommands::List { json } => cmd_plan_list(&service, json),
            PlanCommands::Add {
                recipe_id,
                date,
                meal,
                json,
            } => cmd_plan_add(&service, &recipe_id, date, &meal, json),
            PlanCommands::Remove { date, meal, json } => {
                cmd_plan_remove(&service, date, &meal, json)
            }
        },
        Commands::Export { out, json } => cmd_export(&service, out, json),
        Commands::Import { file, json } => cmd_import(&service, &file, json),
        Commands::Reset { yes, json } => cmd_reset(&service, yes, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?.0)
            };
            server::start_server(service, port, &bind, api_key).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_recipe_create_repeated_flags() {
        let cli = Cli::try_parse_from([
            "nutricoach",
            "recipe",
            "create",
            "--title",
            "Toast",
            "--calories",
            "150",
            "--ingredient",
            "bread",
            "--ingredient",
            "butter",
            "--step",
            "toast",
            "--category",
            "breakfast",
        ])
        .unwrap();
        let Commands::Recipe {
            command: RecipeCommands::Create { input, json },
        } = cli.command
        else {
            panic!("expected recipe create");
        };
        assert!(!json);
        assert_eq!(input.ingredients, vec!["bread", "butter"]);
        assert_eq!(input.steps, vec!["toast"]);
        assert_eq!(input.servings, 1);
    }

    #[test]
    fn test_parse_plan_add_defaults() {
        let cli = Cli::try_parse_from(["nutricoach", "plan", "add", "3"]).unwrap();
        let Commands::Plan {
            command:
                PlanCommands::Add {
                    recipe_id,
                    date,
                    meal,
                    ..
                },
        } = cli.command
        else {
            panic!("expected plan add");
        };
        assert_eq!(recipe_id, "3");
        assert!(date.is_none());
        assert_eq!(meal, "dinner");
    }
}
