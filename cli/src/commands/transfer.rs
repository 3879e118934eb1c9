use anyhow::{Context, Result, bail};
use chrono::Local;
use std::path::{Path, PathBuf};

use nutricoach_core::service::RecipeService;
use nutricoach_core::transfer::export_file_name;

/// A directory target gets the dated default file name inside it.
fn resolve_export_path(out: &Path) -> PathBuf {
    if out.is_dir() {
        out.join(export_file_name(Local::now().date_naive()))
    } else {
        out.to_path_buf()
    }
}

pub(crate) fn cmd_export(service: &RecipeService, out: Option<PathBuf>, json: bool) -> Result<()> {
    let payload = service.export_user_recipes()?;
    let Some(out) = out else {
        println!("{payload}");
        return Ok(());
    };

    let path = resolve_export_path(&out);
    std::fs::write(&path, &payload)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;
    let count = service.list_user_recipes()?.len();
    if json {
        println!(
            "{}",
            serde_json::json!({ "path": path.display().to_string(), "recipes": count })
        );
    } else {
        println!("Exported {count} recipes to {}", path.display());
    }
    Ok(())
}

pub(crate) fn cmd_import(service: &RecipeService, file: &Path, json: bool) -> Result<()> {
    let payload = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {}", file.display()))?;
    let summary = service
        .import_recipes(&payload)
        .with_context(|| format!("Import of {} failed, nothing was changed", file.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Imported {} recipes ({} skipped as already present)",
            summary.imported, summary.skipped
        );
    }
    Ok(())
}

pub(crate) fn cmd_reset(service: &RecipeService, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!("Reset deletes every user-created recipe. Re-run with --yes to confirm");
    }
    let removed = service.reset_user_recipes()?;
    if json {
        println!("{}", serde_json::json!({ "reset": removed }));
    } else if removed {
        println!("Deleted all user-created recipes");
    } else {
        println!("No user-created recipes to delete");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutricoach_core::models::NewRecipe;

    fn sample() -> NewRecipe {
        serde_json::from_str(
            r#"{"title":"Toast","calories":150,"prepTime":5,"categories":["breakfast"],
                "ingredients":["bread"],"instructions":["toast it"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_export_to_directory_uses_dated_name() {
        let tmp = tempfile::tempdir().unwrap();
        let service = RecipeService::new_in_memory();
        service.create_recipe(sample()).unwrap();

        cmd_export(&service, Some(tmp.path().to_path_buf()), false).unwrap();

        let expected = tmp
            .path()
            .join(export_file_name(Local::now().date_naive()));
        let written = std::fs::read_to_string(expected).unwrap();
        assert!(written.contains("\"title\": \"Toast\""));
    }

    #[test]
    fn test_export_then_import_into_fresh_store() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("backup.json");
        let source = RecipeService::new_in_memory();
        let created = source.create_recipe(sample()).unwrap();
        cmd_export(&source, Some(file.clone()), false).unwrap();

        let target = RecipeService::new_in_memory();
        cmd_import(&target, &file, false).unwrap();
        assert_eq!(target.list_user_recipes().unwrap(), vec![created]);
    }

    #[test]
    fn test_import_missing_file() {
        let service = RecipeService::new_in_memory();
        let err = cmd_import(&service, Path::new("/nonexistent/backup.json"), false).unwrap_err();
        assert!(err.to_string().contains("Failed to read import file"));
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let service = RecipeService::new_in_memory();
        service.create_recipe(sample()).unwrap();
        assert!(cmd_reset(&service, false, false).is_err());
        assert_eq!(service.list_user_recipes().unwrap().len(), 1);

        cmd_reset(&service, true, false).unwrap();
        assert!(service.list_user_recipes().unwrap().is_empty());
    }
}
