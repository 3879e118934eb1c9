//! Export/import format for user-created recipes.
//!
//! The export is the raw `nutricoach_user_recipes` array, pretty-printed.
//! Imports are all-or-nothing: one bad element rejects the whole payload.

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Recipe;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import must be a JSON array of recipes: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("recipe at index {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("nutricoach_recipes_{}.json", date.format("%Y-%m-%d"))
}

pub fn render_export(recipes: &[Recipe]) -> Result<String> {
    Ok(serde_json::to_string_pretty(recipes)?)
}

/// Parse and check an import payload. Each recipe needs a non-empty `id`,
/// `title`, `ingredients`, and `instructions`.
pub fn parse_import_payload(payload: &str) -> Result<Vec<Recipe>, ImportError> {
    let recipes: Vec<Recipe> = serde_json::from_str(payload)?;
    for (index, recipe) in recipes.iter().enumerate() {
        let missing = if recipe.id.trim().is_empty() {
            Some("id")
        } else if recipe.title.trim().is_empty() {
            Some("title")
        } else if recipe.ingredients.is_empty() {
            Some("ingredients")
        } else if recipe.instructions.is_empty() {
            Some("instructions")
        } else {
            None
        };
        if let Some(field) = missing {
            return Err(ImportError::MissingField { index, field });
        }
    }
    Ok(recipes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name(date), "nutricoach_recipes_2024-03-07.json");
    }

    #[test]
    fn test_render_export_is_pretty_array() {
        assert_eq!(render_export(&[]).unwrap(), "[]");
        let recipe: Recipe = serde_json::from_str(
            r#"{"id":"user-recipe-1","title":"T","ingredients":["a"],"instructions":["b"]}"#,
        )
        .unwrap();
        let out = render_export(&[recipe]).unwrap();
        assert!(out.starts_with("[\n"));
        assert!(out.contains("\"id\": \"user-recipe-1\""));
    }

    #[test]
    fn test_parse_import_payload_valid() {
        let recipes = parse_import_payload(
            r#"[{"id":"user-recipe-1","title":"T","ingredients":["a"],"instructions":["b"],"calories":100}]"#,
        )
        .unwrap();
        assert_eq!(recipes.len(), 1);
        assert!((recipes[0].calories - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_import_payload_rejects_non_array() {
        let err = parse_import_payload(r#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));
        assert!(parse_import_payload("not json").is_err());
    }

    #[test]
    fn test_parse_import_payload_rejects_whole_batch_on_one_bad_entry() {
        let err = parse_import_payload(
            r#"[
                {"id":"user-recipe-1","title":"Good","ingredients":["a"],"instructions":["b"]},
                {"id":"user-recipe-2","title":"Bad","ingredients":["a"],"instructions":[]}
            ]"#,
        )
        .unwrap_err();
        match err {
            ImportError::MissingField { index, field } => {
                assert_eq!(index, 1);
                assert_eq!(field, "instructions");
            }
            ImportError::Malformed(e) => panic!("unexpected parse error: {e}"),
        }
    }

    #[test]
    fn test_parse_import_payload_blank_title() {
        let err = parse_import_payload(
            r#"[{"id":"user-recipe-1","title":"  ","ingredients":["a"],"instructions":["b"]}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'title'"));
    }

    #[test]
    fn test_parse_import_payload_missing_id() {
        let err =
            parse_import_payload(r#"[{"title":"T","ingredients":["a"],"instructions":["b"]}]"#)
                .unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }
}
