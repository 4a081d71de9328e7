//! Coercion of raw model output into an [`ExtractionResult`].

use super::{ExtractedRecipe, ExtractionResult};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static CODE_FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:json|JSON)?\s*").expect("Invalid regex"));
static CODE_FENCE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("Invalid regex"));

/// Parse a model answer. A missing or blank dish name falls back to `fallback_title`.
pub fn parse_model_output(raw: &str, fallback_title: &str) -> ExtractionResult {
    let malformed = || ExtractionResult::MalformedOutput {
        raw_text: raw.to_string(),
    };

    let trimmed = raw.trim();
    let unfenced = CODE_FENCE_OPEN.replace(trimmed, "");
    let unfenced = CODE_FENCE_CLOSE.replace(&unfenced, "");

    let Some(json) = parse_object(&unfenced) else {
        return malformed();
    };

    let dish_name = match json.get("dish_name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) | Some(Value::Null) | None => fallback_title.trim().to_string(),
        Some(_) => return malformed(),
    };

    let ingredients = match json.get("ingredients") {
        Some(Value::String(s)) => clean_ingredients(s.split([',', '\n'])),
        Some(Value::Array(items)) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => names.push(s.as_str()),
                    _ => return malformed(),
                }
            }
            clean_ingredients(names)
        }
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return malformed(),
    };

    ExtractionResult::Extracted(ExtractedRecipe {
        dish_name,
        ingredients,
    })
}

/// Parse a JSON object, tolerating chatter around it.
fn parse_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Some(map);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Trim, collapse inner whitespace, and drop empty or repeated names.
///
/// Order of first appearance is kept. Repeats are detected case-insensitively.
pub fn clean_ingredients<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(result: ExtractionResult) -> ExtractedRecipe {
        match result {
            ExtractionResult::Extracted(recipe) => recipe,
            other => panic!("expected a recipe, got {:?}", other),
        }
    }

    #[test]
    fn test_comma_string_ingredients() {
        let recipe = extracted(parse_model_output(
            r#"{"dish_name": "김치찌개", "ingredients": "돼지고기, 김치,두부,  대파 "}"#,
            "title",
        ));

        assert_eq!(recipe.dish_name, "김치찌개");
        assert_eq!(recipe.ingredients, vec!["돼지고기", "김치", "두부", "대파"]);
    }

    #[test]
    fn test_array_ingredients_in_code_fence() {
        let raw = "```json\n{\"dish_name\": \"Pancakes\", \"ingredients\": [\"Flour\", \"milk\", \"flour\", \"\"]}\n```";
        let recipe = extracted(parse_model_output(raw, "title"));

        assert_eq!(recipe.ingredients, vec!["Flour", "milk"]);
    }

    #[test]
    fn test_missing_dish_name_uses_title() {
        let recipe = extracted(parse_model_output(
            r#"{"ingredients": "계란,소금"}"#,
            "초간단 계란찜",
        ));
        assert_eq!(recipe.dish_name, "초간단 계란찜");
    }

    #[test]
    fn test_empty_ingredients_are_valid() {
        let recipe = extracted(parse_model_output(
            r#"{"dish_name": "물", "ingredients": ""}"#,
            "title",
        ));
        assert!(recipe.ingredients.is_empty());
    }

    #[test]
    fn test_surrounding_chatter() {
        let recipe = extracted(parse_model_output(
            "Sure! Here it is: {\"dish_name\": \"라면\", \"ingredients\": \"라면,계란\"} Enjoy.",
            "title",
        ));
        assert_eq!(recipe.ingredients, vec!["라면", "계란"]);
    }

    #[test]
    fn test_malformed_outputs() {
        for raw in [
            "I could not find a recipe.",
            "[\"a\", \"b\"]",
            r#"{"dish_name": 42, "ingredients": "a"}"#,
            r#"{"dish_name": "x", "ingredients": [1, 2]}"#,
            r#"{"dish_name": "x", "ingredients": {"a": 1}}"#,
        ] {
            assert_eq!(
                parse_model_output(raw, "title"),
                ExtractionResult::MalformedOutput {
                    raw_text: raw.to_string()
                },
                "input: {raw}"
            );
        }
    }

    #[test]
    fn test_clean_ingredients() {
        assert_eq!(
            clean_ingredients(["  sesame   oil ", "Sesame Oil", "", "salt"]),
            vec!["sesame oil", "salt"]
        );
    }
}
