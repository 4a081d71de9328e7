//! Prompt templates for Larder.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub extraction: ExtractionPrompts,
}

/// Prompts for dish name / ingredient extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    pub system: String,
    pub user: String,
    /// Used for the single retry after the model answered with something unparsable.
    pub reformulate: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            system: "You are a recipe extraction assistant. Always respond with valid JSON only."
                .to_string(),

            user: r#"The following is the transcript of a cooking video. Extract the dish name and its ingredients.

Rules:
1. Keep the dish name short and plain
2. List ingredients separated by commas only
3. Include basic seasonings (salt, pepper, cooking oil, ...)
4. Write names in the language spoken in the video

Video title: {{title}}

Transcript: {{transcript}}

Respond only in this format:
{"dish_name": "dish", "ingredients": "ingredient1,ingredient2,ingredient3"}"#
                .to_string(),

            reformulate: r#"Your previous answer could not be parsed. Reply with exactly one JSON object and nothing else, no code fences, no commentary.

The object must have two keys:
- "dish_name": a string
- "ingredients": an array of strings (may be empty)

Video title: {{title}}

Transcript: {{transcript}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults with files from `custom_dir` when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let extraction_path = custom_path.join("extraction.toml");
            if extraction_path.exists() {
                let content = std::fs::read_to_string(&extraction_path)?;
                prompts.extraction = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.extraction.user.contains("{{transcript}}"));
        assert!(prompts.extraction.reformulate.contains("{{transcript}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Title: {{title}} / {{transcript}}";
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), "김치찌개".to_string());
        vars.insert("transcript".to_string(), "오늘은".to_string());

        assert_eq!(Prompts::render(template, &vars), "Title: 김치찌개 / 오늘은");
    }

    #[test]
    fn test_custom_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extraction.toml"),
            "system = \"custom system\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.extraction.system, "custom system");
        // Unspecified fields keep their defaults
        assert!(prompts.extraction.user.contains("{{title}}"));
    }
}
