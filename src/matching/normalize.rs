//! Ingredient name normalization and the match predicate.

use std::collections::HashMap;

/// Turns a free-text ingredient name into its comparison form.
///
/// Implementations must map blank input to an empty string; empty names never
/// match anything.
pub trait IngredientNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// Trim, case-fold and collapse internal whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicNormalizer;

impl IngredientNormalizer for BasicNormalizer {
    fn normalize(&self, raw: &str) -> String {
        raw.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// [`BasicNormalizer`] followed by a table of term rewrites.
#[derive(Debug, Clone, Default)]
pub struct AliasNormalizer {
    aliases: HashMap<String, String>,
}

impl AliasNormalizer {
    /// Build from raw `alias -> canonical` pairs; both sides are normalized.
    pub fn new<I, K, V>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let aliases = aliases
            .into_iter()
            .map(|(k, v)| {
                (
                    BasicNormalizer.normalize(k.as_ref()),
                    BasicNormalizer.normalize(v.as_ref()),
                )
            })
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();
        Self { aliases }
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl IngredientNormalizer for AliasNormalizer {
    fn normalize(&self, raw: &str) -> String {
        let basic = BasicNormalizer.normalize(raw);
        match self.aliases.get(&basic) {
            Some(canonical) => canonical.clone(),
            None => basic,
        }
    }
}

/// Whether an owned ingredient and a recipe ingredient refer to the same thing.
///
/// Both arguments must already be normalized. Equal names match, and so do
/// names where either contains the other, compared with spaces removed so
/// "돼지 고기" and "돼지고기" agree. This is an approximation, not synonym
/// resolution: "고기" matches "돼지고기", but "pork" does not.
pub fn ingredients_match(a: &str, b: &str) -> bool {
    let a: String = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: String = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// Split a comma separated ingredient string as typed by a user.
pub fn parse_ingredient_list(input: &str) -> Vec<String> {
    input
        .split([',', '\n', '、'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
