//! Ingredient lists written out in a video description.
//!
//! Korean cooking channels usually paste the ingredient list under a "재료"
//! heading, followed by the steps under "만드는 법". When the audio cannot be
//! processed this is often good enough to keep the video.

use super::parse::clean_ingredients;
use regex::Regex;
use std::sync::LazyLock;

const SECTION_START: &str = "재료";
const SECTION_END: &str = "만드는";
/// Characters scanned when the section has no explicit end.
const MAX_SECTION_CHARS: usize = 500;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s,/·•]+").expect("Invalid regex"));
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w]").expect("Invalid regex"));

/// Extract ingredient names from the description's ingredient section.
///
/// Returns an empty list when the description has no such section.
pub fn ingredients_from_description(description: &str) -> Vec<String> {
    let Some(idx) = description.find(SECTION_START) else {
        return Vec::new();
    };
    let rest = &description[idx + SECTION_START.len()..];

    let section = match rest.find(SECTION_END) {
        Some(end) => &rest[..end],
        None => match rest.char_indices().nth(MAX_SECTION_CHARS) {
            Some((end, _)) => &rest[..end],
            None => rest,
        },
    };

    let tokens: Vec<String> = SEPARATORS
        .split(section.trim())
        .map(|token| NON_WORD.replace_all(token, "").into_owned())
        // quantities such as "300g" or "2큰술" carry no ingredient name
        .filter(|token| token.chars().next().is_some_and(|c| !c.is_ascii_digit()))
        .collect();

    clean_ingredients(tokens.iter().map(String::as_str))
}
