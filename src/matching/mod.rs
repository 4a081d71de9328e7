//! Ingredient matching and recipe ranking.
//!
//! Extracted ingredient names come from speech, not from a controlled
//! vocabulary, so matching is approximate: names are normalized, then two
//! names match when one contains the other.

mod normalize;
mod rank;

pub use normalize::{
    ingredients_match, parse_ingredient_list, AliasNormalizer, BasicNormalizer, IngredientNormalizer,
};
pub use rank::{rank_recipes, score_recipe, MatchResult, Recommender};
