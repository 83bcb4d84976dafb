//! Ingredient label text to canonical tokens.
//!
//! Lowercases, drops parenthesized sub-ingredients and punctuation, splits on
//! commas and newlines, then deduplicates keeping first-seen order.
//!
//! Letters are kept by Unicode class rather than ASCII range, so accented
//! names ("jalapeño", "crème fraîche") stay intact instead of losing their
//! accented characters.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::types::IngredientToken;

/// Parenthesized text, non-greedy and confined to one line.
static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)\n]*\)").expect("valid parenthesis pattern"));

fn is_kept(c: char) -> bool {
    c.is_alphanumeric() || c == ',' || c == '-' || c.is_whitespace()
}

/// Normalize raw ingredient text. Absent or empty text yields no tokens.
pub fn normalize(raw: Option<&str>) -> Vec<IngredientToken> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let lower = raw.to_lowercase();
    let without_parens = PARENTHESIZED.replace_all(&lower, "");
    let cleaned: String = without_parens.chars().filter(|&c| is_kept(c)).collect();

    let mut seen = HashSet::new();
    cleaned
        .split([',', '\n'])
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .filter(|piece| seen.insert(piece.to_string()))
        .map(|piece| IngredientToken::new(piece.to_string()))
        .collect()
}
