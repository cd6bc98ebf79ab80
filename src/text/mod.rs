//! Text handling for OCR output and KB matching.
//!
//! - [`normalize`] canonicalises text before it is embedded. KB entries were normalized the
//!   same way when the KB was built; matching only works if both sides agree.
//! - [`ingredients`] finds the ingredients statement in OCR text and splits it into tokens.

pub mod ingredients;


pub use ingredients::{find_ingredients_block, parse_ingredients_list};

use std::sync::LazyLock;

use regex::Regex;

static PARENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static BRACKETS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static PUNCTUATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[®™.,:;!?*]").unwrap());
static EXTRA_SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Normalizes text for semantic matching.
///
/// Lowercases, drops `( … )` and `[ … ]` asides, blanks out `*` and `® ™ . , : ; ! ?`,
/// spells `&` as `and`, and collapses whitespace. The result is trimmed and idempotent:
/// `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let text = text.trim().to_lowercase();
    let text = PARENS_RE.replace_all(&text, " ");
    let text = BRACKETS_RE.replace_all(&text, " ");
    let text = PUNCTUATION_RE.replace_all(&text, " ");
    let text = text.replace('&', " and ");
    let text = EXTRA_SPACES_RE.replace_all(&text, " ");
    text.trim().to_string()
}
