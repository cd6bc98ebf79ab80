//! Ingredients statement extraction.
//!
//! OCR text from a label is free-form. The statement we care about starts at the word
//! "ingredients" and runs to the next period. Note the match stops at the *first* period,
//! so abbreviations such as "Vitamin D." cut the block short.

use std::sync::LazyLock;

use regex::Regex;

static INGREDIENTS_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)ingredients.*?\.").unwrap());

static INGREDIENTS_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^ingredients.*?(?::|\))\s*").unwrap());

/// Returns the shortest span from a case-insensitive `ingredients` to the next period.
///
/// `None` means the text has no ingredients statement; callers cannot classify without one.
pub fn find_ingredients_block(full_text: &str) -> Option<String> {
    INGREDIENTS_BLOCK_RE
        .find(full_text)
        .map(|m| m.as_str().trim().to_string())
}

/// Splits an ingredients block into trimmed, non-empty tokens.
///
/// The leading `Ingredients:` (or `Ingredients (…)`) prefix and one trailing period are
/// removed first. Commas split only at parenthesis depth zero, so
/// `"salt (iodized, refined)"` stays a single token. Unbalanced `)` never drives the
/// depth below zero.
pub fn parse_ingredients_list(block: &str) -> Vec<String> {
    if block.is_empty() {
        return Vec::new();
    }

    let flat = block.replace('\n', " ");
    let cleaned = INGREDIENTS_PREFIX_RE.replacen(&flat, 1, "");
    let cleaned = cleaned.trim();
    let cleaned = cleaned.strip_suffix('.').unwrap_or(cleaned);

    let mut ingredients = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;

    for ch in cleaned.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }

        if ch == ',' && depth == 0 {
            push_token(&mut ingredients, &current);
            current.clear();
        } else {
            current.push(ch);
        }
    }
    push_token(&mut ingredients, &current);

    ingredients
}

fn push_token(ingredients: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() {
        ingredients.push(token.to_string());
    }
}
