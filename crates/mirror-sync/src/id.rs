//! Identifier normalization.
//!
//! Notion ids show up in three shapes: a raw 32-hex token, the hyphenated
//! 8-4-4-4-12 form, and embedded in a page URL. All of them normalize to the
//! lowercase 32-hex token.

use std::sync::LazyLock;

use regex::Regex;

static HEX_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9a-fA-F]{32}").unwrap());

/// Canonicalize an identifier, or return `None` if it does not contain one.
///
/// The first run of 32 hex characters wins (that is how ids appear in URLs).
/// Failing that, hyphens are stripped from the whole input and the rest must
/// be exactly 32 hex characters.
pub fn normalize_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(found) = HEX_ID_RE.find(input) {
        return Some(found.as_str().to_ascii_lowercase());
    }

    let stripped: String = input.chars().filter(|c| *c != '-').collect();
    (stripped.len() == 32 && stripped.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| stripped.to_ascii_lowercase())
}

/// Format a canonical id in the hyphenated form the API returns.
///
/// Inputs that are not canonical are returned unchanged.
pub fn hyphenate(id: &str) -> String {
    if id.len() != 32 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return id.to_owned();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &id[..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..]
    )
}
