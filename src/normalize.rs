//! Header canonicalization.
//!
//! Raw headers arrive in whatever shape the exporting tool chose
//! (`"Sales (millions)"`, `" Release Year "`, `"PUBLISHER"`). Every header is
//! rewritten into a canonical token form so role resolution can rely on
//! simple substring tests:
//!
//! 1. trim leading/trailing whitespace
//! 2. collapse each internal whitespace run into a single `_`
//! 3. drop literal `(` and `)`
//! 4. lowercase
//!
//! The mapping is one-to-one and order preserving. Duplicates are kept; see
//! [`crate::roles::RoleBinding::ambiguities`] for how collisions surface.

use std::sync::OnceLock;

use regex::Regex;

static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

fn whitespace_run() -> &'static Regex {
    WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Canonicalizes a single raw header. Idempotent.
pub fn normalize_column_name(raw: &str) -> String {
    let collapsed = whitespace_run().replace_all(raw.trim(), "_");
    collapsed
        .chars()
        .filter(|ch| !matches!(ch, '(' | ')'))
        .collect::<String>()
        .to_lowercase()
}

pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|header| normalize_column_name(header.as_ref()))
        .collect()
}

/// Returns canonical names that occur more than once, in first-seen order.
pub fn duplicate_names(columns: &[String]) -> Vec<String> {
    let mut duplicates = Vec::new();
    for (idx, name) in columns.iter().enumerate() {
        if columns[..idx].contains(name) && !duplicates.contains(name) {
            duplicates.push(name.clone());
        }
    }
    duplicates
}
