//! In-process search matching used by the memory and JSON lines backends.
//!
//! Plain substring matching, so `%`, `_` and `\` in a term are always literal.

use crate::models::{Language, Snippet};

/// Returns true when `snippet` matches `term` (case-insensitively, in title,
/// code or description) and the optional language filter.
#[must_use]
pub fn matches(snippet: &Snippet, term: &str, language: Option<Language>) -> bool {
    if language.is_some_and(|lang| lang != snippet.language) {
        return false;
    }

    let needle = term.to_lowercase();
    [
        Some(snippet.title.as_str()),
        Some(snippet.code.as_str()),
        snippet.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Filters `snippets` down to the matches, preserving order.
pub fn filter<'a, I>(snippets: I, term: &str, language: Option<Language>) -> Vec<Snippet>
where
    I: IntoIterator<Item = &'a Snippet>,
{
    snippets
        .into_iter()
        .filter(|s| matches(s, term, language))
        .cloned()
        .collect()
}
