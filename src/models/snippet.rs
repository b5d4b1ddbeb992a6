//! Snippet types and identifiers.

use super::Language;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of characters in a snippet title.
pub const MIN_TITLE_LEN: usize = 3;

/// Storage-assigned identifier of a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(i64);

impl SnippetId {
    /// Creates a snippet ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SnippetId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A stored code snippet.
///
/// Title and code never change after creation; only `tags` and `favorite` are
/// mutated, and each mutation bumps `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Identifier assigned by the backend.
    pub id: SnippetId,
    /// Human readable title, at least three characters.
    pub title: String,
    /// The code body.
    pub code: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Language of the code body.
    #[serde(default)]
    pub language: Language,
    /// Comma separated tags (`"a, b"`), absent when there are none.
    #[serde(default)]
    pub tags: Option<String>,
    /// Whether the snippet is marked as a favourite.
    #[serde(default)]
    pub favorite: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last tag or favourite change.
    pub updated_at: DateTime<Utc>,
}

impl Snippet {
    /// Materializes a validated [`NewSnippet`] with an assigned id.
    #[must_use]
    pub fn from_new(id: SnippetId, new: NewSnippet, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            code: new.code,
            description: new.description,
            language: new.language,
            tags: new.tags,
            favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true when this snippet has the given duplicate-detection key.
    #[must_use]
    pub fn same_key(&self, title: &str, language: Language) -> bool {
        self.title == title && self.language == language
    }
}

/// Input for creating a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSnippet {
    /// Title of the snippet.
    pub title: String,
    /// Code body.
    pub code: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Language, Python when omitted.
    #[serde(default)]
    pub language: Language,
    /// Initial comma separated tags.
    #[serde(default)]
    pub tags: Option<String>,
}

impl NewSnippet {
    /// Creates a validated snippet input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the title is shorter than
    /// [`MIN_TITLE_LEN`] characters or the code is empty.
    pub fn new(
        title: impl Into<String>,
        code: impl Into<String>,
        language: Language,
    ) -> Result<Self> {
        let snippet = Self {
            title: title.into(),
            code: code.into(),
            description: None,
            language,
            tags: None,
        };
        snippet.validate()?;
        Ok(snippet)
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    /// Sets the initial tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        let tags = tags.into();
        self.tags = if tags.trim().is_empty() {
            None
        } else {
            Some(tags)
        };
        self
    }

    /// Checks the field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().chars().count() < MIN_TITLE_LEN {
            return Err(Error::InvalidInput(format!(
                "title must be at least {MIN_TITLE_LEN} characters"
            )));
        }
        if self.code.trim().is_empty() {
            return Err(Error::InvalidInput("code must not be empty".to_string()));
        }
        Ok(())
    }

    /// Human readable duplicate-detection key.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} ({})", self.title, self.language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_snippet_validates_title() {
        let err = NewSnippet::new("ab", "print(1)", Language::Python).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("title")));

        // whitespace padding does not count
        assert!(NewSnippet::new("  ab  ", "print(1)", Language::Python).is_err());
        assert!(NewSnippet::new("abc", "print(1)", Language::Python).is_ok());
    }

    #[test]
    fn test_new_snippet_rejects_empty_code() {
        let err = NewSnippet::new("Loop", "   ", Language::Python).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("code")));
    }

    #[test]
    fn test_builders_drop_blank_values() {
        let new = NewSnippet::new("Loop", "x", Language::Python)
            .unwrap()
            .with_description("  ")
            .with_tags("basics");
        assert_eq!(new.description, None);
        assert_eq!(new.tags.as_deref(), Some("basics"));
    }

    #[test]
    fn test_from_new_defaults() {
        let now = Utc::now();
        let new = NewSnippet::new("Loop", "x", Language::JavaScript).unwrap();
        let snippet = Snippet::from_new(SnippetId::new(4), new, now);
        assert_eq!(snippet.id.get(), 4);
        assert!(!snippet.favorite);
        assert_eq!(snippet.created_at, snippet.updated_at);
        assert!(snippet.same_key("Loop", Language::JavaScript));
        assert!(!snippet.same_key("Loop", Language::Python));
    }

    #[test]
    fn test_snippet_json_timestamps_are_iso8601() {
        let now = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let new = NewSnippet::new("Loop", "x", Language::Python).unwrap();
        let snippet = Snippet::from_new(SnippetId::new(1), new, now);
        let json = serde_json::to_string(&snippet).unwrap();
        assert!(json.contains("\"created_at\":\"2025-03-01T10:00:00Z\""));
        assert!(json.contains("\"language\":\"Python\""));
    }
}
