//! Local records mirroring remote gists.

use super::SnippetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reconciliation status of a gist record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GistStatus {
    /// The last probe confirmed the remote gist exists.
    #[default]
    Active,
    /// A probe reported the remote gist is gone.
    DeletedOnRemote,
    /// The stored status could not be interpreted.
    Unknown,
}

impl GistStatus {
    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::DeletedOnRemote => "deleted_on_remote",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a stored status. Anything unrecognised maps to [`GistStatus::Unknown`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => Self::Active,
            "deleted_on_remote" | "deleted-on-remote" => Self::DeletedOnRemote,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for GistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A local record of a gist published for one snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    /// Local identifier.
    pub id: i64,
    /// The mirrored snippet. At most one gist exists per snippet.
    pub snippet_id: SnippetId,
    /// Identifier of the gist on the remote service.
    pub gist_id: String,
    /// Browser URL of the remote gist.
    pub gist_url: String,
    /// Whether the gist is public.
    pub is_public: bool,
    /// When the local record was created.
    pub created_at: DateTime<Utc>,
    /// Reconciliation status.
    #[serde(default)]
    pub status: GistStatus,
    /// Last time a probe confirmed the remote gist.
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
}

/// Input for recording a freshly created remote gist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGist {
    /// The mirrored snippet.
    pub snippet_id: SnippetId,
    /// Identifier returned by the remote service.
    pub gist_id: String,
    /// Browser URL returned by the remote service.
    pub gist_url: String,
    /// Visibility.
    pub is_public: bool,
}

impl Gist {
    /// Materializes a [`NewGist`] with its local id.
    #[must_use]
    pub fn from_new(id: i64, new: NewGist, now: DateTime<Utc>) -> Self {
        Self {
            id,
            snippet_id: new.snippet_id,
            gist_id: new.gist_id,
            gist_url: new.gist_url,
            is_public: new.is_public,
            created_at: now,
            status: GistStatus::Active,
            verified_at: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(GistStatus::parse("active"), GistStatus::Active);
        assert_eq!(GistStatus::parse("DELETED_ON_REMOTE"), GistStatus::DeletedOnRemote);
        assert_eq!(GistStatus::parse("garbage"), GistStatus::Unknown);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            GistStatus::Active,
            GistStatus::DeletedOnRemote,
            GistStatus::Unknown,
        ] {
            assert_eq!(GistStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_from_new_is_active_and_verified() {
        let now = Utc::now();
        let gist = Gist::from_new(
            1,
            NewGist {
                snippet_id: SnippetId::new(9),
                gist_id: "abc".to_string(),
                gist_url: "https://gist.github.com/u/abc".to_string(),
                is_public: false,
            },
            now,
        );
        assert_eq!(gist.status, GistStatus::Active);
        assert_eq!(gist.verified_at, Some(now));
    }
}
