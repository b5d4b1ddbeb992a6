//! # Snipster
//!
//! A code snippet manager with interchangeable storage backends.
//!
//! Snippets are stored through a single [`SnippetRepository`] contract that is
//! implemented by three backends (`SQLite`, in-process memory, and an append-only
//! JSON lines log). Snippets can be mirrored to GitHub gists; the
//! [`GistService`] keeps the local gist records reconciled with the remote
//! service and repairs drift when a gist disappears out-of-band.
//!
//! ## Example
//!
//! ```rust,ignore
//! use snipster::{Language, NewSnippet, StorageFactory, SnipsterConfig};
//!
//! let storage = StorageFactory::create(&SnipsterConfig::default())?;
//! let snippet = storage.snippets.add(NewSnippet::new(
//!     "Loop",
//!     "for i in range(3): print(i)",
//!     Language::Python,
//! )?)?;
//! storage.snippets.tags(snippet.id, &["basics", "python"], false, true)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod gist;
#[cfg(feature = "http")]
pub mod http;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::SnipsterConfig;
pub use gist::{GistRemote, GitHubGistClient};
pub use models::{Gist, GistStatus, Language, NewSnippet, Snippet, SnippetId};
pub use services::GistService;
pub use storage::{BackendType, GistStore, SnippetRepository, Storage, StorageFactory};

/// Error type for snipster operations.
///
/// Every backend and the gist service translate their medium-specific failures
/// (`rusqlite`, I/O, JSON, HTTP) into one of these variants, so callers never
/// see a storage-specific error type.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | HTTP |
/// |---------|-------------|------|
/// | `InvalidInput` | Title too short, empty code, unknown language | 422 |
/// | `Duplicate` | A snippet with the same title and language exists | 409 |
/// | `NotFound` | `delete`, `tags` or `toggle_favourite` on an unknown id | 404 |
/// | `Conflict` | More than one record matches a supposedly unique key | 409 |
/// | `StorageUnavailable` | Database, file or lock failures | 500 |
/// | `ExternalService` | The gist API call failed | 500 |
/// | `DuplicateExternalResource` | A gist already mirrors the snippet | 409 |
/// | `LocalCleanupFailed` | Remote gist deleted but the local record was not | 500 |
/// | `UnknownBackend` | Configuration names a backend that does not exist | n/a |
/// | `OperationFailed` | Logging, metrics or server setup failed | 500 |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A uniqueness constraint was violated.
    #[error("{entity} already exists: {key}")]
    Duplicate {
        /// The kind of entity (e.g. "snippet").
        entity: &'static str,
        /// The conflicting key, formatted for humans.
        key: String,
    },

    /// The requested entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The kind of entity.
        entity: &'static str,
        /// The identifier that was looked up.
        id: i64,
    },

    /// More than one record matched an identifier that must be unique.
    ///
    /// Never resolved by picking one of the matches.
    #[error("conflict: {matches} {entity} records found for id {id}")]
    Conflict {
        /// The kind of entity.
        entity: &'static str,
        /// The identifier that was looked up.
        id: i64,
        /// How many records matched.
        matches: usize,
    },

    /// The storage medium failed.
    ///
    /// Raised when:
    /// - `SQLite` cannot be opened or a query fails for a non-constraint reason
    /// - The JSON lines log cannot be read, parsed or rewritten
    #[error("storage operation '{operation}' failed: {cause}")]
    StorageUnavailable {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A call to the remote gist service failed.
    #[error("external service operation '{operation}' failed: {cause}")]
    ExternalService {
        /// The remote operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A gist already mirrors this snippet.
    #[error("a gist already exists for snippet {snippet_id}: {url}")]
    DuplicateExternalResource {
        /// The snippet that already has a gist.
        snippet_id: i64,
        /// URL of the existing gist.
        url: String,
    },

    /// The remote gist is gone but removing the local record failed.
    #[error("remote gist removed but local cleanup for snippet {snippet_id} failed: {cause}")]
    LocalCleanupFailed {
        /// The snippet whose gist record could not be removed.
        snippet_id: i64,
        /// The underlying cause.
        cause: String,
    },

    /// The configured storage backend is not known.
    #[error("unknown storage backend '{0}' (expected one of: memory, sql, json)")]
    UnknownBackend(String),

    /// A process-level operation failed (logging setup, server bind).
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::StorageUnavailable`] from any displayable cause.
    pub fn storage(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Builds a [`Error::ExternalService`] from any displayable cause.
    pub fn external(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::ExternalService {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Builds an [`Error::OperationFailed`] for a process-level failure.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for snipster operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("title too short".to_string());
        assert_eq!(err.to_string(), "invalid input: title too short");

        let err = Error::Duplicate {
            entity: "snippet",
            key: "Loop (python)".to_string(),
        };
        assert_eq!(err.to_string(), "snippet already exists: Loop (python)");

        let err = Error::NotFound {
            entity: "snippet",
            id: 7,
        };
        assert_eq!(err.to_string(), "snippet 7 not found");

        let err = Error::Conflict {
            entity: "gist",
            id: 3,
            matches: 2,
        };
        assert_eq!(err.to_string(), "conflict: 2 gist records found for id 3");
    }

    #[test]
    fn test_error_helpers() {
        let err = Error::storage("insert_snippet", "disk I/O error");
        assert_eq!(
            err.to_string(),
            "storage operation 'insert_snippet' failed: disk I/O error"
        );

        let err = Error::external("create_gist", "connection refused");
        assert!(matches!(err, Error::ExternalService { ref operation, .. } if operation == "create_gist"));
    }

    #[test]
    fn test_unknown_backend_names_choices() {
        let err = Error::UnknownBackend("mongo".to_string());
        let msg = err.to_string();
        assert!(msg.contains("mongo"));
        assert!(msg.contains("memory, sql, json"));
    }
}
