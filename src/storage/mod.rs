//! Storage layer abstraction.
//!
//! One contract ([`SnippetRepository`] plus [`GistStore`]) with three
//! implementations selected by [`StorageFactory`]:
//!
//! | Identifier | Backend | Durable |
//! |------------|---------|---------|
//! | `sql` | [`SqliteBackend`] | yes |
//! | `memory` | [`InMemoryBackend`] | no |
//! | `json` | [`JsonlBackend`] | yes |

// Dropping the connection guard a few statements early buys nothing here.
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::or_fun_call)]

mod metrics;
pub mod persistence;
pub mod search;
pub mod sqlite;
mod tags;
pub mod traits;

use crate::config::SnipsterConfig;
use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub use self::metrics::{record_operation_metrics, status_label};
pub use persistence::{InMemoryBackend, JsonlBackend, SqliteBackend};
pub use sqlite::acquire_lock;
pub use tags::{TAG_SEPARATOR, merge_tags, parse_tags, split_tag_input};
pub use traits::{GistStore, SnippetRepository};

/// Storage backend identifiers accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// `SQLite` database file.
    #[default]
    Sql,
    /// Process memory only.
    Memory,
    /// Append-only JSON lines logs.
    Json,
}

impl BackendType {
    /// Returns the configuration identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Memory => "memory",
            Self::Json => "json",
        }
    }

    /// Parses a configuration identifier, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sql" | "sqlite" => Some(Self::Sql),
            "memory" => Some(Self::Memory),
            "json" | "jsonl" => Some(Self::Json),
            _ => None,
        }
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::UnknownBackend(s.to_string()))
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A constructed backend exposed through both storage traits.
///
/// `snippets` and `gists` point at the same backend instance, so deleting a
/// snippet removes its gist record.
#[derive(Clone)]
pub struct Storage {
    /// Which backend was constructed.
    pub backend: BackendType,
    /// Snippet repository.
    pub snippets: Arc<dyn SnippetRepository>,
    /// Gist record store.
    pub gists: Arc<dyn GistStore>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Factory for constructing storage backends from configuration.
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the backend named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened.
    pub fn create(config: &SnipsterConfig) -> Result<Storage> {
        Self::create_with_backend(config.backend, &config.database_path(), &config.json_dir())
    }

    /// Creates a backend from an identifier such as `"sql"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] for unknown identifiers instead of
    /// falling back to a default.
    pub fn create_from_name(name: &str, config: &SnipsterConfig) -> Result<Storage> {
        let backend: BackendType = name.parse()?;
        Self::create_with_backend(backend, &config.database_path(), &config.json_dir())
    }

    /// Creates a specific backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the database or log directory
    /// cannot be opened.
    pub fn create_with_backend(
        backend: BackendType,
        database_path: &Path,
        json_dir: &Path,
    ) -> Result<Storage> {
        tracing::debug!(backend = %backend, "Creating storage backend");
        match backend {
            BackendType::Sql => Ok(Self::share(backend, SqliteBackend::new(database_path)?)),
            BackendType::Memory => Ok(Self::share(backend, InMemoryBackend::new())),
            BackendType::Json => Ok(Self::share(backend, JsonlBackend::new(json_dir)?)),
        }
    }

    fn share<B>(backend: BackendType, instance: B) -> Storage
    where
        B: SnippetRepository + GistStore + 'static,
    {
        let instance = Arc::new(instance);
        Storage {
            backend,
            snippets: Arc::clone(&instance) as Arc<dyn SnippetRepository>,
            gists: instance,
        }
    }
}
