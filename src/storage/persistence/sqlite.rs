//! `SQLite`-based storage backend.
//!
//! Durable storage for snippets and gist records. The `(title, language)`
//! uniqueness rule and the one-gist-per-snippet rule are enforced by the
//! schema; constraint violations are translated into
//! [`Error::Duplicate`] / [`Error::DuplicateExternalResource`].

use crate::models::{Gist, GistStatus, Language, NewGist, NewSnippet, Snippet, SnippetId};
use crate::storage::metrics::{record_operation_metrics, status_label};
use crate::storage::sqlite::{
    Constraint, GIST_COLUMNS, SNIPPET_COLUMNS, acquire_lock, configure_connection,
    contains_pattern, format_timestamp, gist_from_row, is_constraint, snippet_from_row,
};
use crate::storage::{GistStore, SnippetRepository, merge_tags};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Params, params};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// `SQLite`-based storage backend.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`.
/// Every repository operation runs inside its own `BEGIN IMMEDIATE`
/// transaction; no transaction spans more than one operation.
///
/// # Schema
///
/// - `snippets`: `UNIQUE (title, language)`, timestamps as RFC 3339 text
/// - `gists`: `snippet_id UNIQUE REFERENCES snippets(id) ON DELETE CASCADE`
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Opens (or creates) a database file.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the database cannot be opened or
    /// initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage("create_data_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::storage("open_sqlite", e))?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        backend.initialize()?;
        Ok(backend)
    }

    /// Creates an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage("open_sqlite_in_memory", e))?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        backend.initialize()?;
        Ok(backend)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS snippets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                code TEXT NOT NULL,
                description TEXT,
                language TEXT NOT NULL,
                tags TEXT,
                favorite INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (title, language)
            );
            CREATE TABLE IF NOT EXISTS gists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                snippet_id INTEGER NOT NULL UNIQUE
                    REFERENCES snippets(id) ON DELETE CASCADE,
                gist_id TEXT NOT NULL,
                gist_url TEXT NOT NULL,
                is_public INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                verified_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_snippets_language ON snippets(language);",
        )
        .map_err(|e| Error::storage("create_schema", e))
    }

    /// Runs `f` inside a single `BEGIN IMMEDIATE` transaction.
    fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = acquire_lock(&self.conn);

        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| Error::storage("begin_transaction", e))?;

        let result = f(&conn);

        if result.is_ok() {
            if let Err(e) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(Error::storage("commit_transaction", e));
            }
        } else {
            let _ = conn.execute_batch("ROLLBACK");
        }

        result
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = acquire_lock(&self.conn);
        f(&conn)
    }

    fn fetch_snippet(conn: &Connection, id: SnippetId) -> Result<Option<Snippet>> {
        conn.query_row(
            &format!("SELECT {SNIPPET_COLUMNS} FROM snippets WHERE id = ?1"),
            params![id.get()],
            snippet_from_row,
        )
        .optional()
        .map_err(|e| Error::storage("get_snippet", e))
    }

    fn query_snippets(
        conn: &Connection,
        operation: &str,
        sql: &str,
        params: impl Params,
    ) -> Result<Vec<Snippet>> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::storage(operation, e))?;
        let rows = stmt
            .query_map(params, snippet_from_row)
            .map_err(|e| Error::storage(operation, e))?;
        let snippets = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::storage(operation, e))?;
        Ok(snippets)
    }

    fn query_gists(
        conn: &Connection,
        operation: &str,
        sql: &str,
        params: impl Params,
    ) -> Result<Vec<Gist>> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::storage(operation, e))?;
        let rows = stmt
            .query_map(params, gist_from_row)
            .map_err(|e| Error::storage(operation, e))?;
        let gists = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::storage(operation, e))?;
        Ok(gists)
    }
}

fn match_count(count: i64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

impl SnippetRepository for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, snippet), fields(operation = "add", backend = BACKEND, snippet.title = %snippet.title))]
    fn add(&self, snippet: NewSnippet) -> Result<Snippet> {
        let start = Instant::now();
        let result = snippet.validate().and_then(|()| {
            self.transaction(|conn| {
                let now = Utc::now();
                let ts = format_timestamp(&now);
                conn.execute(
                    "INSERT INTO snippets
                        (title, code, description, language, tags, favorite, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                    params![
                        snippet.title,
                        snippet.code,
                        snippet.description,
                        snippet.language.as_str(),
                        snippet.tags,
                        ts
                    ],
                )
                .map_err(|e| match is_constraint(&e) {
                    Some(Constraint::Unique) => Error::Duplicate {
                        entity: "snippet",
                        key: snippet.key(),
                    },
                    _ => Error::storage("insert_snippet", e),
                })?;

                let id = SnippetId::new(conn.last_insert_rowid());
                Ok(Snippet::from_new(id, snippet, now))
            })
        });

        record_operation_metrics(BACKEND, "add", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "list", backend = BACKEND))]
    fn list(&self) -> Result<Vec<Snippet>> {
        let start = Instant::now();
        let result = self.read(|conn| {
            Self::query_snippets(
                conn,
                "list_snippets",
                &format!("SELECT {SNIPPET_COLUMNS} FROM snippets ORDER BY id"),
                [],
            )
        });

        record_operation_metrics(BACKEND, "list", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "get", backend = BACKEND, snippet.id = %id))]
    fn get(&self, id: SnippetId) -> Result<Option<Snippet>> {
        let start = Instant::now();
        let result = self.read(|conn| Self::fetch_snippet(conn, id));

        record_operation_metrics(BACKEND, "get", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "delete", backend = BACKEND, snippet.id = %id))]
    fn delete(&self, id: SnippetId) -> Result<()> {
        let start = Instant::now();
        let result = self.transaction(|conn| {
            let matches: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM snippets WHERE id = ?1",
                    params![id.get()],
                    |row| row.get(0),
                )
                .map_err(|e| Error::storage("count_snippet", e))?;

            match match_count(matches) {
                0 => Err(Error::NotFound {
                    entity: "snippet",
                    id: id.get(),
                }),
                1 => {
                    conn.execute("DELETE FROM snippets WHERE id = ?1", params![id.get()])
                        .map_err(|e| Error::storage("delete_snippet", e))?;
                    Ok(())
                },
                n => Err(Error::Conflict {
                    entity: "snippet",
                    id: id.get(),
                    matches: n,
                }),
            }
        });

        record_operation_metrics(BACKEND, "delete", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "search", backend = BACKEND))]
    fn search(&self, term: &str, language: Option<Language>) -> Result<Vec<Snippet>> {
        let start = Instant::now();
        let pattern = contains_pattern(&term.to_lowercase());
        let result = self.read(|conn| {
            Self::query_snippets(
                conn,
                "search_snippets",
                &format!(
                    "SELECT {SNIPPET_COLUMNS} FROM snippets
                     WHERE (unicode_lower(COALESCE(title, '')) LIKE ?1 ESCAPE '\\'
                         OR unicode_lower(COALESCE(code, '')) LIKE ?1 ESCAPE '\\'
                         OR unicode_lower(COALESCE(description, '')) LIKE ?1 ESCAPE '\\')
                       AND (?2 IS NULL OR language = ?2)
                     ORDER BY id"
                ),
                params![pattern, language.map(|l| l.as_str())],
            )
        });

        record_operation_metrics(BACKEND, "search", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "toggle_favourite", backend = BACKEND, snippet.id = %id))]
    fn toggle_favourite(&self, id: SnippetId) -> Result<bool> {
        let start = Instant::now();
        let result = self.transaction(|conn| {
            let current: Option<bool> = conn
                .query_row(
                    "SELECT favorite FROM snippets WHERE id = ?1",
                    params![id.get()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| Error::storage("get_favourite", e))?;

            let favorite = !current.ok_or(Error::NotFound {
                entity: "snippet",
                id: id.get(),
            })?;

            conn.execute(
                "UPDATE snippets SET favorite = ?1, updated_at = ?2 WHERE id = ?3",
                params![favorite, format_timestamp(&Utc::now()), id.get()],
            )
            .map_err(|e| Error::storage("update_favourite", e))?;

            Ok(favorite)
        });

        record_operation_metrics(BACKEND, "toggle_favourite", start, status_label(&result));
        result
    }

    #[instrument(skip(self, tags), fields(operation = "tags", backend = BACKEND, snippet.id = %id))]
    fn tags(&self, id: SnippetId, tags: &[&str], remove: bool, sort: bool) -> Result<Snippet> {
        let start = Instant::now();
        let result = self.transaction(|conn| {
            let mut snippet = Self::fetch_snippet(conn, id)?.ok_or(Error::NotFound {
                entity: "snippet",
                id: id.get(),
            })?;

            snippet.tags = merge_tags(snippet.tags.as_deref(), tags, remove, sort);
            snippet.updated_at = Utc::now();

            conn.execute(
                "UPDATE snippets SET tags = ?1, updated_at = ?2 WHERE id = ?3",
                params![snippet.tags, format_timestamp(&snippet.updated_at), id.get()],
            )
            .map_err(|e| Error::storage("update_tags", e))?;

            Ok(snippet)
        });

        record_operation_metrics(BACKEND, "tags", start, status_label(&result));
        result
    }

    fn count(&self) -> Result<usize> {
        self.read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM snippets", [], |row| row.get::<_, i64>(0))
                .map(match_count)
                .map_err(|e| Error::storage("count_snippets", e))
        })
    }
}

impl GistStore for SqliteBackend {
    #[instrument(skip(self, gist), fields(operation = "gist_insert", backend = BACKEND, snippet.id = %gist.snippet_id))]
    fn insert(&self, gist: NewGist) -> Result<Gist> {
        let start = Instant::now();
        let snippet_id = gist.snippet_id;
        let result = self.transaction(|conn| {
            let existing = Self::query_gists(
                conn,
                "find_gist",
                &format!("SELECT {GIST_COLUMNS} FROM gists WHERE snippet_id = ?1"),
                params![snippet_id.get()],
            )?;
            if let Some(existing) = existing.into_iter().next() {
                return Err(Error::DuplicateExternalResource {
                    snippet_id: snippet_id.get(),
                    url: existing.gist_url,
                });
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO gists
                    (snippet_id, gist_id, gist_url, is_public, created_at, status, verified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?5)",
                params![
                    snippet_id.get(),
                    gist.gist_id,
                    gist.gist_url,
                    gist.is_public,
                    format_timestamp(&now),
                    GistStatus::Active.as_str()
                ],
            )
            .map_err(|e| match is_constraint(&e) {
                Some(Constraint::ForeignKey) => Error::NotFound {
                    entity: "snippet",
                    id: snippet_id.get(),
                },
                Some(Constraint::Unique) => Error::DuplicateExternalResource {
                    snippet_id: snippet_id.get(),
                    url: gist.gist_url.clone(),
                },
                _ => Error::storage("insert_gist", e),
            })?;

            Ok(Gist::from_new(conn.last_insert_rowid(), gist, now))
        });

        record_operation_metrics(BACKEND, "gist_insert", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "gist_find", backend = BACKEND, snippet.id = %snippet_id))]
    fn find_by_snippet(&self, snippet_id: SnippetId) -> Result<Vec<Gist>> {
        let start = Instant::now();
        let result = self.read(|conn| {
            Self::query_gists(
                conn,
                "find_gist",
                &format!("SELECT {GIST_COLUMNS} FROM gists WHERE snippet_id = ?1 ORDER BY id"),
                params![snippet_id.get()],
            )
        });

        record_operation_metrics(BACKEND, "gist_find", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "gist_list", backend = BACKEND))]
    fn list(&self) -> Result<Vec<Gist>> {
        let start = Instant::now();
        let result = self.read(|conn| {
            Self::query_gists(
                conn,
                "list_gists",
                &format!("SELECT {GIST_COLUMNS} FROM gists ORDER BY id"),
                [],
            )
        });

        record_operation_metrics(BACKEND, "gist_list", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "gist_update_status", backend = BACKEND, gist.id = id, status = %status))]
    fn update_status(
        &self,
        id: i64,
        status: GistStatus,
        verified_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let start = Instant::now();
        let result = self.transaction(|conn| {
            let updated = conn
                .execute(
                    "UPDATE gists SET status = ?1, verified_at = COALESCE(?2, verified_at)
                     WHERE id = ?3",
                    params![status.as_str(), verified_at.as_ref().map(format_timestamp), id],
                )
                .map_err(|e| Error::storage("update_gist_status", e))?;

            if updated == 0 {
                return Err(Error::NotFound { entity: "gist", id });
            }
            Ok(())
        });

        record_operation_metrics(BACKEND, "gist_update_status", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "gist_delete", backend = BACKEND, gist.id = id))]
    fn delete(&self, id: i64) -> Result<bool> {
        let start = Instant::now();
        let result = self.transaction(|conn| {
            let deleted = conn
                .execute("DELETE FROM gists WHERE id = ?1", params![id])
                .map_err(|e| Error::storage("delete_gist", e))?;
            Ok(deleted > 0)
        });

        record_operation_metrics(BACKEND, "gist_delete", start, status_label(&result));
        result
    }
}
