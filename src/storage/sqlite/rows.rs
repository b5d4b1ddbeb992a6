//! Row decoding and error translation for the `SQLite` backend.

use crate::models::{Gist, GistStatus, Language, Snippet, SnippetId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{ErrorCode, Row, ffi};

/// Column list matching [`snippet_from_row`].
pub const SNIPPET_COLUMNS: &str =
    "id, title, code, description, language, tags, favorite, created_at, updated_at";

/// Column list matching [`gist_from_row`].
pub const GIST_COLUMNS: &str =
    "id, snippet_id, gist_id, gist_url, is_public, created_at, status, verified_at";

/// Which constraint a failed statement violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// `UNIQUE` or `PRIMARY KEY`.
    Unique,
    /// `FOREIGN KEY`.
    ForeignKey,
    /// Any other constraint (`NOT NULL`, `CHECK`).
    Other,
}

/// Classifies a constraint violation. Returns `None` for any other error.
#[must_use]
pub fn is_constraint(err: &rusqlite::Error) -> Option<Constraint> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Constraint::Unique
                },
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Constraint::ForeignKey,
                _ => Constraint::Other,
            })
        },
        _ => None,
    }
}

/// Formats a timestamp for storage. Full precision, UTC, RFC 3339.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decodes a snippet selected with [`SNIPPET_COLUMNS`].
pub fn snippet_from_row(row: &Row<'_>) -> rusqlite::Result<Snippet> {
    let language: String = row.get(4)?;
    let language = Language::parse(&language).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown language '{language}'").into(),
        )
    })?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Snippet {
        id: SnippetId::new(row.get(0)?),
        title: row.get(1)?,
        code: row.get(2)?,
        description: row.get(3)?,
        language,
        tags: row.get(5)?,
        favorite: row.get(6)?,
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
    })
}

/// Decodes a gist selected with [`GIST_COLUMNS`].
pub fn gist_from_row(row: &Row<'_>) -> rusqlite::Result<Gist> {
    let created_at: String = row.get(5)?;
    let status: String = row.get(6)?;
    let verified_at: Option<String> = row.get(7)?;

    Ok(Gist {
        id: row.get(0)?,
        snippet_id: SnippetId::new(row.get(1)?),
        gist_id: row.get(2)?,
        gist_url: row.get(3)?,
        is_public: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
        status: GistStatus::parse(&status),
        verified_at: verified_at
            .as_deref()
            .map(|raw| parse_timestamp(7, raw))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_timestamp_roundtrip_keeps_precision() {
        let now = Utc::now();
        let raw = format_timestamp(&now);
        assert_eq!(parse_timestamp(0, &raw).unwrap(), now);
    }

    #[test]
    fn test_is_constraint_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        assert_eq!(is_constraint(&err), Some(Constraint::Unique));
    }

    #[test]
    fn test_is_constraint_foreign_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE p (id INTEGER PRIMARY KEY);
             CREATE TABLE c (pid INTEGER REFERENCES p(id));",
        )
        .unwrap();
        let err = conn.execute("INSERT INTO c VALUES (42)", []).unwrap_err();
        assert_eq!(is_constraint(&err), Some(Constraint::ForeignKey));
    }

    #[test]
    fn test_is_constraint_other_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute("SELECT * FROM missing", []).unwrap_err();
        assert_eq!(is_constraint(&err), None);
    }
}
