//! Shared `SQLite` infrastructure for the relational backend.
//!
//! - [`connection`]: `Mutex<Connection>` lock acquisition and pragmas
//! - [`sql`]: LIKE escaping
//! - [`rows`]: row decoding and error translation

mod connection;
mod rows;
mod sql;

pub use connection::{acquire_lock, configure_connection};
pub use rows::{
    Constraint, GIST_COLUMNS, SNIPPET_COLUMNS, format_timestamp, gist_from_row, is_constraint,
    snippet_from_row,
};
pub use sql::{contains_pattern, escape_like_wildcards};
