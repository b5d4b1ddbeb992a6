//! Storage backend implementations.

mod jsonl;
mod memory;
mod sqlite;

pub use jsonl::{GISTS_FILE, JsonlBackend, SNIPPETS_FILE};
pub use memory::InMemoryBackend;
pub use sqlite::SqliteBackend;
