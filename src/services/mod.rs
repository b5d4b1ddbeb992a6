//! Business logic services.
//!
//! Snippet operations are served directly by the
//! [`SnippetRepository`](crate::storage::SnippetRepository) contract; services
//! hold logic that spans storage and a remote system.

mod gist;

pub use gist::GistService;
