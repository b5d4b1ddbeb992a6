//! Data models for snipster.
//!
//! Snippets are the primary entity; gists are local records of remote mirrors.

mod gist;
mod language;
mod snippet;

pub use gist::{Gist, GistStatus, NewGist};
pub use language::Language;
pub use snippet::{MIN_TITLE_LEN, NewSnippet, Snippet, SnippetId};
