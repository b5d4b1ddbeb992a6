//! Storage backend traits.

mod gist;
mod snippet;

pub use gist::GistStore;
pub use snippet::SnippetRepository;
