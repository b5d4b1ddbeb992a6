//! Snippet repository trait.

use crate::Result;
use crate::models::{Language, NewSnippet, Snippet, SnippetId};

/// The contract every snippet storage backend satisfies.
///
/// Absence is a value for [`get`](Self::get) and [`search`](Self::search);
/// for [`delete`](Self::delete), [`toggle_favourite`](Self::toggle_favourite)
/// and [`tags`](Self::tags) it is [`Error::NotFound`](crate::Error::NotFound).
/// Medium failures surface as
/// [`Error::StorageUnavailable`](crate::Error::StorageUnavailable).
pub trait SnippetRepository: Send + Sync {
    /// Short backend name used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Persists a new snippet and returns it with its assigned id.
    ///
    /// Fails with [`Error::Duplicate`](crate::Error::Duplicate) when a snippet
    /// with the same title and language exists.
    fn add(&self, snippet: NewSnippet) -> Result<Snippet>;

    /// Returns every snippet, ordered by id.
    fn list(&self) -> Result<Vec<Snippet>>;

    /// Retrieves a snippet by id.
    fn get(&self, id: SnippetId) -> Result<Option<Snippet>>;

    /// Removes a snippet and any gist record attached to it.
    fn delete(&self, id: SnippetId) -> Result<()>;

    /// Case-insensitive substring search over title, code and description.
    ///
    /// Wildcard characters in `term` match literally.
    fn search(&self, term: &str, language: Option<Language>) -> Result<Vec<Snippet>>;

    /// Flips the favourite flag and returns the new value.
    fn toggle_favourite(&self, id: SnippetId) -> Result<bool>;

    /// Merges `tags` into (or removes them from) the snippet's tag list.
    ///
    /// See [`merge_tags`](crate::storage::merge_tags) for the exact rules.
    fn tags(&self, id: SnippetId, tags: &[&str], remove: bool, sort: bool) -> Result<Snippet>;

    /// Returns the number of stored snippets.
    fn count(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }
}
