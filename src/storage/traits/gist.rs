//! Gist record store trait.

use crate::Result;
use crate::models::{Gist, GistStatus, NewGist, SnippetId};
use chrono::{DateTime, Utc};

/// Local persistence for gist records.
///
/// Implemented by the same backends as
/// [`SnippetRepository`](super::SnippetRepository) so that deleting a snippet
/// also removes its gist record.
pub trait GistStore: Send + Sync {
    /// Records a gist.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) when the snippet
    /// does not exist and with
    /// [`Error::DuplicateExternalResource`](crate::Error::DuplicateExternalResource)
    /// when the snippet already has a gist record.
    fn insert(&self, gist: NewGist) -> Result<Gist>;

    /// Returns all records for a snippet.
    ///
    /// More than one record is a broken invariant; callers report it as a
    /// conflict.
    fn find_by_snippet(&self, snippet_id: SnippetId) -> Result<Vec<Gist>>;

    /// Returns every gist record, ordered by id.
    fn list(&self) -> Result<Vec<Gist>>;

    /// Updates the reconciliation status of a record.
    fn update_status(
        &self,
        id: i64,
        status: GistStatus,
        verified_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Deletes a record by local id. Returns false when nothing was deleted.
    fn delete(&self, id: i64) -> Result<bool>;
}
