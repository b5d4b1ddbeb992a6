//! Gist reconciliation service.
//!
//! Keeps local gist records in step with the remote service:
//!
//! - `create` talks to the remote first and records locally only on success.
//!   If the local write then fails, the remote gist is deleted again so no
//!   orphan is left behind.
//! - `get` probes the remote. A gist that is gone has its local record removed.
//! - `list` probes every record. A gone gist is marked
//!   [`GistStatus::DeletedOnRemote`]; a failing probe is logged and leaves that
//!   record untouched.
//! - `delete` removes the remote gist first (a 404 counts as done) and the
//!   local record second.
//!
//! A probe that errors is never treated as "gone": the stored record is
//! returned unchanged by both `get` and `list`.

use crate::gist::{CreateGistRequest, DeleteOutcome, GistRemote};
use crate::models::{Gist, GistStatus, Language, NewGist, Snippet, SnippetId};
use crate::storage::{GistStore, SnippetRepository, Storage};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

const MISSING_GIST: &str = "gist for snippet";

/// Service managing gist mirrors of snippets.
#[derive(Clone)]
pub struct GistService {
    snippets: Arc<dyn SnippetRepository>,
    gists: Arc<dyn GistStore>,
    remote: Arc<dyn GistRemote>,
}

impl GistService {
    /// Creates a service over a constructed storage backend.
    #[must_use]
    pub fn new(storage: &Storage, remote: Arc<dyn GistRemote>) -> Self {
        Self::from_parts(
            Arc::clone(&storage.snippets),
            Arc::clone(&storage.gists),
            remote,
        )
    }

    /// Creates a service from individual components.
    #[must_use]
    pub fn from_parts(
        snippets: Arc<dyn SnippetRepository>,
        gists: Arc<dyn GistStore>,
        remote: Arc<dyn GistRemote>,
    ) -> Self {
        Self {
            snippets,
            gists,
            remote,
        }
    }

    /// Publishes a stored snippet as a gist.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the snippet does not exist
    /// - [`Error::DuplicateExternalResource`] if a gist already mirrors it
    /// - [`Error::ExternalService`] if the remote call fails
    pub fn create(&self, snippet_id: SnippetId, is_public: bool) -> Result<Gist> {
        let snippet = self.require_snippet(snippet_id)?;
        self.publish(
            snippet_id,
            &snippet.code,
            &snippet.title,
            snippet.language,
            is_public,
        )
    }

    /// Publishes the given content as the gist of `snippet_id`.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create). If the local record cannot be written
    /// after the remote gist was created, the remote gist is deleted again and
    /// the storage error is returned.
    pub fn create_with_content(
        &self,
        snippet_id: SnippetId,
        code: &str,
        title: &str,
        language: Language,
        is_public: bool,
    ) -> Result<Gist> {
        self.require_snippet(snippet_id)?;
        self.publish(snippet_id, code, title, language, is_public)
    }

    #[instrument(skip(self, code, title), fields(operation = "gist_create", snippet.id = %snippet_id))]
    fn publish(
        &self,
        snippet_id: SnippetId,
        code: &str,
        title: &str,
        language: Language,
        is_public: bool,
    ) -> Result<Gist> {
        if let Some(existing) = self.get(snippet_id)? {
            return Err(Error::DuplicateExternalResource {
                snippet_id: snippet_id.get(),
                url: existing.gist_url,
            });
        }

        let request = CreateGistRequest::new(title, code, language, is_public);
        let remote = self.remote.create(&request)?;
        tracing::info!(gist.id = %remote.id, url = %remote.html_url, "Created remote gist");

        let recorded = self.gists.insert(NewGist {
            snippet_id,
            gist_id: remote.id.clone(),
            gist_url: remote.html_url.clone(),
            is_public,
        });

        match recorded {
            Ok(gist) => Ok(gist),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    gist.id = %remote.id,
                    "Failed to record gist locally, deleting remote copy"
                );
                match self.remote.delete(&remote.id) {
                    Ok(_) => {
                        metrics::counter!("gist_compensating_deletes_total", "status" => "success")
                            .increment(1);
                    },
                    Err(cleanup) => {
                        metrics::counter!("gist_compensating_deletes_total", "status" => "error")
                            .increment(1);
                        tracing::error!(
                            error = %cleanup,
                            url = %remote.html_url,
                            "Remote gist left orphaned"
                        );
                    },
                }
                Err(err)
            },
        }
    }

    /// Returns the reconciled gist of a snippet.
    ///
    /// When the remote reports the gist gone, the local record is deleted and
    /// `None` is returned. When the probe itself fails, the stored record is
    /// returned as-is.
    ///
    /// # Errors
    ///
    /// - [`Error::Conflict`] if more than one record exists for the snippet
    /// - Storage errors from reading or updating the record
    #[instrument(skip(self), fields(operation = "gist_get", snippet.id = %snippet_id))]
    pub fn get(&self, snippet_id: SnippetId) -> Result<Option<Gist>> {
        let Some(gist) = self.single_record(snippet_id)? else {
            return Ok(None);
        };

        match self.remote.exists(&gist.gist_id) {
            Ok(true) => {
                let now = Utc::now();
                self.gists
                    .update_status(gist.id, GistStatus::Active, Some(now))?;
                Ok(Some(Gist {
                    status: GistStatus::Active,
                    verified_at: Some(now),
                    ..gist
                }))
            },
            Ok(false) => {
                tracing::warn!(
                    gist.id = %gist.gist_id,
                    "Gist deleted on remote, removing local record"
                );
                self.gists.delete(gist.id)?;
                Ok(None)
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    gist.id = %gist.gist_id,
                    "Failed to reconcile gist"
                );
                Ok(Some(gist))
            },
        }
    }

    /// Lists every gist record, reconciling each against the remote.
    ///
    /// A failure while reconciling one record is logged and leaves that record
    /// unchanged; the others are still reconciled.
    ///
    /// # Errors
    ///
    /// Returns a storage error only if the records cannot be listed.
    #[instrument(skip(self), fields(operation = "gist_list"))]
    pub fn list(&self) -> Result<Vec<Gist>> {
        let records = self.gists.list()?;
        Ok(records.into_iter().map(|gist| self.reconcile(gist)).collect())
    }

    /// Deletes the gist of a snippet, remote first.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if there is no local record
    /// - [`Error::Conflict`] if more than one record exists
    /// - [`Error::ExternalService`] if the remote delete fails; local state is
    ///   left untouched
    /// - [`Error::LocalCleanupFailed`] if the remote gist is gone but the local
    ///   record could not be removed
    #[instrument(skip(self), fields(operation = "gist_delete", snippet.id = %snippet_id))]
    pub fn delete(&self, snippet_id: SnippetId) -> Result<DeleteOutcome> {
        let gist = self.single_record(snippet_id)?.ok_or(Error::NotFound {
            entity: MISSING_GIST,
            id: snippet_id.get(),
        })?;

        let outcome = self.remote.delete(&gist.gist_id)?;

        match self.gists.delete(gist.id) {
            Ok(_) => Ok(outcome),
            Err(err) => {
                tracing::error!(error = %err, "Remote gist deleted but local cleanup failed");
                Err(Error::LocalCleanupFailed {
                    snippet_id: snippet_id.get(),
                    cause: err.to_string(),
                })
            },
        }
    }

    fn require_snippet(&self, snippet_id: SnippetId) -> Result<Snippet> {
        self.snippets.get(snippet_id)?.ok_or(Error::NotFound {
            entity: "snippet",
            id: snippet_id.get(),
        })
    }

    fn single_record(&self, snippet_id: SnippetId) -> Result<Option<Gist>> {
        let mut records = self.gists.find_by_snippet(snippet_id)?;
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            matches => Err(Error::Conflict {
                entity: "gist",
                id: snippet_id.get(),
                matches,
            }),
        }
    }

    fn reconcile(&self, gist: Gist) -> Gist {
        let (status, verified_at) = match self.remote.exists(&gist.gist_id) {
            Ok(true) => (GistStatus::Active, Some(Utc::now())),
            Ok(false) => (GistStatus::DeletedOnRemote, None),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    gist.id = %gist.gist_id,
                    snippet.id = %gist.snippet_id,
                    "Failed to reconcile gist"
                );
                return gist;
            },
        };

        match self.gists.update_status(gist.id, status, verified_at) {
            Ok(()) => Gist {
                status,
                verified_at: verified_at.or(gist.verified_at),
                ..gist
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    gist.id = %gist.gist_id,
                    "Failed to reconcile gist"
                );
                gist
            },
        }
    }
}
