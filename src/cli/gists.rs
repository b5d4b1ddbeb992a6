//! Gist commands.

use super::{emit, render};
use crate::gist::DeleteOutcome;
use crate::models::SnippetId;
use crate::services::GistService;
use crate::{Error, Result};
use std::io::Write;

/// `snipster gist ...` bound to a service and an output stream.
pub struct GistCommand<'a> {
    service: &'a GistService,
    out: &'a mut dyn Write,
}

impl<'a> GistCommand<'a> {
    /// Creates the command set.
    pub fn new(service: &'a GistService, out: &'a mut dyn Write) -> Self {
        Self { service, out }
    }

    /// Publishes a snippet.
    ///
    /// # Errors
    ///
    /// See [`GistService::create`].
    pub fn create(&mut self, snippet_id: i64, public: bool) -> Result<()> {
        let gist = self.service.create(SnippetId::new(snippet_id), public)?;
        emit(
            self.out,
            render::success(format!("Gist created for snippet '{snippet_id}': {}", gist.gist_url)),
        )
    }

    /// Shows the reconciled gist of a snippet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no gist, including when the
    /// remote reports it gone.
    pub fn get(&mut self, snippet_id: i64) -> Result<()> {
        let gist = self
            .service
            .get(SnippetId::new(snippet_id))?
            .ok_or(Error::NotFound {
                entity: "gist for snippet",
                id: snippet_id,
            })?;
        emit(self.out, render::gist_details(&gist))
    }

    /// Lists every gist, reconciling each against the remote.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the records cannot be read.
    pub fn list(&mut self) -> Result<()> {
        let gists = self.service.list()?;
        if gists.is_empty() {
            return emit(self.out, render::notice("No gists found"));
        }
        emit(self.out, render::gist_table(&gists))
    }

    /// Deletes the gist of a snippet.
    ///
    /// # Errors
    ///
    /// See [`GistService::delete`].
    pub fn delete(&mut self, snippet_id: i64) -> Result<()> {
        let message = match self.service.delete(SnippetId::new(snippet_id))? {
            DeleteOutcome::Deleted => format!("Gist for snippet '{snippet_id}' deleted"),
            DeleteOutcome::AlreadyGone => {
                format!("Gist for snippet '{snippet_id}' was already gone, local record removed")
            },
        };
        emit(self.out, render::success(message))
    }
}
