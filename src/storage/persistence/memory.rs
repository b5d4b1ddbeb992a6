//! In-process storage backend.
//!
//! Nothing survives a restart. Ids come from counters owned by the instance,
//! bumped in the same critical section as the insert and never reset, so an id
//! is never handed out twice even after deletes.

use crate::models::{Gist, GistStatus, Language, NewGist, NewSnippet, Snippet, SnippetId};
use crate::storage::metrics::{record_operation_metrics, status_label};
use crate::storage::{GistStore, SnippetRepository, acquire_lock, merge_tags, search};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "memory";

#[derive(Debug)]
struct MemoryState {
    snippets: BTreeMap<SnippetId, Snippet>,
    gists: BTreeMap<i64, Gist>,
    next_id: i64,
    next_gist_id: i64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            snippets: BTreeMap::new(),
            gists: BTreeMap::new(),
            next_id: 1,
            next_gist_id: 1,
        }
    }
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut MemoryState) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = {
            let mut state = acquire_lock(&self.state);
            f(&mut state)
        };
        record_operation_metrics(BACKEND, operation, start, status_label(&result));
        result
    }
}

fn snippet_mut(state: &mut MemoryState, id: SnippetId) -> Result<&mut Snippet> {
    state.snippets.get_mut(&id).ok_or(Error::NotFound {
        entity: "snippet",
        id: id.get(),
    })
}

impl SnippetRepository for InMemoryBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, snippet), fields(operation = "add", backend = BACKEND, snippet.title = %snippet.title))]
    fn add(&self, snippet: NewSnippet) -> Result<Snippet> {
        snippet.validate()?;
        self.with_state("add", |state| {
            if state
                .snippets
                .values()
                .any(|s| s.same_key(&snippet.title, snippet.language))
            {
                return Err(Error::Duplicate {
                    entity: "snippet",
                    key: snippet.key(),
                });
            }

            let id = SnippetId::new(state.next_id);
            state.next_id += 1;

            let stored = Snippet::from_new(id, snippet, Utc::now());
            state.snippets.insert(id, stored.clone());
            Ok(stored)
        })
    }

    #[instrument(skip(self), fields(operation = "list", backend = BACKEND))]
    fn list(&self) -> Result<Vec<Snippet>> {
        self.with_state("list", |state| Ok(state.snippets.values().cloned().collect()))
    }

    #[instrument(skip(self), fields(operation = "get", backend = BACKEND, snippet.id = %id))]
    fn get(&self, id: SnippetId) -> Result<Option<Snippet>> {
        self.with_state("get", |state| Ok(state.snippets.get(&id).cloned()))
    }

    #[instrument(skip(self), fields(operation = "delete", backend = BACKEND, snippet.id = %id))]
    fn delete(&self, id: SnippetId) -> Result<()> {
        self.with_state("delete", |state| {
            if state.snippets.remove(&id).is_none() {
                return Err(Error::NotFound {
                    entity: "snippet",
                    id: id.get(),
                });
            }
            state.gists.retain(|_, g| g.snippet_id != id);
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "search", backend = BACKEND))]
    fn search(&self, term: &str, language: Option<Language>) -> Result<Vec<Snippet>> {
        self.with_state("search", |state| {
            Ok(search::filter(state.snippets.values(), term, language))
        })
    }

    #[instrument(skip(self), fields(operation = "toggle_favourite", backend = BACKEND, snippet.id = %id))]
    fn toggle_favourite(&self, id: SnippetId) -> Result<bool> {
        self.with_state("toggle_favourite", |state| {
            let snippet = snippet_mut(state, id)?;
            snippet.favorite = !snippet.favorite;
            snippet.updated_at = Utc::now();
            Ok(snippet.favorite)
        })
    }

    #[instrument(skip(self, tags), fields(operation = "tags", backend = BACKEND, snippet.id = %id))]
    fn tags(&self, id: SnippetId, tags: &[&str], remove: bool, sort: bool) -> Result<Snippet> {
        self.with_state("tags", |state| {
            let snippet = snippet_mut(state, id)?;
            snippet.tags = merge_tags(snippet.tags.as_deref(), tags, remove, sort);
            snippet.updated_at = Utc::now();
            Ok(snippet.clone())
        })
    }

    fn count(&self) -> Result<usize> {
        Ok(acquire_lock(&self.state).snippets.len())
    }
}

impl GistStore for InMemoryBackend {
    #[instrument(skip(self, gist), fields(operation = "gist_insert", backend = BACKEND, snippet.id = %gist.snippet_id))]
    fn insert(&self, gist: NewGist) -> Result<Gist> {
        self.with_state("gist_insert", |state| {
            if !state.snippets.contains_key(&gist.snippet_id) {
                return Err(Error::NotFound {
                    entity: "snippet",
                    id: gist.snippet_id.get(),
                });
            }
            if let Some(existing) = state.gists.values().find(|g| g.snippet_id == gist.snippet_id) {
                return Err(Error::DuplicateExternalResource {
                    snippet_id: gist.snippet_id.get(),
                    url: existing.gist_url.clone(),
                });
            }

            let id = state.next_gist_id;
            state.next_gist_id += 1;

            let stored = Gist::from_new(id, gist, Utc::now());
            state.gists.insert(id, stored.clone());
            Ok(stored)
        })
    }

    #[instrument(skip(self), fields(operation = "gist_find", backend = BACKEND, snippet.id = %snippet_id))]
    fn find_by_snippet(&self, snippet_id: SnippetId) -> Result<Vec<Gist>> {
        self.with_state("gist_find", |state| {
            Ok(state
                .gists
                .values()
                .filter(|g| g.snippet_id == snippet_id)
                .cloned()
                .collect())
        })
    }

    #[instrument(skip(self), fields(operation = "gist_list", backend = BACKEND))]
    fn list(&self) -> Result<Vec<Gist>> {
        self.with_state("gist_list", |state| Ok(state.gists.values().cloned().collect()))
    }

    #[instrument(skip(self), fields(operation = "gist_update_status", backend = BACKEND, gist.id = id, status = %status))]
    fn update_status(
        &self,
        id: i64,
        status: GistStatus,
        verified_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.with_state("gist_update_status", |state| {
            let gist = state
                .gists
                .get_mut(&id)
                .ok_or(Error::NotFound { entity: "gist", id })?;
            gist.status = status;
            if verified_at.is_some() {
                gist.verified_at = verified_at;
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "gist_delete", backend = BACKEND, gist.id = id))]
    fn delete(&self, id: i64) -> Result<bool> {
        self.with_state("gist_delete", |state| Ok(state.gists.remove(&id).is_some()))
    }
}
