//! Append-only JSON lines storage backend.
//!
//! Two logs live in the data directory:
//!
//! - `snippets.jsonl`: one [`Snippet`] object per line
//! - `gists.jsonl`: one [`Gist`] object per line
//!
//! On startup both logs are replayed into an in-memory index. A record that
//! appears more than once (after a tag or favourite change) is resolved
//! last-line-wins. `add` and updates append; `delete` rewrites the whole log
//! without the record, which is O(n) per delete.
//!
//! Deleting an unknown snippet id is a logged no-op rather than
//! [`Error::NotFound`]. Every other operation follows the full repository
//! contract.

use crate::models::{Gist, GistStatus, Language, NewGist, NewSnippet, Snippet, SnippetId};
use crate::storage::metrics::{record_operation_metrics, status_label};
use crate::storage::{GistStore, SnippetRepository, acquire_lock, merge_tags, search};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "jsonl";

/// File name of the snippet log.
pub const SNIPPETS_FILE: &str = "snippets.jsonl";
/// File name of the gist log.
pub const GISTS_FILE: &str = "gists.jsonl";

#[derive(Debug)]
struct JsonlState {
    snippets: BTreeMap<SnippetId, Snippet>,
    gists: BTreeMap<i64, Gist>,
    next_id: i64,
    next_gist_id: i64,
}

/// JSON lines storage backend.
#[derive(Debug)]
pub struct JsonlBackend {
    snippets_path: PathBuf,
    gists_path: PathBuf,
    state: Mutex<JsonlState>,
}

impl JsonlBackend {
    /// Opens the logs in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the directory cannot be created
    /// or a log line cannot be parsed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::storage("create_json_dir", e))?;

        let snippets_path = dir.join(SNIPPETS_FILE);
        let gists_path = dir.join(GISTS_FILE);

        let snippets: BTreeMap<SnippetId, Snippet> = replay::<Snippet>(&snippets_path)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let mut gists: BTreeMap<i64, Gist> = replay::<Gist>(&gists_path)?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();
        let next_gist_id = gists.keys().next_back().map_or(1, |id| id + 1);
        gists.retain(|_, gist| {
            let attached = snippets.contains_key(&gist.snippet_id);
            if !attached {
                tracing::warn!(
                    gist.id = %gist.gist_id,
                    snippet.id = %gist.snippet_id,
                    "Skipping gist record of a deleted snippet"
                );
            }
            attached
        });

        let next_id = snippets.keys().next_back().map_or(1, |id| id.get() + 1);

        tracing::debug!(
            snippets = snippets.len(),
            gists = gists.len(),
            path = %dir.display(),
            "Replayed JSON lines logs"
        );

        Ok(Self {
            snippets_path,
            gists_path,
            state: Mutex::new(JsonlState {
                snippets,
                gists,
                next_id,
                next_gist_id,
            }),
        })
    }

    /// Path of the snippet log.
    #[must_use]
    pub fn snippets_path(&self) -> &Path {
        &self.snippets_path
    }

    fn with_state<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut JsonlState) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = {
            let mut state = acquire_lock(&self.state);
            f(&mut state)
        };
        record_operation_metrics(BACKEND, operation, start, status_label(&result));
        result
    }

    fn get_snippet(state: &JsonlState, id: SnippetId) -> Result<Snippet> {
        state.snippets.get(&id).cloned().ok_or(Error::NotFound {
            entity: "snippet",
            id: id.get(),
        })
    }
}

/// Reads every record of a log, last line wins per key. A missing log is empty.
fn replay<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::storage("open_log", e)),
    };

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::storage("read_log", e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            Error::storage(
                "parse_log",
                format!("{}:{}: {e}", path.display(), idx + 1),
            )
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Appends one record as a single line.
fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line =
        serde_json::to_string(record).map_err(|e| Error::storage("serialize_record", e))?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::storage("open_log", e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| Error::storage("append_log", e))?;
    file.sync_data().map_err(|e| Error::storage("sync_log", e))
}

/// Replaces a log with `records` via a temporary file and rename.
fn rewrite<'a, T, I>(path: &Path, records: I) -> Result<()>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let tmp = path.with_extension("jsonl.tmp");
    {
        let file = File::create(&tmp).map_err(|e| Error::storage("create_log", e))?;
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)
                .map_err(|e| Error::storage("serialize_record", e))?;
            writer
                .write_all(b"\n")
                .map_err(|e| Error::storage("write_log", e))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| Error::storage("flush_log", e.error()))?;
        file.sync_all().map_err(|e| Error::storage("sync_log", e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::storage("replace_log", e))
}

impl SnippetRepository for JsonlBackend {
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
            let stored = Snippet::from_new(id, snippet, Utc::now());
            append(&self.snippets_path, &stored)?;

            state.next_id += 1;
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
            if !state.snippets.contains_key(&id) {
                tracing::warn!(snippet.id = %id, "Delete of unknown snippet ignored");
                return Ok(());
            }

            // Gists go first: a failure after this point leaves a snippet
            // without its gist, never a gist without its snippet.
            if state.gists.values().any(|g| g.snippet_id == id) {
                rewrite(
                    &self.gists_path,
                    state.gists.values().filter(|g| g.snippet_id != id),
                )?;
                state.gists.retain(|_, g| g.snippet_id != id);
            }

            rewrite(
                &self.snippets_path,
                state.snippets.values().filter(|s| s.id != id),
            )?;
            state.snippets.remove(&id);
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
            let mut snippet = Self::get_snippet(state, id)?;
            snippet.favorite = !snippet.favorite;
            snippet.updated_at = Utc::now();

            append(&self.snippets_path, &snippet)?;
            let favorite = snippet.favorite;
            state.snippets.insert(id, snippet);
            Ok(favorite)
        })
    }

    #[instrument(skip(self, tags), fields(operation = "tags", backend = BACKEND, snippet.id = %id))]
    fn tags(&self, id: SnippetId, tags: &[&str], remove: bool, sort: bool) -> Result<Snippet> {
        self.with_state("tags", |state| {
            let mut snippet = Self::get_snippet(state, id)?;
            snippet.tags = merge_tags(snippet.tags.as_deref(), tags, remove, sort);
            snippet.updated_at = Utc::now();

            append(&self.snippets_path, &snippet)?;
            state.snippets.insert(id, snippet.clone());
            Ok(snippet)
        })
    }

    fn count(&self) -> Result<usize> {
        Ok(acquire_lock(&self.state).snippets.len())
    }
}

impl GistStore for JsonlBackend {
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
            let stored = Gist::from_new(id, gist, Utc::now());
            append(&self.gists_path, &stored)?;

            state.next_gist_id += 1;
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
            let mut gist = state
                .gists
                .get(&id)
                .cloned()
                .ok_or(Error::NotFound { entity: "gist", id })?;
            gist.status = status;
            if verified_at.is_some() {
                gist.verified_at = verified_at;
            }

            append(&self.gists_path, &gist)?;
            state.gists.insert(id, gist);
            Ok(())
        })
    }

    #[instrument(skip(self), fields(operation = "gist_delete", backend = BACKEND, gist.id = id))]
    fn delete(&self, id: i64) -> Result<bool> {
        self.with_state("gist_delete", |state| {
            if !state.gists.contains_key(&id) {
                return Ok(false);
            }
            rewrite(&self.gists_path, state.gists.values().filter(|g| g.id != id))?;
            state.gists.remove(&id);
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_snippet(title: &str) -> NewSnippet {
        NewSnippet::new(title, "console.log(1)", Language::JavaScript).unwrap()
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count()
    }

    #[test]
    fn test_add_appends_line() {
        let dir = TempDir::new().unwrap();
        let backend = JsonlBackend::new(dir.path()).unwrap();
        backend.add(new_snippet("First")).unwrap();
        backend.add(new_snippet("Second")).unwrap();

        assert_eq!(line_count(backend.snippets_path()), 2);
        let raw = fs::read_to_string(backend.snippets_path()).unwrap();
        assert!(raw.contains("\"title\":\"First\""));
    }

    #[test]
    fn test_replay_on_startup() {
        let dir = TempDir::new().unwrap();
        let id = {
            let backend = JsonlBackend::new(dir.path()).unwrap();
            let added = backend.add(new_snippet("Loop")).unwrap();
            backend.tags(added.id, &["basics"], false, true).unwrap();
            backend.toggle_favourite(added.id).unwrap();
            added.id
        };

        let backend = JsonlBackend::new(dir.path()).unwrap();
        let snippet = backend.get(id).unwrap().unwrap();
        assert_eq!(snippet.tags.as_deref(), Some("basics"));
        assert!(snippet.favorite);
        assert_eq!(backend.count().unwrap(), 1);

        let next = backend.add(new_snippet("Next")).unwrap();
        assert_eq!(next.id.get(), id.get() + 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let dir = TempDir::new().unwrap();
        let backend = JsonlBackend::new(dir.path()).unwrap();
        backend.add(new_snippet("Loop")).unwrap();
        assert!(matches!(
            backend.add(new_snippet("Loop")),
            Err(Error::Duplicate { .. })
        ));
        assert_eq!(line_count(backend.snippets_path()), 1);
    }

    #[test]
    fn test_delete_rewrites_log() {
        let dir = TempDir::new().unwrap();
        let backend = JsonlBackend::new(dir.path()).unwrap();
        let a = backend.add(new_snippet("First")).unwrap();
        backend.add(new_snippet("Second")).unwrap();
        backend.toggle_favourite(a.id).unwrap();
        assert_eq!(line_count(backend.snippets_path()), 3);

        SnippetRepository::delete(&backend, a.id).unwrap();
        assert_eq!(line_count(backend.snippets_path()), 1);

        let reopened = JsonlBackend::new(dir.path()).unwrap();
        assert!(reopened.get(a.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let dir = TempDir::new().unwrap();
        let backend = JsonlBackend::new(dir.path()).unwrap();
        assert!(SnippetRepository::delete(&backend, SnippetId::new(12)).is_ok());
    }

    #[test]
    fn test_malformed_line_is_storage_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SNIPPETS_FILE), "{not json}\n").unwrap();
        let err = JsonlBackend::new(dir.path()).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { ref cause, .. } if cause.contains(":1:")));
    }

    #[test]
    fn test_gists_survive_reopen_and_cascade() {
        let dir = TempDir::new().unwrap();
        let snippet_id = {
            let backend = JsonlBackend::new(dir.path()).unwrap();
            let snippet = backend.add(new_snippet("Loop")).unwrap();
            let gist = backend
                .insert(NewGist {
                    snippet_id: snippet.id,
                    gist_id: "g1".to_string(),
                    gist_url: "https://gist.github.com/u/g1".to_string(),
                    is_public: true,
                })
                .unwrap();
            backend
                .update_status(gist.id, GistStatus::DeletedOnRemote, None)
                .unwrap();
            snippet.id
        };

        let backend = JsonlBackend::new(dir.path()).unwrap();
        let gists = backend.find_by_snippet(snippet_id).unwrap();
        assert_eq!(gists.len(), 1);
        assert_eq!(gists[0].status, GistStatus::DeletedOnRemote);

        SnippetRepository::delete(&backend, snippet_id).unwrap();
        let reopened = JsonlBackend::new(dir.path()).unwrap();
        assert!(GistStore::list(&reopened).unwrap().is_empty());
    }

    fn with_gist(backend: &JsonlBackend, title: &str) -> SnippetId {
        let snippet = backend.add(new_snippet(title)).unwrap();
        backend
            .insert(NewGist {
                snippet_id: snippet.id,
                gist_id: format!("g{}", snippet.id),
                gist_url: format!("https://gist.github.com/u/g{}", snippet.id),
                is_public: true,
            })
            .unwrap();
        snippet.id
    }

    #[test]
    fn test_failed_gist_rewrite_keeps_snippet_and_gist() {
        let dir = TempDir::new().unwrap();
        let backend = JsonlBackend::new(dir.path()).unwrap();
        backend.add(new_snippet("Keep")).unwrap();
        let doomed = with_gist(&backend, "Doomed");
        fs::create_dir(dir.path().join("gists.jsonl.tmp")).unwrap();

        let err = SnippetRepository::delete(&backend, doomed).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        assert!(backend.get(doomed).unwrap().is_some());
        assert_eq!(backend.find_by_snippet(doomed).unwrap().len(), 1);

        fs::remove_dir(dir.path().join("gists.jsonl.tmp")).unwrap();
        let reopened = JsonlBackend::new(dir.path()).unwrap();
        assert!(reopened.get(doomed).unwrap().is_some());
        assert_eq!(reopened.find_by_snippet(doomed).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_snippet_rewrite_leaves_no_orphan_gist() {
        let dir = TempDir::new().unwrap();
        let backend = JsonlBackend::new(dir.path()).unwrap();
        backend.add(new_snippet("Keep")).unwrap();
        let doomed = with_gist(&backend, "Doomed");
        fs::create_dir(dir.path().join("snippets.jsonl.tmp")).unwrap();

        assert!(SnippetRepository::delete(&backend, doomed).is_err());
        assert!(backend.get(doomed).unwrap().is_some());
        assert!(backend.find_by_snippet(doomed).unwrap().is_empty());

        fs::remove_dir(dir.path().join("snippets.jsonl.tmp")).unwrap();
        let reopened = JsonlBackend::new(dir.path()).unwrap();
        assert!(reopened.find_by_snippet(doomed).unwrap().is_empty());
    }

    #[test]
    fn test_reused_id_does_not_inherit_stale_gist() {
        let dir = TempDir::new().unwrap();
        {
            let backend = JsonlBackend::new(dir.path()).unwrap();
            backend.add(new_snippet("Keep")).unwrap();
            with_gist(&backend, "Doomed");
        }
        // A snippet log that lost the record while the gist log kept its line.
        let raw = fs::read_to_string(dir.path().join(SNIPPETS_FILE)).unwrap();
        let kept: Vec<&str> = raw.lines().filter(|l| !l.contains("Doomed")).collect();
        fs::write(dir.path().join(SNIPPETS_FILE), kept.join("\n") + "\n").unwrap();

        let backend = JsonlBackend::new(dir.path()).unwrap();
        let fresh = backend.add(new_snippet("Fresh")).unwrap();
        assert_eq!(fresh.id.get(), 2);
        assert!(backend.find_by_snippet(fresh.id).unwrap().is_empty());
        assert!(GistStore::list(&backend).unwrap().is_empty());
    }
}
