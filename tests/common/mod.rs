//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use snipster::gist::{CreateGistRequest, DeleteOutcome, GistRemote, RemoteGist};
use snipster::{BackendType, Error, Result, Storage, StorageFactory};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;

/// Opens a fresh backend of the given type inside its own temp directory.
///
/// The directory must outlive the storage, so it is returned alongside.
pub fn open(backend: BackendType) -> (TempDir, Storage) {
    let dir = TempDir::new().unwrap();
    let storage = reopen(backend, &dir);
    (dir, storage)
}

/// Opens a backend over an existing directory, as a restarted process would.
pub fn reopen(backend: BackendType, dir: &TempDir) -> Storage {
    StorageFactory::create_with_backend(
        backend,
        &dir.path().join("snippets.db"),
        &dir.path().join("jsonl"),
    )
    .unwrap()
}

/// Programmable stand-in for the GitHub gist API.
#[derive(Default)]
pub struct MockRemote {
    next: AtomicUsize,
    live: Mutex<HashSet<String>>,
    probe_errors: Mutex<HashSet<String>>,
    fail_deletes: AtomicBool,
    fail_creates: AtomicBool,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MockRemote {
    /// Removes a gist on the remote side only (out-of-band deletion).
    pub fn vanish(&self, gist_id: &str) {
        self.live.lock().unwrap().remove(gist_id);
    }

    /// Makes probes of `gist_id` fail with a transport error.
    pub fn fail_probe(&self, gist_id: &str) {
        self.probe_errors.lock().unwrap().insert(gist_id.to_string());
    }

    /// Makes every delete fail with a transport error.
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Makes every create fail with a transport error.
    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    /// Whether the remote still holds `gist_id`.
    pub fn is_live(&self, gist_id: &str) -> bool {
        self.live.lock().unwrap().contains(gist_id)
    }

    /// Number of create calls that reached the remote.
    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl GistRemote for MockRemote {
    fn create(&self, request: &CreateGistRequest) -> Result<RemoteGist> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::external("create_gist", "connect error: connection refused"));
        }
        let id = format!("gist{}", self.next.fetch_add(1, Ordering::SeqCst) + 1);
        self.live.lock().unwrap().insert(id.clone());
        self.created.lock().unwrap().push(request.filename.clone());
        Ok(RemoteGist {
            html_url: format!("https://gist.github.com/tester/{id}"),
            id,
        })
    }

    fn exists(&self, gist_id: &str) -> Result<bool> {
        if self.probe_errors.lock().unwrap().contains(gist_id) {
            return Err(Error::external("verify_gist", "timeout error: deadline elapsed"));
        }
        Ok(self.is_live(gist_id))
    }

    fn delete(&self, gist_id: &str) -> Result<DeleteOutcome> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::external("delete_gist", "GitHub returned 502 Bad Gateway: "));
        }
        self.deleted.lock().unwrap().push(gist_id.to_string());
        if self.live.lock().unwrap().remove(gist_id) {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }
}
