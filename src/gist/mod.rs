//! Remote gist service abstraction.
//!
//! The [`GistRemote`] trait covers the three calls the reconciliation logic in
//! [`GistService`](crate::services::GistService) needs: create, probe and
//! delete. [`GitHubGistClient`] implements it against the GitHub REST API.
//!
//! All calls are blocking; callers must not hold a storage transaction open
//! across them.

mod github;

pub use github::GitHubGistClient;

use crate::Result;
use crate::models::Language;
use std::time::Duration;

/// Payload for creating a remote gist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGistRequest {
    /// Gist description (the snippet title).
    pub description: String,
    /// File name inside the gist.
    pub filename: String,
    /// File content (the snippet code).
    pub content: String,
    /// Whether the gist is public.
    pub public: bool,
}

impl CreateGistRequest {
    /// Builds a request for a snippet, naming the file after its title.
    ///
    /// # Examples
    ///
    /// ```
    /// use snipster::Language;
    /// use snipster::gist::CreateGistRequest;
    ///
    /// let req = CreateGistRequest::new("Hello World!", "print(1)", Language::Python, false);
    /// assert_eq!(req.filename, "hello-world.py");
    /// ```
    #[must_use]
    pub fn new(title: &str, code: &str, language: Language, public: bool) -> Self {
        Self {
            description: title.to_string(),
            filename: format!("{}.{}", slugify(title), language.extension()),
            content: code.to_string(),
            public,
        }
    }
}

/// A gist as returned by the remote service on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteGist {
    /// Remote identifier.
    pub id: String,
    /// Browser URL.
    pub html_url: String,
}

/// Result of a remote delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The gist existed and was deleted.
    Deleted,
    /// The gist was already gone (404), which satisfies the delete.
    AlreadyGone,
}

/// Client for a remote gist service.
pub trait GistRemote: Send + Sync {
    /// Creates a gist and returns its identifier and URL.
    fn create(&self, request: &CreateGistRequest) -> Result<RemoteGist>;

    /// Probes whether a gist still exists (`200` true, `404` false).
    ///
    /// Any other outcome is an error, never a guess.
    fn exists(&self, gist_id: &str) -> Result<bool>;

    /// Deletes a gist. A `404` is reported as [`DeleteOutcome::AlreadyGone`].
    fn delete(&self, gist_id: &str) -> Result<DeleteOutcome>;
}

/// HTTP client settings for gist API requests.
#[derive(Debug, Clone, Copy)]
pub struct GistHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for GistHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl GistHttpConfig {
    /// Applies `SNIPSTER_GIST_TIMEOUT_MS` and `SNIPSTER_GIST_CONNECT_TIMEOUT_MS`.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(timeout_ms) = env_u64("SNIPSTER_GIST_TIMEOUT_MS") {
            self.timeout_ms = timeout_ms;
        }
        if let Some(connect_timeout_ms) = env_u64("SNIPSTER_GIST_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = connect_timeout_ms;
        }
        self
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Builds a blocking HTTP client with the configured timeouts.
#[must_use]
pub fn build_http_client(config: GistHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(concat!("snipster/", env!("CARGO_PKG_VERSION")));
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build gist HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Lowercases `title` and collapses everything but ASCII letters and digits
/// into single dashes. Falls back to `"snippet"`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "snippet".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::{CreateGistRequest, DeleteOutcome, GistRemote, RemoteGist};
    use crate::Result;
    use std::sync::Mutex;

    /// Remote stub: every gist it created exists until deleted.
    #[derive(Default)]
    pub(crate) struct StubRemote {
        pub(crate) live: Mutex<Vec<String>>,
    }

    impl GistRemote for StubRemote {
        fn create(&self, request: &CreateGistRequest) -> Result<RemoteGist> {
            let mut live = self.live.lock().unwrap();
            let id = format!("g{}", live.len() + 1);
            live.push(id.clone());
            Ok(RemoteGist {
                html_url: format!("https://gist.github.com/u/{id}#{}", request.filename),
                id,
            })
        }

        fn exists(&self, gist_id: &str) -> Result<bool> {
            Ok(self.live.lock().unwrap().iter().any(|g| g == gist_id))
        }

        fn delete(&self, gist_id: &str) -> Result<DeleteOutcome> {
            let mut live = self.live.lock().unwrap();
            let before = live.len();
            live.retain(|g| g != gist_id);
            Ok(if live.len() < before {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::AlreadyGone
            })
        }
    }
}
