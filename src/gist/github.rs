//! GitHub gist API client.

use super::{
    CreateGistRequest, DeleteOutcome, GistHttpConfig, GistRemote, RemoteGist, build_http_client,
};
use crate::config::GistConfig;
use crate::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Blocking client for `https://api.github.com/gists`.
pub struct GitHubGistClient {
    api_url: String,
    token: Option<SecretString>,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    description: &'a str,
    public: bool,
    files: BTreeMap<&'a str, FileBody<'a>>,
}

#[derive(Serialize)]
struct FileBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct CreatedGist {
    #[serde(default)]
    id: Option<String>,
    html_url: String,
}

impl GitHubGistClient {
    /// Default API endpoint.
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com/gists";

    /// Creates a client for the default endpoint without a token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            token: None,
            client: build_http_client(GistHttpConfig::default().with_env_overrides()),
        }
    }

    /// Creates a client from the `[gist]` configuration section.
    #[must_use]
    pub fn from_config(config: &GistConfig) -> Self {
        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client: build_http_client(config.http()),
        }
    }

    /// Sets the API endpoint (the gists collection URL).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the access token sent as `Authorization: token <token>`.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets HTTP timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: GistHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Returns the API endpoint.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn gist_url(&self, gist_id: &str) -> String {
        format!("{}/{gist_id}", self.api_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => {
                request.header("Authorization", format!("token {}", token.expose_secret()))
            },
            None => request,
        }
    }

    fn require_token(&self, operation: &str) -> Result<()> {
        if self.token.is_none() {
            return Err(Error::external(
                operation,
                "GitHub token not configured (set SNIPSTER_GITHUB_TOKEN)",
            ));
        }
        Ok(())
    }

    fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let result = request.send().map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connect"
            } else if e.is_request() {
                "request"
            } else {
                "unknown"
            };
            tracing::error!(
                operation,
                error = %e,
                error_kind,
                is_timeout = e.is_timeout(),
                is_connect = e.is_connect(),
                "Gist API request failed"
            );
            let cause = if e.is_connect() {
                format!("cannot connect to GitHub: {e}")
            } else {
                format!("{error_kind} error: {e}")
            };
            Error::external(operation, cause)
        });

        let status = match &result {
            Ok(response) => response.status().as_str().to_string(),
            Err(_) => "transport_error".to_string(),
        };
        metrics::counter!(
            "gist_remote_requests_total",
            "operation" => operation,
            "status" => status
        )
        .increment(1);

        result
    }

    fn unexpected(operation: &str, response: Response) -> Error {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        tracing::error!(operation, status = %status, body = %body, "Gist API returned an error");
        Error::external(operation, format!("GitHub returned {status}: {body}"))
    }
}

impl Default for GitHubGistClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the gist id from a creation response, falling back to the last
/// path segment of `html_url`.
fn remote_id(id: Option<String>, html_url: &str) -> Option<String> {
    id.filter(|id| !id.is_empty()).or_else(|| {
        html_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty() && !segment.contains(':'))
            .map(str::to_string)
    })
}

impl GistRemote for GitHubGistClient {
    fn create(&self, request: &CreateGistRequest) -> Result<RemoteGist> {
        const OP: &str = "create_gist";
        self.require_token(OP)?;

        let body = CreateBody {
            description: &request.description,
            public: request.public,
            files: BTreeMap::from([(
                request.filename.as_str(),
                FileBody {
                    content: &request.content,
                },
            )]),
        };

        tracing::info!(filename = %request.filename, public = request.public, "Creating gist");
        let response = self.send(OP, self.authorized(self.client.post(&self.api_url)).json(&body))?;
        if !response.status().is_success() {
            return Err(Self::unexpected(OP, response));
        }

        let created: CreatedGist = response
            .json()
            .map_err(|e| Error::external(OP, format!("invalid response: {e}")))?;
        let id = remote_id(created.id, &created.html_url)
            .ok_or_else(|| Error::external(OP, "response carried no gist id"))?;

        Ok(RemoteGist {
            id,
            html_url: created.html_url,
        })
    }

    fn exists(&self, gist_id: &str) -> Result<bool> {
        const OP: &str = "verify_gist";
        let response = self.send(OP, self.authorized(self.client.get(self.gist_url(gist_id))))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(Self::unexpected(OP, response)),
        }
    }

    fn delete(&self, gist_id: &str) -> Result<DeleteOutcome> {
        const OP: &str = "delete_gist";
        self.require_token(OP)?;

        let response =
            self.send(OP, self.authorized(self.client.delete(self.gist_url(gist_id))))?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::info!(gist.id = gist_id, "Gist already deleted on GitHub");
                Ok(DeleteOutcome::AlreadyGone)
            },
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(Self::unexpected(OP, response)),
        }
    }
}
