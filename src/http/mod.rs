//! HTTP API served by `snipster serve`.
//!
//! Routes:
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | `/snippets/v1/` | 201 snippet |
//! | `GET` | `/snippets/v1/list/` | 200 snippets |
//! | `GET` | `/snippets/v1/search/?term=&language=` | 200 snippets |
//! | `GET` | `/snippets/v1/{id}` | 200 snippet |
//! | `DELETE` | `/snippets/v1/{id}` | 200 message |
//! | `POST` | `/snippets/v1/{id}/favourite` | 200 `{favorite}` |
//! | `POST` | `/snippets/v1/{id}/tags` | 200 snippet |
//! | `POST` | `/gists/v1/` | 201 gist |
//! | `GET` | `/gists/v1/list/` | 200 gists |
//! | `GET` | `/gists/v1/{snippet_id}` | 200 gist |
//! | `DELETE` | `/gists/v1/{snippet_id}` | 200 message |
//!
//! Repository and gist calls are blocking and run on the blocking pool.

mod error;
mod routes;

pub use error::{ApiError, status_for};

use crate::config::ServerConfig;
use crate::services::GistService;
use crate::storage::SnippetRepository;
use crate::{Error, Result};
use axum::Router;
use axum::http::header;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Snippet repository.
    pub snippets: Arc<dyn SnippetRepository>,
    /// Gist reconciliation service.
    pub gists: GistService,
}

impl AppState {
    /// Creates handler state.
    #[must_use]
    pub fn new(snippets: Arc<dyn SnippetRepository>, gists: GistService) -> Self {
        Self { snippets, gists }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/snippets/v1/", post(routes::create_snippet))
        .route("/snippets/v1/list/", get(routes::list_snippets))
        .route("/snippets/v1/search/", get(routes::search_snippets))
        .route(
            "/snippets/v1/{id}",
            get(routes::get_snippet).delete(routes::delete_snippet),
        )
        .route("/snippets/v1/{id}/favourite", post(routes::toggle_favourite))
        .route("/snippets/v1/{id}/tags", post(routes::update_tags))
        .route("/gists/v1/", post(routes::create_gist))
        .route("/gists/v1/list/", get(routes::list_gists))
        .route(
            "/gists/v1/{snippet_id}",
            get(routes::get_gist).delete(routes::delete_gist),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until interrupted.
///
/// Builds its own runtime; call from synchronous code.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the runtime cannot be created or the
/// address cannot be bound.
pub fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    // The gist client owns a blocking reqwest runtime, which must not be
    // dropped inside async code. Holding a clone keeps the last drop here.
    let keep_alive = state.clone();
    let app = router(state);

    let rt = tokio::runtime::Runtime::new().map_err(|e| Error::operation("create_runtime", e))?;

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(%addr, backend = keep_alive.snippets.backend_name(), "Starting HTTP server");

    let served = rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::operation("bind", format!("{addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down HTTP server");
            })
            .await
            .map_err(|e| Error::operation("serve", e))
    });

    drop(rt);
    drop(keep_alive);
    served
}
