//! Route handlers.

use super::{ApiError, AppState};
use crate::gist::DeleteOutcome;
use crate::models::{Gist, Language, NewSnippet, Snippet, SnippetId};
use crate::{Error, Result};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Runs blocking repository or gist work off the async workers.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::operation("spawn_blocking", e))?
        .map_err(ApiError::from)
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    term: String,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TagsRequest {
    tags: Vec<String>,
    #[serde(default)]
    remove: bool,
    #[serde(default = "default_true")]
    sort: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct GistCreate {
    snippet_id: i64,
    #[serde(default = "default_true")]
    is_public: bool,
}

const fn default_true() -> bool {
    true
}

pub(super) async fn create_snippet(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewSnippet>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Snippet>)> {
    let Json(snippet) = payload?;
    let repo = Arc::clone(&state.snippets);
    let created = blocking(move || repo.add(snippet)).await?;
    tracing::debug!(snippet.id = %created.id, title = %created.title, "Snippet created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn list_snippets(State(state): State<AppState>) -> ApiResult<Json<Vec<Snippet>>> {
    let repo = Arc::clone(&state.snippets);
    blocking(move || repo.list()).await.map(Json)
}

pub(super) async fn search_snippets(
    State(state): State<AppState>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Snippet>>> {
    let Query(query) = query?;
    let language = query
        .language
        .as_deref()
        .map(|name| {
            Language::parse(name)
                .ok_or_else(|| Error::InvalidInput(format!("unsupported language '{name}'")))
        })
        .transpose()?;

    let repo = Arc::clone(&state.snippets);
    blocking(move || repo.search(&query.term, language))
        .await
        .map(Json)
}

pub(super) async fn get_snippet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Snippet>> {
    let repo = Arc::clone(&state.snippets);
    let snippet = blocking(move || repo.get(SnippetId::new(id))).await?;
    snippet
        .map(Json)
        .ok_or_else(|| Error::NotFound { entity: "snippet", id }.into())
}

pub(super) async fn delete_snippet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let repo = Arc::clone(&state.snippets);
    blocking(move || repo.delete(SnippetId::new(id))).await?;
    Ok(Json(json!({ "message": "Snippet deleted successfully" })))
}

pub(super) async fn toggle_favourite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let repo = Arc::clone(&state.snippets);
    let favorite = blocking(move || repo.toggle_favourite(SnippetId::new(id))).await?;
    Ok(Json(json!({ "id": id, "favorite": favorite })))
}

pub(super) async fn update_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<TagsRequest>, JsonRejection>,
) -> ApiResult<Json<Snippet>> {
    let Json(request) = payload?;
    let repo = Arc::clone(&state.snippets);
    blocking(move || {
        let tags: Vec<&str> = request.tags.iter().map(String::as_str).collect();
        repo.tags(SnippetId::new(id), &tags, request.remove, request.sort)
    })
    .await
    .map(Json)
}

pub(super) async fn create_gist(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GistCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Gist>)> {
    let Json(request) = payload?;
    let service = state.gists.clone();
    let gist = blocking(move || {
        service.create(SnippetId::new(request.snippet_id), request.is_public)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(gist)))
}

pub(super) async fn list_gists(State(state): State<AppState>) -> ApiResult<Json<Vec<Gist>>> {
    let service = state.gists.clone();
    blocking(move || service.list()).await.map(Json)
}

pub(super) async fn get_gist(
    State(state): State<AppState>,
    Path(snippet_id): Path<i64>,
) -> ApiResult<Json<Gist>> {
    let service = state.gists.clone();
    let gist = blocking(move || service.get(SnippetId::new(snippet_id))).await?;
    gist.map(Json).ok_or_else(|| {
        Error::NotFound {
            entity: "gist for snippet",
            id: snippet_id,
        }
        .into()
    })
}

pub(super) async fn delete_gist(
    State(state): State<AppState>,
    Path(snippet_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let service = state.gists.clone();
    let outcome = blocking(move || service.delete(SnippetId::new(snippet_id))).await?;
    let message = match outcome {
        DeleteOutcome::Deleted => "Gist deleted successfully",
        DeleteOutcome::AlreadyGone => "Gist was already deleted on the remote, local record removed",
    };
    Ok(Json(json!({ "message": message })))
}
