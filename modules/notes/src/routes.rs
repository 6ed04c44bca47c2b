//! Axum route handlers for the notes REST API.

use crate::error::ApiError;
use crate::store::{NoteStore, SearchFilter};
use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch};
use notes_types::*;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

#[derive(Default)]
pub struct AppState {
    pub store: NoteStore,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/search", get(search_notes))
        .route(
            "/notes/:id",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/notes/:id/archive", patch(archive_note))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(access_log))
        .layer(CorsLayer::permissive())
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        log::warn!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed_ms);
    } else {
        log::info!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed_ms);
    }
    response
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let msg = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(msg).into_response()
}

// GET /
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// POST /notes
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NoteCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let Json(req) = payload?;
    let note = state.store.create(req)?;
    log::info!("[NOTES] Created note {}", note.id);
    Ok((StatusCode::CREATED, Json(note)))
}

// GET /notes
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query?;
    let notes = state.store.list(query.archived);
    log::debug!("[NOTES] Listed {} notes (archived={:?})", notes.len(), query.archived);
    Ok(Json(notes))
}

// GET /notes/search
pub async fn search_notes(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query?;
    let filter = SearchFilter {
        q: query.q,
        tag: query.tag,
        archived: query.archived,
    };
    let notes = state.store.search(&filter);
    log::debug!("[NOTES] Search {:?} matched {} notes", filter, notes.len());
    Ok(Json(notes))
}

// GET /notes/:id
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.store.get(id)?))
}

// PUT /notes/:id
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<NoteUpdate>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let note = state.store.update(id, patch)?;
    log::info!("[NOTES] Updated note {}", id);
    Ok(Json(note))
}

// DELETE /notes/:id
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.store.delete(id)?;
    log::info!("[NOTES] Deleted note {}", id);
    Ok(StatusCode::NO_CONTENT)
}

// PATCH /notes/:id/archive?archived=bool
pub async fn archive_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ArchiveQuery>, QueryRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    let Query(query) = query?;
    let note = state.store.set_archived(id, query.archived)?;
    log::info!("[NOTES] Set archived={} on note {}", query.archived, id);
    Ok(Json(note))
}
