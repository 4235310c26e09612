use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Item, RecommendedItem, Session, SessionUpdate};

use super::AppState;

// Response types

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: &'static str,
    pub catalog_items: usize,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<RecommendedItem>,
}

// Handlers

/// Health check endpoint with engine readiness
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.engine.status().await.as_str(),
        catalog_items: state.catalog.len(),
    })
}

/// Create a new session
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<Session>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(session))
}

/// Get a session by id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Session>> {
    state
        .sessions
        .get(session_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

/// Merge optional preference fields into a session
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(update): Json<SessionUpdate>,
) -> AppResult<Json<Session>> {
    state
        .sessions
        .update(session_id, update)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

/// Delete a session and its cached data
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.sessions.delete(session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Session not found".to_string()))
    }
}

/// Get catalog metadata for an item
pub async fn get_item(
    State(state): State<AppState>,
    Path(article_id): Path<u64>,
) -> AppResult<Json<Item>> {
    state
        .catalog
        .get(article_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", article_id)))
}

/// Set the session's query item, eagerly computing its recommendations
pub async fn set_query_item(
    State(state): State<AppState>,
    Path((session_id, article_id)): Path<(Uuid, u64)>,
) -> AppResult<StatusCode> {
    state
        .sessions
        .set_query_item(&state.engine, &state.catalog, session_id, article_id)
        .await?;
    Ok(StatusCode::OK)
}

/// Get the session's current query item
pub async fn get_query_item(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    state
        .sessions
        .query_item(session_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No query item set for session".to_string()))
}

/// Get cached recommendations for the session's query item
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Json<RecommendationsResponse> {
    let recommendations = state.sessions.recommendations(session_id).await;
    Json(RecommendationsResponse { recommendations })
}
