//! Study dataset endpoints

use crate::error::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use metaslim_common::normalize::normalize_for_display;
use metaslim_common::Study;

/// GET /api/studies
///
/// Full dataset, display-normalized, newest first.
pub async fn list_studies(State(state): State<AppState>) -> ApiResult<Json<Vec<Study>>> {
    let studies = state.store.list().await?;
    Ok(Json(normalize_for_display(studies)))
}

/// DELETE /api/studies/{id}
pub async fn delete_study(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/studies
///
/// Clears the entire dataset.
pub async fn delete_all_studies(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.store.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build study routes
pub fn studies_routes() -> Router<AppState> {
    Router::new()
        .route("/api/studies", get(list_studies).delete(delete_all_studies))
        .route("/api/studies/:id", delete(delete_study))
}
