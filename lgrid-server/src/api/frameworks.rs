//! Framework record CRUD
//!
//! `PATCH` is a last-write-wins partial update of the stored shape. It goes
//! through the live workspace so open editors and the record never diverge;
//! status and title are recomputed from the merged state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use lgrid_common::db::frameworks;
use lgrid_common::framework::{FrameworkPatch, FrameworkSummary};
use lgrid_common::FrameworkRecord;

use super::open_workspace;
use crate::{ApiError, ApiResult, AppState};

/// GET /api/frameworks
pub async fn list_frameworks(State(state): State<AppState>) -> ApiResult<Json<Vec<FrameworkSummary>>> {
    Ok(Json(frameworks::list_frameworks(&state.db).await?))
}

/// POST /api/frameworks
pub async fn create_framework(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<FrameworkRecord>)> {
    let record = frameworks::create_framework(&state.db).await?;
    info!(framework_id = %record.id, "Framework created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/frameworks/:id
pub async fn get_framework(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FrameworkRecord>> {
    state
        .workspaces
        .snapshot(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Framework {}", id)))
}

/// PATCH /api/frameworks/:id
pub async fn patch_framework(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<FrameworkPatch>,
) -> ApiResult<Json<FrameworkRecord>> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;

    // Validate on a copy so a bad patch leaves the workspace untouched
    let mut candidate = ws.framework().clone();
    patch.apply(&mut candidate);
    candidate.board.check_invariants()?;

    ws.mutate(|framework| *framework = candidate);
    Ok(Json(ws.record()))
}

/// DELETE /api/frameworks/:id
pub async fn delete_framework(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    if !state.workspaces.delete(id).await? {
        return Err(ApiError::NotFound(format!("Framework {}", id)));
    }
    info!(framework_id = %id, "Framework deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn framework_routes() -> Router<AppState> {
    Router::new()
        .route("/api/frameworks", get(list_frameworks).post(create_framework))
        .route(
            "/api/frameworks/:id",
            get(get_framework).patch(patch_framework).delete(delete_framework),
        )
}
