//! Read-only share links

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use lgrid_common::db::shares;
use lgrid_common::events::LgridEvent;
use lgrid_common::share::{self, SharedSession, SharedSnapshot};

use super::open_workspace;
use crate::{ApiError, ApiResult, AppState};

/// Attempts at finding an unused share id before giving up
const SHARE_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCreated {
    pub id: String,
    pub share_url: String,
}

/// POST /api/frameworks/:id/share
pub async fn create_share(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ShareCreated>)> {
    let workspace = open_workspace(&state, id).await?;
    let data = SharedSnapshot::of(workspace.lock().await.framework());

    let mut share_id = None;
    for _ in 0..SHARE_ID_ATTEMPTS {
        let candidate = share::generate_share_id();
        if shares::load_share(&state.db, &candidate).await?.is_none() {
            share_id = Some(candidate);
            break;
        }
    }
    let share_id = share_id.ok_or_else(|| ApiError::Internal("Could not allocate a share id".to_string()))?;

    let session = SharedSession {
        id: share_id.clone(),
        framework_id: Some(id),
        data,
    };
    shares::insert_share(&state.db, &session).await?;
    info!(framework_id = %id, share_id = %share_id, "Share created");

    state.event_bus.emit_lossy(LgridEvent::ShareCreated {
        framework_id: id,
        share_id: share_id.clone(),
        timestamp: Utc::now(),
    });

    Ok((
        StatusCode::CREATED,
        Json(ShareCreated {
            share_url: share::share_url(&state.settings.public_base_url, &share_id),
            id: share_id,
        }),
    ))
}

/// GET /api/share/:id
pub async fn get_share(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<SharedSnapshot>> {
    let session = load(&state, &id).await?;
    Ok(Json(session.data))
}

/// GET /api/share/:id/playbook.md
pub async fn get_playbook(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let session = load(&state, &id).await?;
    let file_name = share::playbook_file_name(&session.data.research_input.name);
    let body = share::render_markdown(&session.data);

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    ))
}

async fn load(state: &AppState, id: &str) -> ApiResult<SharedSession> {
    shares::load_share(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shared session {}", id)))
}

pub fn share_routes() -> Router<AppState> {
    Router::new()
        .route("/api/frameworks/:id/share", post(create_share))
        .route("/api/share/:id", get(get_share))
        .route("/api/share/:id/playbook.md", get(get_playbook))
}
