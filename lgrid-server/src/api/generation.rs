//! Generation endpoints
//!
//! Inputs are copied out of the workspace and the lock is released before
//! calling the generator; results are applied afterwards under a fresh lock.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use lgrid_common::events::{GenerationStage, LgridEvent};
use lgrid_common::WizardStep;

use super::open_workspace;
use super::workspace::WorkspaceView;
use crate::services::GenerationError;
use crate::{ApiError, ApiResult, AppState};

/// POST /api/frameworks/:id/research
///
/// Replaces the research sections and map hint, then advances to step 2.
pub async fn generate_research(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let profile = workspace.lock().await.framework().research_input.clone();

    let missing = profile.missing_required();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!("Missing required fields: {}", missing.join(", "))));
    }

    info!(framework_id = %id, name = %profile.name, "Generating research");
    let output = match state.generator.research(&profile).await {
        Ok(output) => output,
        Err(e) => return Err(generation_failed(&state, id, GenerationStage::Research, e).await),
    };

    let mut ws = workspace.lock().await;
    ws.mutate(|framework| {
        framework.research_sections = output.sections;
        framework.map_data = output.map_data;
        framework.current_step = WizardStep::Strategy;
    });
    generation_completed(&state, id, GenerationStage::Research);
    Ok(Json(WorkspaceView::of(&ws)))
}

/// POST /api/frameworks/:id/opposition-research
pub async fn generate_opposition_research(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let profile = workspace.lock().await.framework().research_input.clone();

    let oppositions = profile.named_oppositions();
    if oppositions.is_empty() {
        return Err(ApiError::BadRequest("No named oppositions to research".to_string()));
    }

    info!(framework_id = %id, count = oppositions.len(), "Generating opposition research");
    let briefs = match state.generator.opposition_research(&profile, &oppositions).await {
        Ok(briefs) => briefs,
        Err(e) => return Err(generation_failed(&state, id, GenerationStage::OppositionResearch, e).await),
    };

    let mut ws = workspace.lock().await;
    ws.mutate(|framework| framework.opposition_research = briefs);
    generation_completed(&state, id, GenerationStage::OppositionResearch);
    Ok(Json(WorkspaceView::of(&ws)))
}

/// POST /api/frameworks/:id/strategy
///
/// Replaces the wells with generated tiles; the grid is kept.
pub async fn generate_strategy(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let (profile, sections) = {
        let ws = workspace.lock().await;
        let framework = ws.framework();
        (framework.research_input.clone(), framework.research_sections.clone())
    };

    if sections.is_empty() {
        return Err(ApiError::BadRequest("Research must be generated before strategy".to_string()));
    }

    info!(framework_id = %id, "Generating strategy tiles");
    let wells = match state.generator.strategy(&profile, &sections).await {
        Ok(wells) => wells,
        Err(e) => return Err(generation_failed(&state, id, GenerationStage::Strategy, e).await),
    };

    let mut ws = workspace.lock().await;
    let skipped = ws.mutate(|framework| framework.board.replace_wells(wells));
    if skipped > 0 {
        info!(framework_id = %id, skipped, "Generated tiles already on the grid were skipped");
    }
    generation_completed(&state, id, GenerationStage::Strategy);
    Ok(Json(WorkspaceView::of(&ws)))
}

fn generation_completed(state: &AppState, framework_id: Uuid, stage: GenerationStage) {
    state.event_bus.emit_lossy(LgridEvent::GenerationCompleted {
        framework_id,
        stage,
        timestamp: Utc::now(),
    });
}

async fn generation_failed(state: &AppState, framework_id: Uuid, stage: GenerationStage, err: GenerationError) -> ApiError {
    warn!(%framework_id, stage = stage.as_str(), "Generation failed: {}", err);
    state
        .record_error(format!("{} generation failed: {}", stage.as_str(), err))
        .await;
    state.event_bus.emit_lossy(LgridEvent::GenerationFailed {
        framework_id,
        stage,
        message: err.to_string(),
        timestamp: Utc::now(),
    });
    ApiError::from(err)
}

pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/frameworks/:id/research", post(generate_research))
        .route("/api/frameworks/:id/opposition-research", post(generate_opposition_research))
        .route("/api/frameworks/:id/strategy", post(generate_strategy))
}
