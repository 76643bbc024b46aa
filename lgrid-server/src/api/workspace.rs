//! Live workspace endpoints
//!
//! Each handler locks the workspace, applies one operation to completion,
//! and returns the resulting view. Placement rejections (full quadrant,
//! duplicate drop, unknown tile, absent removal) are reported as outcome
//! values with status 200 and leave the workspace unchanged.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use lgrid_common::entity::{OppositionField, ResearchInput};
use lgrid_common::events::{LgridEvent, SaveStatus};
use lgrid_common::placement::{MoveOutcome, RemoveOutcome};
use lgrid_common::research::{update_opposition_research, update_section, ResearchSectionId};
use lgrid_common::{FrameworkRecord, QuadrantKey, Tile, WizardStep};

use super::open_workspace;
use crate::workspace::Workspace;
use crate::{ApiError, ApiResult, AppState};

/// Record plus derived editing state
#[derive(Debug, Serialize)]
pub struct WorkspaceView {
    #[serde(flatten)]
    pub record: FrameworkRecord,
    pub accessible_steps: Vec<WizardStep>,
    pub save_status: SaveStatus,
}

impl WorkspaceView {
    pub fn of(workspace: &Workspace) -> Self {
        Self {
            record: workspace.record(),
            accessible_steps: WizardStep::accessible_steps(workspace.framework().progress()),
            save_status: workspace.save_status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlacementResponse<T> {
    pub result: T,
    pub workspace: WorkspaceView,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse<T> {
    #[serde(flatten)]
    pub created: T,
    pub workspace: WorkspaceView,
}

#[derive(Debug, Serialize)]
pub struct CreatedId {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SaveStatusResponse {
    pub framework_id: Uuid,
    pub status: SaveStatus,
}

#[derive(Debug, Deserialize)]
pub struct OppositionUpdate {
    pub field: OppositionField,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentUpdate {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct NewTile {
    pub quadrant: QuadrantKey,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TextUpdate {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceTile {
    pub tile_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: WizardStep,
}

/// GET /api/frameworks/:id/workspace
pub async fn get_workspace(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let ws = workspace.lock().await;
    Ok(Json(WorkspaceView::of(&ws)))
}

/// PUT /api/frameworks/:id/input
pub async fn put_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ResearchInput>,
) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    ws.mutate(|framework| framework.research_input = input);
    Ok(Json(WorkspaceView::of(&ws)))
}

/// POST /api/frameworks/:id/oppositions
pub async fn add_opposition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<CreatedResponse<CreatedId>>)> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    let opposition_id = ws.mutate(|framework| framework.research_input.add_opposition());
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            created: CreatedId { id: opposition_id },
            workspace: WorkspaceView::of(&ws),
        }),
    ))
}

/// PATCH /api/frameworks/:id/oppositions/:opp_id
pub async fn update_opposition(
    State(state): State<AppState>,
    Path((id, opp_id)): Path<(Uuid, String)>,
    Json(update): Json<OppositionUpdate>,
) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    let found = ws.mutate(|framework| {
        framework
            .research_input
            .update_opposition(&opp_id, update.field, &update.value)
    });
    if !found {
        return Err(ApiError::NotFound(format!("Opposition {}", opp_id)));
    }
    Ok(Json(WorkspaceView::of(&ws)))
}

/// DELETE /api/frameworks/:id/oppositions/:opp_id
pub async fn remove_opposition(
    State(state): State<AppState>,
    Path((id, opp_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    if !ws.mutate(|framework| framework.research_input.remove_opposition(&opp_id)) {
        return Err(ApiError::NotFound(format!("Opposition {}", opp_id)));
    }
    Ok(Json(WorkspaceView::of(&ws)))
}

/// PATCH /api/frameworks/:id/sections/:section_id
pub async fn edit_section(
    State(state): State<AppState>,
    Path((id, section_id)): Path<(Uuid, String)>,
    Json(update): Json<ContentUpdate>,
) -> ApiResult<Json<WorkspaceView>> {
    let section_id: ResearchSectionId = section_id.parse()?;
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    let found = ws.mutate(|framework| update_section(&mut framework.research_sections, section_id, &update.content));
    if !found {
        return Err(ApiError::NotFound(format!("Research section {}", section_id)));
    }
    Ok(Json(WorkspaceView::of(&ws)))
}

/// PATCH /api/frameworks/:id/opposition-research/:opp_id
pub async fn edit_opposition_research(
    State(state): State<AppState>,
    Path((id, opp_id)): Path<(Uuid, String)>,
    Json(update): Json<ContentUpdate>,
) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    let found = ws.mutate(|framework| {
        update_opposition_research(&mut framework.opposition_research, &opp_id, &update.content)
    });
    if !found {
        return Err(ApiError::NotFound(format!("Opposition research {}", opp_id)));
    }
    Ok(Json(WorkspaceView::of(&ws)))
}

/// POST /api/frameworks/:id/tiles
pub async fn add_custom_tile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NewTile>,
) -> ApiResult<(StatusCode, Json<CreatedResponse<Tile>>)> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    let tile = ws.mutate(|framework| framework.board.add_custom_tile(request.quadrant, &request.text))?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            created: tile,
            workspace: WorkspaceView::of(&ws),
        }),
    ))
}

/// PATCH /api/frameworks/:id/wells/:quadrant/tiles/:tile_id
pub async fn edit_well_tile(
    State(state): State<AppState>,
    Path((id, quadrant, tile_id)): Path<(Uuid, String, String)>,
    Json(update): Json<TextUpdate>,
) -> ApiResult<Json<WorkspaceView>> {
    let quadrant: QuadrantKey = quadrant.parse()?;
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    if !ws.mutate(|framework| framework.board.update_well_tile(quadrant, &tile_id, &update.text)) {
        return Err(ApiError::NotFound(format!("Tile {} in {} well", tile_id, quadrant)));
    }
    Ok(Json(WorkspaceView::of(&ws)))
}

/// DELETE /api/frameworks/:id/wells/:quadrant/tiles/:tile_id
pub async fn delete_well_tile(
    State(state): State<AppState>,
    Path((id, quadrant, tile_id)): Path<(Uuid, String, String)>,
) -> ApiResult<Json<WorkspaceView>> {
    let quadrant: QuadrantKey = quadrant.parse()?;
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    if !ws.framework().board.wells[quadrant].iter().any(|t| t.id == tile_id) {
        return Err(ApiError::NotFound(format!("Tile {} in {} well", tile_id, quadrant)));
    }
    ws.mutate(|framework| framework.board.remove_from_well(&tile_id));
    Ok(Json(WorkspaceView::of(&ws)))
}

/// POST /api/frameworks/:id/grid/:quadrant
pub async fn place_tile(
    State(state): State<AppState>,
    Path((id, quadrant)): Path<(Uuid, String)>,
    Json(request): Json<PlaceTile>,
) -> ApiResult<Json<PlacementResponse<MoveOutcome>>> {
    let quadrant: QuadrantKey = quadrant.parse()?;
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    let outcome = ws.mutate(|framework| framework.board.move_to_grid(&request.tile_id, quadrant));

    if outcome.is_moved() {
        state.event_bus.emit_lossy(LgridEvent::TilePlaced {
            framework_id: id,
            tile_id: request.tile_id.clone(),
            quadrant,
            timestamp: Utc::now(),
        });
    } else {
        debug!(framework_id = %id, tile_id = %request.tile_id, ?outcome, "Placement rejected");
    }

    Ok(Json(PlacementResponse {
        result: outcome,
        workspace: WorkspaceView::of(&ws),
    }))
}

/// DELETE /api/frameworks/:id/grid/:quadrant/:tile_id
pub async fn unplace_tile(
    State(state): State<AppState>,
    Path((id, quadrant, tile_id)): Path<(Uuid, String, String)>,
) -> ApiResult<Json<PlacementResponse<RemoveOutcome>>> {
    let quadrant: QuadrantKey = quadrant.parse()?;
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    let outcome = ws.mutate(|framework| framework.board.remove_from_grid(&tile_id, quadrant));

    if let RemoveOutcome::Returned { to } = outcome {
        state.event_bus.emit_lossy(LgridEvent::TileReturned {
            framework_id: id,
            tile_id,
            well: to,
            timestamp: Utc::now(),
        });
    }

    Ok(Json(PlacementResponse {
        result: outcome,
        workspace: WorkspaceView::of(&ws),
    }))
}

/// PUT /api/frameworks/:id/step
pub async fn set_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StepRequest>,
) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;

    let framework = ws.framework();
    let step = framework.current_step.navigate(request.step, framework.progress())?;
    if step != framework.current_step {
        ws.mutate(|framework| framework.current_step = step);
        state.event_bus.emit_lossy(LgridEvent::StepChanged {
            framework_id: id,
            step,
            timestamp: Utc::now(),
        });
    }
    Ok(Json(WorkspaceView::of(&ws)))
}

/// POST /api/frameworks/:id/reset
pub async fn reset_workspace(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkspaceView>> {
    let workspace = open_workspace(&state, id).await?;
    let mut ws = workspace.lock().await;
    ws.mutate(|framework| framework.reset());
    Ok(Json(WorkspaceView::of(&ws)))
}

/// GET /api/frameworks/:id/save-status
pub async fn get_save_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SaveStatusResponse>> {
    let workspace = open_workspace(&state, id).await?;
    let ws = workspace.lock().await;
    Ok(Json(SaveStatusResponse {
        framework_id: id,
        status: ws.save_status(),
    }))
}

pub fn workspace_routes() -> Router<AppState> {
    Router::new()
        .route("/api/frameworks/:id/workspace", get(get_workspace))
        .route("/api/frameworks/:id/input", put(put_input))
        .route("/api/frameworks/:id/oppositions", post(add_opposition))
        .route(
            "/api/frameworks/:id/oppositions/:opp_id",
            patch(update_opposition).delete(remove_opposition),
        )
        .route("/api/frameworks/:id/sections/:section_id", patch(edit_section))
        .route("/api/frameworks/:id/opposition-research/:opp_id", patch(edit_opposition_research))
        .route("/api/frameworks/:id/tiles", post(add_custom_tile))
        .route(
            "/api/frameworks/:id/wells/:quadrant/tiles/:tile_id",
            patch(edit_well_tile).delete(delete_well_tile),
        )
        .route("/api/frameworks/:id/grid/:quadrant", post(place_tile))
        .route("/api/frameworks/:id/grid/:quadrant/:tile_id", delete(unplace_tile))
        .route("/api/frameworks/:id/step", put(set_step))
        .route("/api/frameworks/:id/reset", post(reset_workspace))
        .route("/api/frameworks/:id/save-status", get(get_save_status))
}
