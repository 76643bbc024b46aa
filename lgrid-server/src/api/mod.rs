//! HTTP API handlers for lgrid-server
//!
//! REST endpoints for framework records, live workspaces, generation and
//! sharing, plus an SSE event stream.

pub mod frameworks;
pub mod generation;
pub mod health;
pub mod share;
pub mod sse;
pub mod workspace;

pub use frameworks::framework_routes;
pub use generation::generation_routes;
pub use health::health_routes;
pub use share::share_routes;
pub use sse::event_stream;
pub use workspace::workspace_routes;

use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::workspace::Workspace;
use crate::{ApiError, ApiResult, AppState};

/// Open workspace for `id` or 404
pub(crate) async fn open_workspace(state: &AppState, id: Uuid) -> ApiResult<Arc<Mutex<Workspace>>> {
    state
        .workspaces
        .open(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Framework {}", id)))
}
