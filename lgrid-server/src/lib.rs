//! lgrid-server library interface for testing
//!
//! Exposes the router, state and services for integration tests.

pub mod api;
pub mod autosave;
pub mod config;
pub mod error;
pub mod services;
pub mod workspace;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use lgrid_common::events::EventBus;

use crate::autosave::{FrameworkStore, SqliteFrameworkStore};
use crate::config::Settings;
use crate::services::Generator;
use crate::workspace::WorkspaceRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Live editing contexts
    pub workspaces: Arc<WorkspaceRegistry>,
    /// Research and strategy generation
    pub generator: Arc<dyn Generator>,
    pub settings: Arc<Settings>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, generator: Arc<dyn Generator>, settings: Settings) -> Self {
        let store: Arc<dyn FrameworkStore> = Arc::new(SqliteFrameworkStore::new(db.clone()));
        Self::with_store(db, event_bus, generator, settings, store)
    }

    /// State whose autosaves go to `store` instead of the database
    pub fn with_store(
        db: SqlitePool,
        event_bus: EventBus,
        generator: Arc<dyn Generator>,
        settings: Settings,
        store: Arc<dyn FrameworkStore>,
    ) -> Self {
        let workspaces = Arc::new(WorkspaceRegistry::new(
            db.clone(),
            store,
            event_bus.clone(),
            settings.autosave_debounce,
        ));
        Self {
            db,
            event_bus,
            workspaces,
            generator,
            settings: Arc::new(settings),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember an error for the health endpoint
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::framework_routes())
        .merge(api::workspace_routes())
        .merge(api::generation_routes())
        .merge(api::share_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
