//! Live editing contexts
//!
//! A [`Workspace`] owns the in-memory [`Framework`] for one id together with
//! its autosave task. Every mutation runs to completion under the
//! workspace mutex; a mutation that actually changed something refreshes
//! the title, bumps `updated_at` and schedules an autosave.
//!
//! Opening, deleting and evicting all take the registry write lock, so a
//! framework row is never written back after it has been deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use lgrid_common::db::frameworks;
use lgrid_common::events::{EventBus, SaveStatus};
use lgrid_common::{Framework, FrameworkRecord};

use crate::autosave::{AutosaveHandle, FrameworkStore};

pub struct Workspace {
    framework: Framework,
    autosave: AutosaveHandle,
    last_active: Instant,
}

impl Workspace {
    pub fn new(framework: Framework, autosave: AutosaveHandle) -> Self {
        Self {
            framework,
            autosave,
            last_active: Instant::now(),
        }
    }

    pub fn framework(&self) -> &Framework {
        &self.framework
    }

    pub fn id(&self) -> Uuid {
        self.framework.id
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn record(&self) -> FrameworkRecord {
        FrameworkRecord::from(&self.framework)
    }

    /// Apply `f`; schedule an autosave only if the framework changed
    pub fn mutate<R>(&mut self, f: impl FnOnce(&mut Framework) -> R) -> R {
        let before = self.framework.clone();
        let result = f(&mut self.framework);
        self.framework.refresh_title();

        if self.framework != before {
            self.framework.updated_at = Utc::now();
            self.last_active = Instant::now();
            self.autosave.schedule(FrameworkRecord::from(&self.framework));
        }
        result
    }

    /// Unchanged for `idle_after` with nothing left to write
    ///
    /// A workspace whose last save failed is never idle; it keeps the
    /// unsaved state until a later write succeeds.
    pub fn is_idle(&self, idle_after: Duration) -> bool {
        self.last_active.elapsed() >= idle_after
            && matches!(self.save_status(), SaveStatus::Idle | SaveStatus::Saved)
    }

    pub async fn close(self) {
        self.autosave.close().await;
    }
}

/// Open workspaces by framework id
pub struct WorkspaceRegistry {
    db: SqlitePool,
    store: Arc<dyn FrameworkStore>,
    event_bus: EventBus,
    debounce: Duration,
    open: RwLock<HashMap<Uuid, Arc<Mutex<Workspace>>>>,
}

impl WorkspaceRegistry {
    pub fn new(db: SqlitePool, store: Arc<dyn FrameworkStore>, event_bus: EventBus, debounce: Duration) -> Self {
        Self {
            db,
            store,
            event_bus,
            debounce,
            open: RwLock::new(HashMap::new()),
        }
    }

    /// Workspace for `id`, loading it from the database on first use
    ///
    /// Returns `None` when no such framework exists.
    pub async fn open(&self, id: Uuid) -> lgrid_common::Result<Option<Arc<Mutex<Workspace>>>> {
        if let Some(workspace) = self.open.read().await.get(&id) {
            return Ok(Some(workspace.clone()));
        }

        // Load under the write lock so a concurrent delete cannot slip
        // between the read and the insert
        let mut open = self.open.write().await;
        if let Some(workspace) = open.get(&id) {
            return Ok(Some(workspace.clone()));
        }
        let Some(record) = frameworks::load_framework(&self.db, id).await? else {
            return Ok(None);
        };

        let autosave = AutosaveHandle::spawn(id, self.store.clone(), self.event_bus.clone(), self.debounce);
        let workspace = Arc::new(Mutex::new(Workspace::new(Framework::from(record), autosave)));
        open.insert(id, workspace.clone());
        debug!(framework_id = %id, "Workspace opened");
        Ok(Some(workspace))
    }

    /// Current record: the live workspace if open, else the stored row
    pub async fn snapshot(&self, id: Uuid) -> lgrid_common::Result<Option<FrameworkRecord>> {
        let workspace = self.open.read().await.get(&id).cloned();
        match workspace {
            Some(workspace) => Ok(Some(workspace.lock().await.record())),
            None => frameworks::load_framework(&self.db, id).await,
        }
    }

    pub async fn is_open(&self, id: Uuid) -> bool {
        self.open.read().await.contains_key(&id)
    }

    /// Delete a framework, dropping its open workspace without flushing
    ///
    /// The autosave task is cancelled and the row deleted before the
    /// registry lock is released. Returns `false` when no row existed.
    pub async fn delete(&self, id: Uuid) -> lgrid_common::Result<bool> {
        let mut open = self.open.write().await;
        if let Some(workspace) = open.remove(&id) {
            workspace.lock().await.autosave.cancel();
            debug!(framework_id = %id, "Workspace discarded");
        }
        frameworks::delete_framework(&self.db, id).await
    }

    /// Flush and close workspaces untouched for `idle_after`
    ///
    /// Workspaces still held by a request, locked, or with a failed save
    /// are left open. Returns the number closed.
    pub async fn evict_idle(&self, idle_after: Duration) -> usize {
        let mut open = self.open.write().await;
        let idle: Vec<Uuid> = open
            .iter()
            .filter(|&(_, workspace)| Arc::strong_count(workspace) == 1)
            .filter(|&(_, workspace)| workspace.try_lock().is_ok_and(|ws| ws.is_idle(idle_after)))
            .map(|(id, _)| *id)
            .collect();

        let mut closed = 0;
        for id in idle {
            let Some(workspace) = open.remove(&id) else {
                continue;
            };
            // Still under the write lock: nothing can clone it, and the
            // flush finishes before the framework can be reopened
            match Arc::try_unwrap(workspace) {
                Ok(workspace) => {
                    workspace.into_inner().close().await;
                    closed += 1;
                }
                Err(workspace) => {
                    open.insert(id, workspace);
                }
            }
        }

        if closed > 0 {
            debug!("Closed {} idle workspace(s)", closed);
        }
        closed
    }

    /// Periodically evict idle workspaces until the registry is dropped
    pub fn spawn_idle_sweeper(self: &Arc<Self>, every: Duration, idle_after: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle(idle_after).await;
            }
        })
    }

    /// Flush and close every open workspace
    pub async fn close_all(&self) {
        let open: Vec<_> = self.open.write().await.drain().collect();
        info!("Flushing {} open workspace(s)", open.len());
        for (id, workspace) in open {
            match Arc::try_unwrap(workspace) {
                Ok(workspace) => workspace.into_inner().close().await,
                // The task flushes once the last request holding it finishes
                Err(_) => debug!(framework_id = %id, "Workspace still referenced at shutdown"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::SqliteFrameworkStore;
    use lgrid_common::db::{frameworks, init_tables};
    use lgrid_common::{QuadrantKey, RemoveOutcome};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (SqlitePool, WorkspaceRegistry) {
        setup_with_debounce(Duration::from_secs(600)).await
    }

    async fn setup_with_debounce(debounce: Duration) -> (SqlitePool, WorkspaceRegistry) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_tables(&pool).await.unwrap();
        let store: Arc<dyn FrameworkStore> = Arc::new(SqliteFrameworkStore::new(pool.clone()));
        let registry = WorkspaceRegistry::new(pool.clone(), store, EventBus::new(16), debounce);
        (pool, registry)
    }

    #[tokio::test]
    async fn test_open_returns_same_workspace() {
        let (pool, registry) = setup().await;
        let record = frameworks::create_framework(&pool).await.unwrap();

        let a = registry.open(record.id).await.unwrap().unwrap();
        let b = registry.open(record.id).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.is_open(record.id).await);
        assert!(registry.open(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_mutation_keeps_timestamp() {
        let (pool, registry) = setup().await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let workspace = registry.open(record.id).await.unwrap().unwrap();
        let mut ws = workspace.lock().await;

        let before = ws.framework().updated_at;
        let outcome = ws.mutate(|f| f.board.remove_from_grid("missing", QuadrantKey::OurStory));

        assert_eq!(outcome, RemoveOutcome::Absent);
        assert_eq!(ws.framework().updated_at, before);
        assert_eq!(ws.save_status(), SaveStatus::Idle);
    }

    #[tokio::test]
    async fn test_mutation_refreshes_title_and_snapshot() {
        let (pool, registry) = setup().await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let workspace = registry.open(record.id).await.unwrap().unwrap();

        workspace
            .lock()
            .await
            .mutate(|f| f.research_input.name = "  Jane Doe ".to_string());

        let snapshot = registry.snapshot(record.id).await.unwrap().unwrap();
        assert_eq!(snapshot.title, "Jane Doe");
        assert!(snapshot.updated_at >= record.updated_at);

        // Not yet written: the debounce has not elapsed
        let stored = frameworks::load_framework(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "");
    }

    #[tokio::test]
    async fn test_close_all_flushes_to_database() {
        let (pool, registry) = setup().await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let workspace = registry.open(record.id).await.unwrap().unwrap();
        workspace
            .lock()
            .await
            .mutate(|f| f.research_input.goal = "Win the seat".to_string());
        drop(workspace);

        registry.close_all().await;

        let stored = frameworks::load_framework(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(stored.goal, "Win the seat");
        assert!(!registry.is_open(record.id).await);
    }

    #[tokio::test]
    async fn test_delete_drops_pending_changes() {
        let (pool, registry) = setup().await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let workspace = registry.open(record.id).await.unwrap().unwrap();
        workspace
            .lock()
            .await
            .mutate(|f| f.research_input.goal = "Never saved".to_string());

        assert!(registry.delete(record.id).await.unwrap());

        assert!(!registry.is_open(record.id).await);
        assert!(frameworks::load_framework(&pool, record.id).await.unwrap().is_none());
        assert!(!registry.delete(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_deleted_framework_stays_deleted() {
        let (pool, registry) = setup_with_debounce(Duration::from_millis(10)).await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let held = registry.open(record.id).await.unwrap().unwrap();

        assert!(registry.delete(record.id).await.unwrap());
        assert!(registry.open(record.id).await.unwrap().is_none());

        // A request still holding the old workspace keeps editing it
        held.lock()
            .await
            .mutate(|f| f.research_input.name = "zombie".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(frameworks::load_framework(&pool, record.id).await.unwrap().is_none());
        assert!(!registry.is_open(record.id).await);
    }

    #[tokio::test]
    async fn test_pending_write_blocks_eviction() {
        let (pool, registry) = setup().await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let workspace = registry.open(record.id).await.unwrap().unwrap();
        workspace
            .lock()
            .await
            .mutate(|f| f.research_input.goal = "Win the seat".to_string());
        drop(workspace);

        // Pending write: the debounce has not elapsed, so not idle yet
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(registry.evict_idle(Duration::from_millis(20)).await, 0);
        assert!(registry.is_open(record.id).await);

        let stored = frameworks::load_framework(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(stored.goal, "");
    }

    #[tokio::test]
    async fn test_evict_idle_closes_saved_workspace() {
        let (pool, registry) = setup_with_debounce(Duration::from_millis(10)).await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let workspace = registry.open(record.id).await.unwrap().unwrap();
        workspace
            .lock()
            .await
            .mutate(|f| f.research_input.goal = "Win the seat".to_string());
        drop(workspace);

        assert_eq!(registry.evict_idle(Duration::from_secs(60)).await, 0);
        assert!(registry.is_open(record.id).await);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.evict_idle(Duration::from_millis(50)).await, 1);
        assert!(!registry.is_open(record.id).await);

        let stored = frameworks::load_framework(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(stored.goal, "Win the seat");

        // Reopening loads the flushed row
        let reopened = registry.open(record.id).await.unwrap().unwrap();
        assert_eq!(reopened.lock().await.framework().research_input.goal, "Win the seat");
    }

    #[tokio::test]
    async fn test_evict_idle_skips_held_workspace() {
        let (pool, registry) = setup().await;
        let record = frameworks::create_framework(&pool).await.unwrap();
        let held = registry.open(record.id).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.evict_idle(Duration::from_millis(10)).await, 0);
        assert!(registry.is_open(record.id).await);

        drop(held);
        assert_eq!(registry.evict_idle(Duration::from_millis(10)).await, 1);
        assert!(!registry.is_open(record.id).await);
    }
}
