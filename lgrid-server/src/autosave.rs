//! Debounced persistence of workspace snapshots
//!
//! One background task per open workspace owns a latest-snapshot slot.
//! Each change overwrites the slot and restarts the quiet-period timer;
//! when the timer expires the task performs a single upsert of whatever
//! the slot holds. Writes never block or roll back editing. Status is
//! published on a watch channel and as `SaveStatusChanged` events.
//!
//! Status rules:
//! - a change sets `saving`
//! - a finished write sets `saved` or `error`, unless a newer change
//!   arrived while it was in flight (that change's write will report)
//! - `saved` decays to `idle` after one quiet period
//! - closing the handle flushes any pending snapshot immediately

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use lgrid_common::events::{EventBus, LgridEvent, SaveStatus};
use lgrid_common::FrameworkRecord;

/// Destination of autosave writes
#[async_trait]
pub trait FrameworkStore: Send + Sync {
    async fn save(&self, record: &FrameworkRecord) -> lgrid_common::Result<()>;
}

/// Writes to the `frameworks` table
pub struct SqliteFrameworkStore {
    db: SqlitePool,
}

impl SqliteFrameworkStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FrameworkStore for SqliteFrameworkStore {
    async fn save(&self, record: &FrameworkRecord) -> lgrid_common::Result<()> {
        lgrid_common::db::frameworks::save_framework(&self.db, record).await
    }
}

#[derive(Debug, Default)]
struct PendingSlot {
    version: u64,
    record: Option<FrameworkRecord>,
}

/// Owner side of a workspace's autosave task
pub struct AutosaveHandle {
    framework_id: Uuid,
    slot: watch::Sender<PendingSlot>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn spawn(
        framework_id: Uuid,
        store: Arc<dyn FrameworkStore>,
        event_bus: EventBus,
        delay: Duration,
    ) -> Self {
        let (slot, slot_rx) = watch::channel(PendingSlot::default());
        let (status_tx, status) = watch::channel(SaveStatus::Idle);

        let worker = Worker {
            framework_id,
            store,
            event_bus,
            delay,
            status: status_tx,
        };
        let task = tokio::spawn(worker.run(slot_rx));

        Self {
            framework_id,
            slot,
            status,
            task,
        }
    }

    pub fn framework_id(&self) -> Uuid {
        self.framework_id
    }

    /// Replace the pending snapshot and restart the quiet period
    pub fn schedule(&self, record: FrameworkRecord) {
        self.slot.send_modify(|slot| {
            slot.version += 1;
            slot.record = Some(record);
        });
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Flush any pending snapshot and wait for the task to finish
    pub async fn close(self) {
        let AutosaveHandle { slot, task, framework_id, .. } = self;
        drop(slot);
        if let Err(e) = task.await {
            warn!(%framework_id, "Autosave task ended abnormally: {}", e);
        }
    }

    /// Stop without writing anything still pending
    pub fn cancel(&self) {
        self.task.abort();
    }
}

struct Worker {
    framework_id: Uuid,
    store: Arc<dyn FrameworkStore>,
    event_bus: EventBus,
    delay: Duration,
    status: watch::Sender<SaveStatus>,
}

impl Worker {
    async fn run(self, mut slot: watch::Receiver<PendingSlot>) {
        let mut decay_at: Option<Instant> = None;

        loop {
            let changed = match decay_at {
                Some(deadline) => tokio::select! {
                    changed = slot.changed() => changed,
                    _ = tokio::time::sleep_until(deadline) => {
                        decay_at = None;
                        self.publish(SaveStatus::Idle, None);
                        continue;
                    }
                },
                None => slot.changed().await,
            };
            if changed.is_err() {
                break;
            }
            decay_at = None;
            self.publish(SaveStatus::Saving, None);

            // Quiet period: every further change restarts the timer
            let closed = loop {
                tokio::select! {
                    changed = slot.changed() => {
                        if changed.is_err() {
                            break true;
                        }
                    }
                    _ = tokio::time::sleep(self.delay) => break false,
                }
            };

            let (version, record) = {
                let pending = slot.borrow_and_update();
                (pending.version, pending.record.clone())
            };
            let Some(record) = record else {
                continue;
            };

            debug!(framework_id = %self.framework_id, version, "Autosaving framework");
            let result = self.store.save(&record).await;
            let superseded = slot.borrow().version != version;

            if superseded {
                debug!(framework_id = %self.framework_id, version, "Save superseded by newer change");
            } else {
                match result {
                    Ok(()) => {
                        self.publish(SaveStatus::Saved, None);
                        decay_at = Some(Instant::now() + self.delay);
                    }
                    Err(e) => {
                        warn!(framework_id = %self.framework_id, "Autosave failed: {}", e);
                        self.publish(SaveStatus::Error, Some(e.to_string()));
                    }
                }
            }

            if closed {
                break;
            }
        }

        debug!(framework_id = %self.framework_id, "Autosave task stopped");
    }

    fn publish(&self, status: SaveStatus, message: Option<String>) {
        self.status.send_replace(status);
        self.event_bus.emit_lossy(LgridEvent::SaveStatusChanged {
            framework_id: self.framework_id,
            status,
            message,
            timestamp: Utc::now(),
        });
    }
}
