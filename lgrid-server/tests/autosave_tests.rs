//! Autosave debounce and status tests
//!
//! Time is paused so the debounce windows are exact.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::sleep;

use lgrid_common::framework::Framework;
use lgrid_common::{EventBus, FrameworkRecord, LgridEvent, SaveStatus};
use lgrid_server::autosave::{AutosaveHandle, FrameworkStore};

const DEBOUNCE: Duration = Duration::from_millis(2000);

/// Store that records successful writes and can be told to fail
#[derive(Default)]
struct RecordingStore {
    saved: Mutex<Vec<FrameworkRecord>>,
    fail: AtomicBool,
    latency: Duration,
}

impl RecordingStore {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn names(&self) -> Vec<String> {
        self.saved.lock().unwrap().iter().map(|r| r.name.clone()).collect()
    }
}

#[async_trait]
impl FrameworkStore for RecordingStore {
    async fn save(&self, record: &FrameworkRecord) -> lgrid_common::Result<()> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(lgrid_common::Error::Internal("disk full".to_string()));
        }
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}

fn record_named(framework: &mut Framework, name: &str) -> FrameworkRecord {
    framework.research_input.name = name.to_string();
    FrameworkRecord::from(&*framework)
}

fn status_events(rx: &mut broadcast::Receiver<LgridEvent>) -> Vec<(SaveStatus, Option<String>)> {
    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let LgridEvent::SaveStatusChanged { status, message, .. } = event {
            statuses.push((status, message));
        }
    }
    statuses
}

fn spawn(store: Arc<RecordingStore>) -> (AutosaveHandle, Framework, broadcast::Receiver<LgridEvent>) {
    let framework = Framework::new();
    let bus = EventBus::new(64);
    let rx = bus.subscribe();
    let handle = AutosaveHandle::spawn(framework.id, store, bus, DEBOUNCE);
    (handle, framework, rx)
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_changes_coalesces_into_one_write() {
    let store = Arc::new(RecordingStore::default());
    let (handle, mut framework, mut rx) = spawn(store.clone());

    for name in ["J", "Ja", "Jane"] {
        handle.schedule(record_named(&mut framework, name));
        sleep(Duration::from_millis(500)).await;
    }
    assert_eq!(handle.status(), SaveStatus::Saving);
    assert!(store.names().is_empty());

    // Last change at t=1000ms, quiet period ends at t=3000ms
    sleep(Duration::from_millis(2000)).await;
    assert_eq!(store.names(), vec!["Jane".to_string()]);
    assert_eq!(handle.status(), SaveStatus::Saved);

    let statuses: Vec<SaveStatus> = status_events(&mut rx).into_iter().map(|(s, _)| s).collect();
    assert_eq!(statuses, vec![SaveStatus::Saving, SaveStatus::Saved]);
}

#[tokio::test(start_paused = true)]
async fn test_saved_decays_to_idle() {
    let store = Arc::new(RecordingStore::default());
    let (handle, mut framework, mut rx) = spawn(store.clone());

    handle.schedule(record_named(&mut framework, "Jane Doe"));
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(handle.status(), SaveStatus::Saved);

    sleep(Duration::from_millis(2000)).await;
    assert_eq!(handle.status(), SaveStatus::Idle);

    let statuses: Vec<SaveStatus> = status_events(&mut rx).into_iter().map(|(s, _)| s).collect();
    assert_eq!(statuses, vec![SaveStatus::Saving, SaveStatus::Saved, SaveStatus::Idle]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_reports_error_until_next_success() {
    let store = Arc::new(RecordingStore::default());
    store.fail.store(true, Ordering::SeqCst);
    let (handle, mut framework, mut rx) = spawn(store.clone());

    handle.schedule(record_named(&mut framework, "Jane"));
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(handle.status(), SaveStatus::Error);

    let events = status_events(&mut rx);
    let (status, message) = events.last().unwrap();
    assert_eq!(*status, SaveStatus::Error);
    assert!(message.as_deref().unwrap().contains("disk full"));

    // Error does not decay on its own
    sleep(Duration::from_millis(5000)).await;
    assert_eq!(handle.status(), SaveStatus::Error);

    store.fail.store(false, Ordering::SeqCst);
    handle.schedule(record_named(&mut framework, "Jane Doe"));
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(handle.status(), SaveStatus::Saved);
    assert_eq!(store.names(), vec!["Jane Doe".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_change_during_write_supersedes_its_status() {
    let store = Arc::new(RecordingStore::with_latency(Duration::from_millis(1000)));
    let (handle, mut framework, _rx) = spawn(store.clone());

    handle.schedule(record_named(&mut framework, "first"));
    // Write starts at t=2000ms and completes at t=3000ms
    sleep(Duration::from_millis(2100)).await;
    handle.schedule(record_named(&mut framework, "second"));

    sleep(Duration::from_millis(1400)).await;
    assert_eq!(store.names(), vec!["first".to_string()]);
    assert_eq!(handle.status(), SaveStatus::Saving);

    sleep(Duration::from_millis(3000)).await;
    assert_eq!(store.names(), vec!["first".to_string(), "second".to_string()]);
    assert_eq!(handle.status(), SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn test_close_flushes_pending_snapshot() {
    let store = Arc::new(RecordingStore::default());
    let (handle, mut framework, _rx) = spawn(store.clone());

    handle.schedule(record_named(&mut framework, "Jane Doe"));
    handle.close().await;

    assert_eq!(store.names(), vec!["Jane Doe".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_close_without_changes_writes_nothing() {
    let store = Arc::new(RecordingStore::default());
    let (handle, _framework, _rx) = spawn(store.clone());

    handle.close().await;

    assert!(store.names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_pending_snapshot() {
    let store = Arc::new(RecordingStore::default());
    let (handle, mut framework, _rx) = spawn(store.clone());

    handle.schedule(record_named(&mut framework, "Jane Doe"));
    handle.cancel();
    sleep(Duration::from_millis(5000)).await;

    assert!(store.names().is_empty());
    assert_eq!(handle.framework_id(), framework.id);
}
