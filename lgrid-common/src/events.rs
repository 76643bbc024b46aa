//! Event types for the Leesburg Grid event system
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::quadrant::QuadrantKey;
use crate::wizard::WizardStep;

/// Persistence status of one workspace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

impl SaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error => "error",
        }
    }
}

/// Generation stage named in generation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Research,
    OppositionResearch,
    Strategy,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Research => "research",
            GenerationStage::OppositionResearch => "opposition_research",
            GenerationStage::Strategy => "strategy",
        }
    }
}

/// Leesburg Grid event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LgridEvent {
    /// Autosave status of a workspace changed
    SaveStatusChanged {
        framework_id: Uuid,
        status: SaveStatus,
        /// Failure detail when `status` is `error`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tile landed in a grid quadrant
    TilePlaced {
        framework_id: Uuid,
        tile_id: String,
        quadrant: QuadrantKey,
        timestamp: DateTime<Utc>,
    },

    /// A grid tile went back to its origin well
    TileReturned {
        framework_id: Uuid,
        tile_id: String,
        well: QuadrantKey,
        timestamp: DateTime<Utc>,
    },

    /// Wizard moved to another step
    StepChanged {
        framework_id: Uuid,
        step: WizardStep,
        timestamp: DateTime<Utc>,
    },

    /// A generation call finished and its result was applied
    GenerationCompleted {
        framework_id: Uuid,
        stage: GenerationStage,
        timestamp: DateTime<Utc>,
    },

    /// A generation call failed; workspace state is unchanged
    GenerationFailed {
        framework_id: Uuid,
        stage: GenerationStage,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Read-only share snapshot created
    ShareCreated {
        framework_id: Uuid,
        share_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl LgridEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            LgridEvent::SaveStatusChanged { .. } => "SaveStatusChanged",
            LgridEvent::TilePlaced { .. } => "TilePlaced",
            LgridEvent::TileReturned { .. } => "TileReturned",
            LgridEvent::StepChanged { .. } => "StepChanged",
            LgridEvent::GenerationCompleted { .. } => "GenerationCompleted",
            LgridEvent::GenerationFailed { .. } => "GenerationFailed",
            LgridEvent::ShareCreated { .. } => "ShareCreated",
        }
    }

    pub fn framework_id(&self) -> Uuid {
        match self {
            LgridEvent::SaveStatusChanged { framework_id, .. }
            | LgridEvent::TilePlaced { framework_id, .. }
            | LgridEvent::TileReturned { framework_id, .. }
            | LgridEvent::StepChanged { framework_id, .. }
            | LgridEvent::GenerationCompleted { framework_id, .. }
            | LgridEvent::GenerationFailed { framework_id, .. }
            | LgridEvent::ShareCreated { framework_id, .. } => *framework_id,
        }
    }
}

/// Broadcast bus shared by the server's components
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LgridEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LgridEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: LgridEvent) -> Result<usize, broadcast::error::SendError<LgridEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LgridEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_event(framework_id: Uuid) -> LgridEvent {
        LgridEvent::StepChanged {
            framework_id,
            step: WizardStep::Strategy,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let id = Uuid::new_v4();
        let event = LgridEvent::SaveStatusChanged {
            framework_id: id,
            status: SaveStatus::Saved,
            message: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SaveStatusChanged");
        assert_eq!(json["status"], "saved");
        assert!(json.get("message").is_none());
        assert_eq!(event.event_type(), "SaveStatusChanged");
        assert_eq!(event.framework_id(), id);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();

        assert_eq!(bus.emit(step_event(id)).unwrap(), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "StepChanged");
        assert_eq!(received.framework_id(), id);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(step_event(Uuid::new_v4())).is_err());
        // Lossy emit never fails
        bus.emit_lossy(step_event(Uuid::new_v4()));
        assert_eq!(bus.capacity(), 4);
    }
}
