//! # Leesburg Grid Common Library
//!
//! Shared code for the Leesburg Grid workshop service including:
//! - Campaign profile, research and tile types
//! - Placement engine (wells ↔ grid) and wizard state machine
//! - Framework record rules (status, title) and share snapshots
//! - Event types (LgridEvent) and EventBus
//! - Configuration loading
//! - SQLite persistence for frameworks and shared sessions

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod events;
pub mod extract;
pub mod framework;
pub mod placement;
pub mod quadrant;
pub mod research;
pub mod share;
pub mod tile;
pub mod wizard;

pub use error::{Error, Result};
pub use events::{EventBus, LgridEvent, SaveStatus};
pub use framework::{Framework, FrameworkRecord, FrameworkStatus};
pub use placement::{Board, MoveOutcome, RemoveOutcome, MAX_TILES_PER_QUADRANT};
pub use quadrant::{QuadrantKey, Quadrants};
pub use tile::Tile;
pub use wizard::WizardStep;
