//! Messaging tiles

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quadrant::QuadrantKey;

/// A single short messaging statement
///
/// `quadrant` is the tile's origin well. It does not change when the tile
/// is placed in a different grid quadrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    pub text: String,
    pub quadrant: QuadrantKey,
    #[serde(default)]
    pub is_custom: bool,
}

impl Tile {
    /// Tile produced by strategy generation: id is `<quadrant>-<index>`
    pub fn generated(quadrant: QuadrantKey, index: usize, text: impl Into<String>) -> Self {
        Self {
            id: format!("{}-{}", quadrant.as_str(), index),
            text: text.into(),
            quadrant,
            is_custom: false,
        }
    }

    /// User-authored tile with a fresh unique id
    pub fn custom(quadrant: QuadrantKey, text: impl Into<String>) -> Self {
        Self {
            id: format!("custom-{}", Uuid::new_v4().simple()),
            text: text.into(),
            quadrant,
            is_custom: true,
        }
    }
}
