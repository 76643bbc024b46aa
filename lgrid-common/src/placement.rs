//! Placement engine
//!
//! Moves tiles between the unlimited per-quadrant wells and the
//! capacity-bounded grid. Invariants held by every operation:
//!
//! - no grid quadrant holds more than [`MAX_TILES_PER_QUADRANT`] tiles
//! - a tile id appears in exactly one collection (well or grid slot)
//! - `move_to_grid` and `remove_from_grid` conserve the set of tile ids
//!
//! Rejected moves are expected and frequent (full quadrant, duplicate
//! drop), so they are reported as outcome values and leave the board
//! untouched rather than returning errors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::quadrant::{QuadrantKey, Quadrants};
use crate::tile::Tile;
use crate::{Error, Result};

/// Grid capacity per quadrant
pub const MAX_TILES_PER_QUADRANT: usize = 5;

/// Where a tile currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "quadrant", rename_all = "snake_case")]
pub enum Location {
    Well(QuadrantKey),
    Grid(QuadrantKey),
}

/// Result of [`Board::move_to_grid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Tile appended to the target grid quadrant
    Moved { from: Location },
    /// Target quadrant already holds the maximum number of tiles
    GridFull,
    /// Target quadrant already contains this tile id
    AlreadyPlaced,
    /// No collection holds a tile with this id
    UnknownTile,
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}

/// Result of [`Board::remove_from_grid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemoveOutcome {
    /// Tile returned to the well of its origin quadrant
    Returned { to: QuadrantKey },
    /// Tile was not in the named grid quadrant
    Absent,
}

/// Wells and grid together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub wells: Quadrants<Vec<Tile>>,
    #[serde(default)]
    pub grid: Quadrants<Vec<Tile>>,
}

impl Board {
    pub fn new(wells: Quadrants<Vec<Tile>>, grid: Quadrants<Vec<Tile>>) -> Self {
        Self { wells, grid }
    }

    /// Find a tile by id in any well or grid quadrant
    pub fn locate(&self, tile_id: &str) -> Option<(Location, &Tile)> {
        for (key, tiles) in self.wells.iter() {
            if let Some(tile) = tiles.iter().find(|t| t.id == tile_id) {
                return Some((Location::Well(key), tile));
            }
        }
        for (key, tiles) in self.grid.iter() {
            if let Some(tile) = tiles.iter().find(|t| t.id == tile_id) {
                return Some((Location::Grid(key), tile));
            }
        }
        None
    }

    /// Move a tile from wherever it is into the target grid quadrant
    pub fn move_to_grid(&mut self, tile_id: &str, target: QuadrantKey) -> MoveOutcome {
        let target_tiles = &self.grid[target];
        if target_tiles.len() >= MAX_TILES_PER_QUADRANT {
            debug!(tile_id, quadrant = %target, "Move rejected: grid quadrant full");
            return MoveOutcome::GridFull;
        }
        if target_tiles.iter().any(|t| t.id == tile_id) {
            debug!(tile_id, quadrant = %target, "Move rejected: tile already placed");
            return MoveOutcome::AlreadyPlaced;
        }

        let Some((from, _)) = self.locate(tile_id) else {
            debug!(tile_id, "Move rejected: unknown tile");
            return MoveOutcome::UnknownTile;
        };

        let Some(tile) = self.take(tile_id) else {
            return MoveOutcome::UnknownTile;
        };
        self.grid[target].push(tile);

        debug!(tile_id, ?from, quadrant = %target, "Tile moved to grid");
        MoveOutcome::Moved { from }
    }

    /// Take a tile out of a grid quadrant and return it to its origin well
    pub fn remove_from_grid(&mut self, tile_id: &str, quadrant: QuadrantKey) -> RemoveOutcome {
        let tiles = &mut self.grid[quadrant];
        let Some(position) = tiles.iter().position(|t| t.id == tile_id) else {
            return RemoveOutcome::Absent;
        };

        let tile = tiles.remove(position);
        let origin = tile.quadrant;
        self.wells[origin].push(tile);

        debug!(tile_id, from = %quadrant, to = %origin, "Tile returned to well");
        RemoveOutcome::Returned { to: origin }
    }

    /// Author a new tile in a well
    pub fn add_custom_tile(&mut self, quadrant: QuadrantKey, text: &str) -> Result<Tile> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("Tile text must not be empty".to_string()));
        }
        let tile = Tile::custom(quadrant, text);
        self.wells[quadrant].push(tile.clone());
        Ok(tile)
    }

    /// Edit the text of a tile sitting in a well
    ///
    /// Returns `false` if the well does not hold the tile.
    pub fn update_well_tile(&mut self, quadrant: QuadrantKey, tile_id: &str, text: &str) -> bool {
        match self.wells[quadrant].iter_mut().find(|t| t.id == tile_id) {
            Some(tile) => {
                tile.text = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Destroy a tile held in any well
    ///
    /// This is the only operation that removes a tile from the board.
    /// Grid tiles must be returned to a well first.
    pub fn remove_from_well(&mut self, tile_id: &str) -> Option<Tile> {
        for tiles in self.wells.values_mut() {
            if let Some(position) = tiles.iter().position(|t| t.id == tile_id) {
                return Some(tiles.remove(position));
            }
        }
        None
    }

    /// Install a freshly generated batch of wells
    ///
    /// Tiles whose id already sits in the grid are skipped. Returns the
    /// number of skipped tiles.
    pub fn replace_wells(&mut self, wells: Quadrants<Vec<Tile>>) -> usize {
        let mut skipped = 0;
        let grid = &self.grid;
        self.wells = wells.map(|_, tiles| {
            tiles
                .into_iter()
                .filter(|tile| {
                    let placed = grid.iter().any(|(_, g)| g.iter().any(|t| t.id == tile.id));
                    if placed {
                        skipped += 1;
                    }
                    !placed
                })
                .collect()
        });
        skipped
    }

    /// Verify capacity and id uniqueness, e.g. for a board supplied wholesale
    pub fn check_invariants(&self) -> Result<()> {
        for (key, tiles) in self.grid.iter() {
            if tiles.len() > MAX_TILES_PER_QUADRANT {
                return Err(Error::InvalidInput(format!(
                    "Grid quadrant {} holds {} tiles (max {})",
                    key,
                    tiles.len(),
                    MAX_TILES_PER_QUADRANT
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for (_, tiles) in self.wells.iter().chain(self.grid.iter()) {
            for tile in tiles {
                if !seen.insert(tile.id.as_str()) {
                    return Err(Error::InvalidInput(format!("Duplicate tile id: {}", tile.id)));
                }
            }
        }
        Ok(())
    }

    /// Number of tiles across wells and grid
    pub fn tile_count(&self) -> usize {
        self.wells.total_len() + self.grid.total_len()
    }

    pub fn grid_count(&self) -> usize {
        self.grid.total_len()
    }

    /// Remove every occurrence of `tile_id`, returning the first one found
    fn take(&mut self, tile_id: &str) -> Option<Tile> {
        let mut taken = None;
        for tiles in self.wells.values_mut().chain(self.grid.values_mut()) {
            tiles.retain(|t| {
                if t.id == tile_id {
                    if taken.is_none() {
                        taken = Some(t.clone());
                    }
                    false
                } else {
                    true
                }
            });
        }
        taken
    }
}
