//! Generation boundary: research briefs, opposition briefs and strategy tiles
//!
//! The hosted language model is opaque to the rest of the service. Every
//! failure (network, non-2xx, empty reply, unparseable payload) surfaces as a
//! single [`GenerationError`]; nothing is retried automatically.

use async_trait::async_trait;
use thiserror::Error;

use lgrid_common::entity::{Opposition, ResearchInput};
use lgrid_common::research::{MapData, OppositionResearch, ResearchSection};
use lgrid_common::tile::Tile;
use lgrid_common::Quadrants;

/// Upper bound on tiles generated per quadrant
pub const TILES_PER_QUADRANT: usize = 9;

/// Generation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Language model is not configured (set LGRID_ANTHROPIC_API_KEY)")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("No text content in response")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Research call result
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOutput {
    /// Five sections in fixed order
    pub sections: Vec<ResearchSection>,
    pub map_data: Option<MapData>,
}

/// Opaque generation service
#[async_trait]
pub trait Generator: Send + Sync {
    /// Five research sections plus an optional map hint
    async fn research(&self, profile: &ResearchInput) -> Result<ResearchOutput, GenerationError>;

    /// One brief per named opposition
    async fn opposition_research(
        &self,
        profile: &ResearchInput,
        oppositions: &[Opposition],
    ) -> Result<Vec<OppositionResearch>, GenerationError>;

    /// Up to [`TILES_PER_QUADRANT`] tiles per quadrant
    async fn strategy(
        &self,
        profile: &ResearchInput,
        sections: &[ResearchSection],
    ) -> Result<Quadrants<Vec<Tile>>, GenerationError>;
}

/// Stand-in used when no API key is configured
pub struct UnconfiguredGenerator;

#[async_trait]
impl Generator for UnconfiguredGenerator {
    async fn research(&self, _profile: &ResearchInput) -> Result<ResearchOutput, GenerationError> {
        Err(GenerationError::NotConfigured)
    }

    async fn opposition_research(
        &self,
        _profile: &ResearchInput,
        _oppositions: &[Opposition],
    ) -> Result<Vec<OppositionResearch>, GenerationError> {
        Err(GenerationError::NotConfigured)
    }

    async fn strategy(
        &self,
        _profile: &ResearchInput,
        _sections: &[ResearchSection],
    ) -> Result<Quadrants<Vec<Tile>>, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}
