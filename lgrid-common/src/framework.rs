//! Messaging framework: the full editable state of one project
//!
//! `Framework` is the in-memory context object. `FrameworkRecord` is its
//! flat wire/persistence shape (snake_case top level, as stored), and
//! `FrameworkPatch` is a last-write-wins partial update of that shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{EntityType, Opposition, ResearchInput, SocialMedia};
use crate::placement::Board;
use crate::quadrant::Quadrants;
use crate::research::{MapData, OppositionResearch, ResearchSection};
use crate::tile::Tile;
use crate::wizard::{Progress, WizardStep};

/// Title given to frameworks before a campaign name is entered
pub const DEFAULT_TITLE: &str = "Untitled Framework";

/// Completeness derived from the data present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkStatus {
    Draft,
    InProgress,
    Complete,
}

impl FrameworkStatus {
    /// Non-empty grid wins over everything; otherwise any research section
    /// makes the framework in progress.
    pub fn derive(research_sections: usize, grid_tiles: usize) -> Self {
        if grid_tiles > 0 {
            FrameworkStatus::Complete
        } else if research_sections > 0 {
            FrameworkStatus::InProgress
        } else {
            FrameworkStatus::Draft
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameworkStatus::Draft => "draft",
            FrameworkStatus::InProgress => "in_progress",
            FrameworkStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(FrameworkStatus::Draft),
            "in_progress" => Some(FrameworkStatus::InProgress),
            "complete" => Some(FrameworkStatus::Complete),
            _ => None,
        }
    }
}

/// Full state of one messaging framework
#[derive(Debug, Clone, PartialEq)]
pub struct Framework {
    pub id: Uuid,
    pub title: String,
    pub current_step: WizardStep,
    pub research_input: ResearchInput,
    pub research_sections: Vec<ResearchSection>,
    pub map_data: Option<MapData>,
    pub opposition_research: Vec<OppositionResearch>,
    pub board: Board,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Framework {
    /// Empty draft framework
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_TITLE.to_string(),
            current_step: WizardStep::Input,
            research_input: ResearchInput::default(),
            research_sections: Vec::new(),
            map_data: None,
            opposition_research: Vec::new(),
            board: Board::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            research_sections: self.research_sections.len(),
            grid_tiles: self.board.grid_count(),
        }
    }

    pub fn status(&self) -> FrameworkStatus {
        FrameworkStatus::derive(self.research_sections.len(), self.board.grid_count())
    }

    /// Title follows the campaign name once one is entered
    pub fn refresh_title(&mut self) {
        let name = self.research_input.name.trim();
        if !name.is_empty() {
            self.title = name.to_string();
        }
    }

    /// Clear everything except identity and creation time
    pub fn reset(&mut self) {
        let id = self.id;
        let created_at = self.created_at;
        *self = Framework {
            id,
            created_at,
            ..Framework::new()
        };
    }
}

impl Default for Framework {
    fn default() -> Self {
        Self::new()
    }
}

/// Stored/wire shape of a framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkRecord {
    pub id: Uuid,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub current_step: WizardStep,
    #[serde(default)]
    pub entity_type: EntityType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub social_media: SocialMedia,
    #[serde(default)]
    pub oppositions: Vec<Opposition>,
    #[serde(default)]
    pub research_sections: Vec<ResearchSection>,
    #[serde(default)]
    pub map_data: Option<MapData>,
    #[serde(default)]
    pub opposition_research: Vec<OppositionResearch>,
    #[serde(default)]
    pub wells: Quadrants<Vec<Tile>>,
    #[serde(default)]
    pub grid: Quadrants<Vec<Tile>>,
    pub status: FrameworkStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl From<&Framework> for FrameworkRecord {
    fn from(framework: &Framework) -> Self {
        let input = &framework.research_input;
        Self {
            id: framework.id,
            title: framework.title.clone(),
            current_step: framework.current_step,
            entity_type: input.entity_type,
            name: input.name.clone(),
            location: input.location.clone(),
            goal: input.goal.clone(),
            website: input.website.clone(),
            social_media: input.social_media.clone(),
            oppositions: input.oppositions.clone(),
            research_sections: framework.research_sections.clone(),
            map_data: framework.map_data.clone(),
            opposition_research: framework.opposition_research.clone(),
            wells: framework.board.wells.clone(),
            grid: framework.board.grid.clone(),
            status: framework.status(),
            created_at: framework.created_at,
            updated_at: framework.updated_at,
        }
    }
}

impl From<FrameworkRecord> for Framework {
    fn from(record: FrameworkRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            current_step: record.current_step,
            research_input: ResearchInput {
                entity_type: record.entity_type,
                name: record.name,
                location: record.location,
                goal: record.goal,
                website: record.website,
                social_media: record.social_media,
                oppositions: record.oppositions,
            },
            research_sections: record.research_sections,
            map_data: record.map_data,
            opposition_research: record.opposition_research,
            board: Board::new(record.wells, record.grid),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Partial update: absent fields are left as they are
///
/// `map_data` distinguishes "absent" from an explicit `null` that clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameworkPatch {
    pub current_step: Option<WizardStep>,
    pub entity_type: Option<EntityType>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub goal: Option<String>,
    pub website: Option<String>,
    pub social_media: Option<SocialMedia>,
    pub oppositions: Option<Vec<Opposition>>,
    pub research_sections: Option<Vec<ResearchSection>>,
    #[serde(default, with = "double_option")]
    pub map_data: Option<Option<MapData>>,
    pub opposition_research: Option<Vec<OppositionResearch>>,
    pub wells: Option<Quadrants<Vec<Tile>>>,
    pub grid: Option<Quadrants<Vec<Tile>>>,
}

impl FrameworkPatch {
    /// Apply onto `framework`, then refresh the derived title
    pub fn apply(self, framework: &mut Framework) {
        let input = &mut framework.research_input;
        if let Some(step) = self.current_step {
            framework.current_step = step;
        }
        if let Some(entity_type) = self.entity_type {
            input.entity_type = entity_type;
        }
        if let Some(name) = self.name {
            input.name = name;
        }
        if let Some(location) = self.location {
            input.location = location;
        }
        if let Some(goal) = self.goal {
            input.goal = goal;
        }
        if let Some(website) = self.website {
            input.website = website;
        }
        if let Some(social_media) = self.social_media {
            input.social_media = social_media;
        }
        if let Some(oppositions) = self.oppositions {
            input.oppositions = oppositions;
        }
        if let Some(sections) = self.research_sections {
            framework.research_sections = sections;
        }
        if let Some(map_data) = self.map_data {
            framework.map_data = map_data;
        }
        if let Some(research) = self.opposition_research {
            framework.opposition_research = research;
        }
        if let Some(wells) = self.wells {
            framework.board.wells = wells;
        }
        if let Some(grid) = self.grid {
            framework.board.grid = grid;
        }
        framework.refresh_title();
    }
}

/// List entry for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkSummary {
    pub id: Uuid,
    pub title: String,
    pub status: FrameworkStatus,
    pub current_step: WizardStep,
    pub entity_type: EntityType,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadrant::QuadrantKey;
    use crate::research::ResearchSectionId;

    fn placed_tile() -> Tile {
        Tile::generated(QuadrantKey::OurStory, 0, "Built the bridge")
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(FrameworkStatus::derive(0, 0), FrameworkStatus::Draft);
        assert_eq!(FrameworkStatus::derive(5, 0), FrameworkStatus::InProgress);
        assert_eq!(FrameworkStatus::derive(5, 3), FrameworkStatus::Complete);
        // Grid wins even without research
        assert_eq!(FrameworkStatus::derive(0, 1), FrameworkStatus::Complete);
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in [FrameworkStatus::Draft, FrameworkStatus::InProgress, FrameworkStatus::Complete] {
            assert_eq!(FrameworkStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FrameworkStatus::parse("archived"), None);
    }

    #[test]
    fn test_title_follows_non_blank_name() {
        let mut framework = Framework::new();
        assert_eq!(framework.title, DEFAULT_TITLE);

        framework.research_input.name = "   ".to_string();
        framework.refresh_title();
        assert_eq!(framework.title, DEFAULT_TITLE);

        framework.research_input.name = " Jane Doe for Council ".to_string();
        framework.refresh_title();
        assert_eq!(framework.title, "Jane Doe for Council");
    }

    #[test]
    fn test_record_conversion_preserves_state() {
        let mut framework = Framework::new();
        framework.research_input.name = "Jane Doe".to_string();
        framework.research_sections.push(ResearchSection::new(ResearchSectionId::Geographic, "Suburban"));
        framework.board.grid.our_story.push(placed_tile());

        let record = FrameworkRecord::from(&framework);
        assert_eq!(record.status, FrameworkStatus::Complete);
        assert_eq!(record.name, "Jane Doe");

        let back = Framework::from(record);
        assert_eq!(back, framework);
    }

    #[test]
    fn test_record_with_empty_maps_loads_empty_quadrants() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "wells": {},
            "grid": {},
            "status": "draft",
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let record: FrameworkRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.current_step, WizardStep::Input);
        assert_eq!(record.title, DEFAULT_TITLE);
        assert!(record.wells.is_all_empty());
        assert!(record.grid.is_all_empty());
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut framework = Framework::new();
        framework.research_input.location = "VA-10".to_string();
        framework.map_data = Some(MapData {
            lat: 39.0,
            lng: -77.5,
            zoom: 9,
            boundary_query: None,
            label: None,
        });

        let patch: FrameworkPatch = serde_json::from_value(serde_json::json!({
            "name": "Jane Doe",
            "current_step": 2,
        }))
        .unwrap();
        patch.apply(&mut framework);

        assert_eq!(framework.title, "Jane Doe");
        assert_eq!(framework.current_step, WizardStep::Strategy);
        assert_eq!(framework.research_input.location, "VA-10");
        assert!(framework.map_data.is_some());
    }

    #[test]
    fn test_patch_null_map_data_clears() {
        let mut framework = Framework::new();
        framework.map_data = Some(MapData {
            lat: 0.0,
            lng: 0.0,
            zoom: 3,
            boundary_query: None,
            label: None,
        });

        let patch: FrameworkPatch = serde_json::from_value(serde_json::json!({ "map_data": null })).unwrap();
        patch.apply(&mut framework);

        assert!(framework.map_data.is_none());
    }

    #[test]
    fn test_reset_keeps_identity() {
        let mut framework = Framework::new();
        let id = framework.id;
        framework.research_input.name = "Jane".to_string();
        framework.board.grid.our_story.push(placed_tile());

        framework.reset();

        assert_eq!(framework.id, id);
        assert_eq!(framework.status(), FrameworkStatus::Draft);
        assert!(framework.research_input.name.is_empty());
        assert_eq!(framework.board.tile_count(), 0);
    }
}
