//! Research cache: AI-generated briefs and map metadata

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Fixed identifiers of the five research sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchSectionId {
    Geographic,
    Electoral,
    Incumbent,
    Issues,
    Context,
}

impl ResearchSectionId {
    pub const ALL: [ResearchSectionId; 5] = [
        ResearchSectionId::Geographic,
        ResearchSectionId::Electoral,
        ResearchSectionId::Incumbent,
        ResearchSectionId::Issues,
        ResearchSectionId::Context,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchSectionId::Geographic => "geographic",
            ResearchSectionId::Electoral => "electoral",
            ResearchSectionId::Incumbent => "incumbent",
            ResearchSectionId::Issues => "issues",
            ResearchSectionId::Context => "context",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ResearchSectionId::Geographic => "Geographic Profile",
            ResearchSectionId::Electoral => "Electoral Data",
            ResearchSectionId::Incumbent => "Incumbent Audit",
            ResearchSectionId::Issues => "Issue Pulse",
            ResearchSectionId::Context => "Strategic Context",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ResearchSectionId::Geographic => "MapPin",
            ResearchSectionId::Electoral => "BarChart3",
            ResearchSectionId::Incumbent => "UserSearch",
            ResearchSectionId::Issues => "TrendingUp",
            ResearchSectionId::Context => "Newspaper",
        }
    }
}

impl fmt::Display for ResearchSectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResearchSectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResearchSectionId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown research section: {}", s)))
    }
}

/// One prose section of the research brief
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSection {
    pub id: ResearchSectionId,
    pub title: String,
    pub icon: String,
    pub content: String,
}

impl ResearchSection {
    /// Section with the fixed title and icon for `id`
    pub fn new(id: ResearchSectionId, content: impl Into<String>) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            icon: id.icon().to_string(),
            content: content.into(),
        }
    }
}

/// Replace the content of one section, returning `false` if absent
pub fn update_section(sections: &mut [ResearchSection], id: ResearchSectionId, content: &str) -> bool {
    match sections.iter_mut().find(|s| s.id == id) {
        Some(section) => {
            section.content = content.to_string();
            true
        }
        None => false,
    }
}

/// District map hint returned alongside research
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_zoom() -> u8 {
    10
}

impl MapData {
    /// Coordinates inside the valid WGS84 range
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng) && self.zoom <= 20
    }
}

/// Research brief on one opposition entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OppositionResearch {
    pub opposition_id: String,
    #[serde(default)]
    pub opposition_name: String,
    #[serde(default)]
    pub content: String,
}

/// Replace the content of one opposition brief, returning `false` if absent
pub fn update_opposition_research(
    research: &mut [OppositionResearch],
    opposition_id: &str,
    content: &str,
) -> bool {
    match research.iter_mut().find(|r| r.opposition_id == opposition_id) {
        Some(entry) => {
            entry.content = content.to_string();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_metadata() {
        let section = ResearchSection::new(ResearchSectionId::Issues, "Roads and schools");
        assert_eq!(section.title, "Issue Pulse");
        assert_eq!(section.icon, "TrendingUp");
        assert_eq!(serde_json::to_value(&section).unwrap()["id"], "issues");
    }

    #[test]
    fn test_update_section() {
        let mut sections: Vec<_> = ResearchSectionId::ALL
            .into_iter()
            .map(|id| ResearchSection::new(id, ""))
            .collect();
        assert!(update_section(&mut sections, ResearchSectionId::Context, "New context"));
        assert_eq!(sections[4].content, "New context");

        let mut empty: Vec<ResearchSection> = Vec::new();
        assert!(!update_section(&mut empty, ResearchSectionId::Context, "x"));
    }

    #[test]
    fn test_map_data_defaults_and_validation() {
        let map: MapData = serde_json::from_str(r#"{"lat": 39.1, "lng": -77.5}"#).unwrap();
        assert_eq!(map.zoom, 10);
        assert!(map.boundary_query.is_none());
        assert!(map.is_valid());

        let bad = MapData { lat: 91.0, ..map };
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_update_opposition_research() {
        let mut research = vec![OppositionResearch {
            opposition_id: "opp-1".to_string(),
            opposition_name: "John Roe".to_string(),
            content: "old".to_string(),
        }];
        assert!(update_opposition_research(&mut research, "opp-1", "new"));
        assert_eq!(research[0].content, "new");
        assert!(!update_opposition_research(&mut research, "opp-2", "new"));
    }
}
