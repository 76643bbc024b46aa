//! Campaign profile (entity store)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of organization running the campaign
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Candidate,
    Pac,
    Business,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Candidate => "candidate",
            EntityType::Pac => "pac",
            EntityType::Business => "business",
        }
    }
}

/// Social media handles, all optional free text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialMedia {
    pub twitter: String,
    pub facebook: String,
    pub instagram: String,
    pub linkedin: String,
    pub tiktok: String,
    pub youtube: String,
}

impl SocialMedia {
    /// Non-empty handles as `(platform, handle)` pairs
    pub fn handles(&self) -> Vec<(&'static str, &str)> {
        [
            ("X / Twitter", self.twitter.as_str()),
            ("Facebook", self.facebook.as_str()),
            ("Instagram", self.instagram.as_str()),
            ("LinkedIn", self.linkedin.as_str()),
            ("TikTok", self.tiktok.as_str()),
            ("YouTube", self.youtube.as_str()),
        ]
        .into_iter()
        .filter(|(_, handle)| !handle.trim().is_empty())
        .collect()
    }
}

/// An opponent, competing PAC, or rival organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opposition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub website: String,
}

impl Opposition {
    /// Blank opposition entry with a fresh id
    pub fn blank() -> Self {
        Self {
            id: format!("opp-{}", Uuid::new_v4().simple()),
            name: String::new(),
            website: String::new(),
        }
    }
}

/// Editable field of an [`Opposition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OppositionField {
    Name,
    Website,
}

/// Campaign definition entered on the first wizard step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResearchInput {
    pub entity_type: EntityType,
    pub name: String,
    pub location: String,
    pub goal: String,
    pub website: String,
    pub social_media: SocialMedia,
    pub oppositions: Vec<Opposition>,
}

impl ResearchInput {
    /// Name, location and goal are required before research can run
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.location.trim().is_empty() {
            missing.push("location");
        }
        if self.goal.trim().is_empty() {
            missing.push("goal");
        }
        missing
    }

    /// Append a blank opposition and return its id
    pub fn add_opposition(&mut self) -> String {
        let opposition = Opposition::blank();
        let id = opposition.id.clone();
        self.oppositions.push(opposition);
        id
    }

    pub fn remove_opposition(&mut self, id: &str) -> bool {
        let before = self.oppositions.len();
        self.oppositions.retain(|o| o.id != id);
        self.oppositions.len() != before
    }

    pub fn update_opposition(&mut self, id: &str, field: OppositionField, value: &str) -> bool {
        match self.oppositions.iter_mut().find(|o| o.id == id) {
            Some(opposition) => {
                match field {
                    OppositionField::Name => opposition.name = value.to_string(),
                    OppositionField::Website => opposition.website = value.to_string(),
                }
                true
            }
            None => false,
        }
    }

    /// Oppositions with a non-blank name (the ones worth researching)
    pub fn named_oppositions(&self) -> Vec<Opposition> {
        self.oppositions
            .iter()
            .filter(|o| !o.name.trim().is_empty())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_fields() {
        let mut input = ResearchInput::default();
        assert_eq!(input.missing_required(), vec!["name", "location", "goal"]);

        input.name = "Jane Doe".to_string();
        input.location = "VA-10".to_string();
        input.goal = "  ".to_string();
        assert_eq!(input.missing_required(), vec!["goal"]);
    }

    #[test]
    fn test_opposition_lifecycle() {
        let mut input = ResearchInput::default();
        let id = input.add_opposition();
        assert!(id.starts_with("opp-"));

        assert!(input.update_opposition(&id, OppositionField::Name, "John Roe"));
        assert!(input.update_opposition(&id, OppositionField::Website, "roe.example"));
        assert_eq!(input.oppositions[0].name, "John Roe");
        assert_eq!(input.oppositions[0].website, "roe.example");

        assert!(!input.update_opposition("opp-missing", OppositionField::Name, "x"));
        assert!(input.remove_opposition(&id));
        assert!(!input.remove_opposition(&id));
        assert!(input.oppositions.is_empty());
    }

    #[test]
    fn test_named_oppositions_filters_blank() {
        let mut input = ResearchInput::default();
        let named = input.add_opposition();
        input.add_opposition();
        input.update_opposition(&named, OppositionField::Name, "PAC for Roads");

        let list = input.named_oppositions();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, named);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = serde_json::json!({
            "entityType": "pac",
            "name": "Forward Fund",
            "socialMedia": { "twitter": "@ff" }
        });
        let input: ResearchInput = serde_json::from_value(json).unwrap();
        assert_eq!(input.entity_type, EntityType::Pac);
        assert_eq!(input.social_media.twitter, "@ff");
        assert_eq!(input.social_media.handles(), vec![("X / Twitter", "@ff")]);
        assert!(input.oppositions.is_empty());
    }
}
