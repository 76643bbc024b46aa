//! Read-only share snapshots and the plain-text playbook render

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::ResearchInput;
use crate::framework::Framework;
use crate::quadrant::{QuadrantKey, Quadrants};
use crate::research::ResearchSection;
use crate::tile::Tile;

/// Length of a share id
pub const SHARE_ID_LEN: usize = 8;

/// Frozen copy of the parts of a framework worth sharing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSnapshot {
    #[serde(default)]
    pub research_input: ResearchInput,
    #[serde(default)]
    pub research_sections: Vec<ResearchSection>,
    #[serde(default)]
    pub grid: Quadrants<Vec<Tile>>,
    pub created_at: DateTime<Utc>,
}

impl SharedSnapshot {
    pub fn of(framework: &Framework) -> Self {
        Self {
            research_input: framework.research_input.clone(),
            research_sections: framework.research_sections.clone(),
            grid: framework.board.grid.clone(),
            created_at: Utc::now(),
        }
    }
}

/// A stored snapshot with its short id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSession {
    pub id: String,
    pub framework_id: Option<Uuid>,
    pub data: SharedSnapshot,
}

/// Short opaque id: the first 8 characters of a v4 UUID
pub fn generate_share_id() -> String {
    let mut id = Uuid::new_v4().to_string();
    id.truncate(SHARE_ID_LEN);
    id
}

/// Public URL of a share page
pub fn share_url(base_url: &str, share_id: &str) -> String {
    format!("{}/share/{}", base_url.trim_end_matches('/'), share_id)
}

/// File name for a downloaded playbook, e.g. `leesburg-grid-jane-doe.md`
///
/// The slug keeps only `[a-z0-9-]` so the name is safe in a
/// `Content-Disposition` header.
pub fn playbook_file_name(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "leesburg-grid.md".to_string()
    } else {
        format!("leesburg-grid-{}.md", slug)
    }
}

/// Render a snapshot as a Markdown playbook
///
/// Quadrants appear in grid display order (Our Story, Their Defense,
/// The Attack, The Counter); research follows the grid.
pub fn render_markdown(snapshot: &SharedSnapshot) -> String {
    let input = &snapshot.research_input;
    let mut out = String::new();

    let name = if input.name.trim().is_empty() {
        "Untitled"
    } else {
        input.name.trim()
    };
    out.push_str(&format!("# Leesburg Grid: {}\n", name));
    out.push_str(&format!(
        "\n{} | {}\n",
        input.location.trim(),
        snapshot.created_at.format("%Y-%m-%d")
    ));
    if !input.goal.trim().is_empty() {
        out.push_str(&format!("\n**Goal:** {}\n", input.goal.trim()));
    }

    for key in QuadrantKey::DISPLAY_ORDER {
        out.push_str(&format!("\n## {}\n\n_{}_\n\n", key.title(), key.subtitle()));
        let tiles = &snapshot.grid[key];
        if tiles.is_empty() {
            out.push_str("_No messages placed._\n");
        }
        for tile in tiles {
            out.push_str(&format!("- {}\n", tile.text));
        }
    }

    if !snapshot.research_sections.is_empty() {
        out.push_str("\n---\n\n## Research\n");
        for section in &snapshot.research_sections {
            out.push_str(&format!("\n### {}\n\n{}\n", section.title, section.content.trim()));
        }
    }

    out
}
