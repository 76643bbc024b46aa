//! [`Generator`] backed by the Anthropic Messages API
//!
//! Prompts ask for strict JSON; replies are parsed tolerantly with
//! `lgrid_common::extract`, which skips surrounding prose.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use lgrid_common::entity::{Opposition, ResearchInput};
use lgrid_common::extract::{first_array, first_object};
use lgrid_common::research::{MapData, OppositionResearch, ResearchSection, ResearchSectionId};
use lgrid_common::tile::Tile;
use lgrid_common::Quadrants;

use super::anthropic_client::AnthropicClient;
use super::generator::{GenerationError, Generator, ResearchOutput, TILES_PER_QUADRANT};

/// Content for a section the model left out
pub const PLACEHOLDER_CONTENT: &str = "Research data unavailable. Edit this section with your own findings.";

const RESEARCH_SYSTEM: &str = "You are a senior political research analyst. You produce concise, \
actionable intelligence briefs for political strategists. Be specific with real data points when \
available, and clearly flag any estimates or general assessments. Use a professional, direct tone.";

const OPPOSITION_SYSTEM: &str = "You are a senior political opposition research analyst. You produce \
concise, actionable intelligence on political opponents, competing PACs, or rival organizations. Be \
specific with data points when available and flag estimates. Use a professional, direct tone.";

const STRATEGY_SYSTEM: &str = "Act as a Lead Political Strategist building a Leesburg Grid, a 2x2 \
messaging matrix. Quadrants: \"Our Story\" (what we say about ourselves), \"The Attack\" (what we say \
about them), \"Their Defense\" (what they say about themselves), \"The Counter\" (what they say about \
us). Every point in Our Story must have a logical counter-punch in The Counter, and every attack must \
be met with their likely defense. Each angle is a concise 1-2 sentence messaging point, specific to \
the research provided.";

pub struct AnthropicGenerator {
    client: AnthropicClient,
}

impl AnthropicGenerator {
    pub fn new(client: AnthropicClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn research(&self, profile: &ResearchInput) -> Result<ResearchOutput, GenerationError> {
        let reply = self.client.complete(RESEARCH_SYSTEM, &research_prompt(profile)).await?;
        parse_research(&reply)
    }

    async fn opposition_research(
        &self,
        profile: &ResearchInput,
        oppositions: &[Opposition],
    ) -> Result<Vec<OppositionResearch>, GenerationError> {
        let reply = self
            .client
            .complete(OPPOSITION_SYSTEM, &opposition_prompt(profile, oppositions))
            .await?;
        parse_opposition_research(&reply, oppositions)
    }

    async fn strategy(
        &self,
        profile: &ResearchInput,
        sections: &[ResearchSection],
    ) -> Result<Quadrants<Vec<Tile>>, GenerationError> {
        let reply = self
            .client
            .complete(STRATEGY_SYSTEM, &strategy_prompt(profile, sections))
            .await?;
        parse_strategy(&reply)
    }
}

fn research_prompt(profile: &ResearchInput) -> String {
    let mut prompt = format!(
        "Research the following political entity and produce a comprehensive intelligence brief:\n\n\
         Entity Type: {}\nName: {}\nLocation/District: {}\nStrategic Goal: {}\n",
        profile.entity_type.as_str(),
        profile.name.trim(),
        profile.location.trim(),
        profile.goal.trim(),
    );
    if !profile.website.trim().is_empty() {
        prompt.push_str(&format!("Website: {}\n", profile.website.trim()));
    }
    for (platform, handle) in profile.social_media.handles() {
        prompt.push_str(&format!("{}: {}\n", platform, handle.trim()));
    }
    prompt.push_str(
        "\nReturn raw JSON only, with one 2-3 paragraph string per key:\n\
         {\"geographic\": \"district profile\", \"electoral\": \"recent margins, turnout, win numbers\", \
         \"incumbent\": \"incumbent or primary opponent audit\", \"issues\": \"top local concerns\", \
         \"context\": \"current strategic landscape\", \
         \"mapData\": {\"lat\": 0.0, \"lng\": 0.0, \"zoom\": 10, \"boundaryQuery\": \"geocoder query\", \"label\": \"district name\"}}",
    );
    prompt
}

fn opposition_prompt(profile: &ResearchInput, oppositions: &[Opposition]) -> String {
    let list = oppositions
        .iter()
        .map(|opp| {
            if opp.website.trim().is_empty() {
                format!("- ID: \"{}\", Name: \"{}\"", opp.id, opp.name.trim())
            } else {
                format!(
                    "- ID: \"{}\", Name: \"{}\", Website: {}",
                    opp.id,
                    opp.name.trim(),
                    opp.website.trim()
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Research the following opposition entities for a {} campaign:\n\n\
         Campaign: {}\nLocation: {}\nGoal: {}\n\nOpposition to research:\n{}\n\n\
         For each entity cover background, positions and voting record, vulnerabilities, public \
         perception, fundraising and a strategic assessment.\n\
         Return a raw JSON array only:\n\
         [{{\"oppositionId\": \"id from the list\", \"oppositionName\": \"their name\", \"content\": \"3-5 paragraph brief\"}}]",
        profile.entity_type.as_str(),
        profile.name.trim(),
        profile.location.trim(),
        profile.goal.trim(),
        list,
    )
}

fn strategy_prompt(profile: &ResearchInput, sections: &[ResearchSection]) -> String {
    let research = sections
        .iter()
        .map(|s| format!("## {}\n{}", s.title, s.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Using the following research, generate a Leesburg Grid with exactly {n} strategy angles per \
         quadrant.\n\nENTITY: {} ({})\nLOCATION: {}\nGOAL: {}\n\nRESEARCH:\n{}\n\n\
         Return raw JSON only:\n\
         {{\"our-story\": [\"angle\", ...], \"the-attack\": [...], \"their-defense\": [...], \"the-counter\": [...]}}",
        profile.name.trim(),
        profile.entity_type.as_str(),
        profile.location.trim(),
        profile.goal.trim(),
        research,
        n = TILES_PER_QUADRANT,
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResearchReply {
    geographic: Option<String>,
    electoral: Option<String>,
    incumbent: Option<String>,
    issues: Option<String>,
    context: Option<String>,
    #[serde(rename = "mapData")]
    map_data: Option<Value>,
}

/// Five sections in fixed order; missing keys get placeholder content,
/// an unusable map hint is dropped
pub fn parse_research(reply: &str) -> Result<ResearchOutput, GenerationError> {
    let parsed: ResearchReply = first_object(reply).map_err(|e| GenerationError::Parse(e.to_string()))?;

    let sections = ResearchSectionId::ALL
        .into_iter()
        .map(|id| {
            let content = match id {
                ResearchSectionId::Geographic => &parsed.geographic,
                ResearchSectionId::Electoral => &parsed.electoral,
                ResearchSectionId::Incumbent => &parsed.incumbent,
                ResearchSectionId::Issues => &parsed.issues,
                ResearchSectionId::Context => &parsed.context,
            };
            let content = content
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(PLACEHOLDER_CONTENT);
            ResearchSection::new(id, content)
        })
        .collect();

    let map_data = parsed
        .map_data
        .and_then(|value| serde_json::from_value::<MapData>(value).ok())
        .filter(MapData::is_valid);

    Ok(ResearchOutput { sections, map_data })
}

/// Wells from a keyed object of angle arrays
///
/// A missing quadrant yields an empty well; each quadrant is capped at
/// [`TILES_PER_QUADRANT`]. Ids are `<quadrant>-<index>`.
pub fn parse_strategy(reply: &str) -> Result<Quadrants<Vec<Tile>>, GenerationError> {
    let parsed: Quadrants<Vec<String>> =
        first_object(reply).map_err(|e| GenerationError::Parse(e.to_string()))?;

    Ok(parsed.map(|key, angles| {
        angles
            .into_iter()
            .map(|angle| angle.trim().to_string())
            .filter(|angle| !angle.is_empty())
            .take(TILES_PER_QUADRANT)
            .enumerate()
            .map(|(i, angle)| Tile::generated(key, i, angle))
            .collect()
    }))
}

/// Opposition briefs; a missing name is filled from the request
pub fn parse_opposition_research(
    reply: &str,
    oppositions: &[Opposition],
) -> Result<Vec<OppositionResearch>, GenerationError> {
    let mut briefs: Vec<OppositionResearch> =
        first_array(reply).map_err(|e| GenerationError::Parse(e.to_string()))?;

    for brief in &mut briefs {
        if brief.opposition_name.trim().is_empty() {
            if let Some(opp) = oppositions.iter().find(|o| o.id == brief.opposition_id) {
                brief.opposition_name = opp.name.clone();
            }
        }
    }
    Ok(briefs)
}
