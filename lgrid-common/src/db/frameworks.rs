//! Frameworks table operations

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::entity::EntityType;
use crate::framework::{Framework, FrameworkRecord, FrameworkStatus, FrameworkSummary};
use crate::wizard::WizardStep;
use crate::{Error, Result};

const SELECT_RECORD: &str = r#"
    SELECT id, title, status, current_step, entity_type, name, location, goal, website,
           social_media, oppositions, research_sections, map_data, opposition_research,
           wells, grid, created_at, updated_at
    FROM frameworks
"#;

/// All frameworks, most recently edited first
pub async fn list_frameworks(pool: &SqlitePool) -> Result<Vec<FrameworkSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, status, current_step, entity_type, location, created_at, updated_at
        FROM frameworks
        ORDER BY updated_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(FrameworkSummary {
                id: parse_id(row.try_get("id")?)?,
                title: row.try_get("title")?,
                status: parse_status(row.try_get("status")?)?,
                current_step: parse_step(row.try_get("current_step")?)?,
                entity_type: parse_entity_type(row.try_get("entity_type")?)?,
                location: row.try_get("location")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .collect()
}

/// Insert a fresh draft framework
pub async fn create_framework(pool: &SqlitePool) -> Result<FrameworkRecord> {
    let record = FrameworkRecord::from(&Framework::new());
    save_framework(pool, &record).await?;
    debug!(framework_id = %record.id, "Framework created");
    Ok(record)
}

pub async fn load_framework(pool: &SqlitePool, id: Uuid) -> Result<Option<FrameworkRecord>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_RECORD))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Upsert the full record (last write wins)
pub async fn save_framework(pool: &SqlitePool, record: &FrameworkRecord) -> Result<()> {
    let map_data = record.map_data.as_ref().map(serde_json::to_string).transpose()?;

    sqlx::query(
        r#"
        INSERT INTO frameworks (
            id, title, status, current_step, entity_type, name, location, goal, website,
            social_media, oppositions, research_sections, map_data, opposition_research,
            wells, grid, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            status = excluded.status,
            current_step = excluded.current_step,
            entity_type = excluded.entity_type,
            name = excluded.name,
            location = excluded.location,
            goal = excluded.goal,
            website = excluded.website,
            social_media = excluded.social_media,
            oppositions = excluded.oppositions,
            research_sections = excluded.research_sections,
            map_data = excluded.map_data,
            opposition_research = excluded.opposition_research,
            wells = excluded.wells,
            grid = excluded.grid,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.title)
    .bind(record.status.as_str())
    .bind(record.current_step.number() as i64)
    .bind(record.entity_type.as_str())
    .bind(&record.name)
    .bind(&record.location)
    .bind(&record.goal)
    .bind(&record.website)
    .bind(to_json(&record.social_media)?)
    .bind(to_json(&record.oppositions)?)
    .bind(to_json(&record.research_sections)?)
    .bind(map_data)
    .bind(to_json(&record.opposition_research)?)
    .bind(to_json(&record.wells)?)
    .bind(to_json(&record.grid)?)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns `false` if no such framework existed
pub async fn delete_framework(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM frameworks WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn record_from_row(row: &SqliteRow) -> Result<FrameworkRecord> {
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let map_data: Option<String> = row.try_get("map_data")?;

    Ok(FrameworkRecord {
        id: parse_id(row.try_get("id")?)?,
        title: row.try_get("title")?,
        status: parse_status(row.try_get("status")?)?,
        current_step: parse_step(row.try_get("current_step")?)?,
        entity_type: parse_entity_type(row.try_get("entity_type")?)?,
        name: row.try_get("name")?,
        location: row.try_get("location")?,
        goal: row.try_get("goal")?,
        website: row.try_get("website")?,
        social_media: from_json(row.try_get("social_media")?)?,
        oppositions: from_json(row.try_get("oppositions")?)?,
        research_sections: from_json(row.try_get("research_sections")?)?,
        map_data: match map_data.as_deref().map(str::trim) {
            None | Some("") | Some("null") => None,
            Some(json) => Some(serde_json::from_str(json)?),
        },
        opposition_research: from_json(row.try_get("opposition_research")?)?,
        wells: from_json(row.try_get("wells")?)?,
        grid: from_json(row.try_get("grid")?)?,
        created_at,
        updated_at: row.try_get("updated_at")?,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// NULL or empty column decodes to the type's default
fn from_json<T: DeserializeOwned + Default>(column: Option<String>) -> Result<T> {
    match column.as_deref().map(str::trim) {
        None | Some("") | Some("null") => Ok(T::default()),
        Some(json) => Ok(serde_json::from_str(json)?),
    }
}

fn parse_id(id: String) -> Result<Uuid> {
    Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("Corrupt framework id {}: {}", id, e)))
}

fn parse_status(status: String) -> Result<FrameworkStatus> {
    FrameworkStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown framework status: {}", status)))
}

fn parse_step(step: i64) -> Result<WizardStep> {
    u8::try_from(step)
        .ok()
        .and_then(|s| WizardStep::try_from(s).ok())
        .ok_or_else(|| Error::Internal(format!("Invalid stored wizard step: {}", step)))
}

fn parse_entity_type(entity_type: String) -> Result<EntityType> {
    serde_json::from_value(serde_json::Value::String(entity_type.clone()))
        .map_err(|_| Error::Internal(format!("Unknown entity type: {}", entity_type)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_tables;
    use crate::quadrant::QuadrantKey;
    use crate::research::{MapData, ResearchSection, ResearchSectionId};
    use crate::tile::Tile;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_then_load() {
        let pool = setup_test_db().await;
        let created = create_framework(&pool).await.unwrap();

        let loaded = load_framework(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, FrameworkStatus::Draft);
        assert_eq!(loaded.current_step, WizardStep::Input);
        assert_eq!(loaded.title, "Untitled Framework");
        assert!(loaded.wells.is_all_empty());
        assert!(loaded.map_data.is_none());
    }

    #[tokio::test]
    async fn test_save_upserts_full_state() {
        let pool = setup_test_db().await;
        let mut framework = Framework::from(create_framework(&pool).await.unwrap());

        framework.research_input.name = "Jane Doe".to_string();
        framework.refresh_title();
        framework.current_step = WizardStep::Playbook;
        framework
            .research_sections
            .push(ResearchSection::new(ResearchSectionId::Electoral, "R+2"));
        framework.map_data = Some(MapData {
            lat: 39.1,
            lng: -77.5,
            zoom: 11,
            boundary_query: Some("Leesburg, Virginia".to_string()),
            label: None,
        });
        framework
            .board
            .grid
            .their_defense
            .push(Tile::generated(QuadrantKey::TheirDefense, 3, "He claims experience"));

        save_framework(&pool, &FrameworkRecord::from(&framework)).await.unwrap();
        let loaded = Framework::from(load_framework(&pool, framework.id).await.unwrap().unwrap());

        assert_eq!(loaded.title, "Jane Doe");
        assert_eq!(loaded.status(), FrameworkStatus::Complete);
        assert_eq!(loaded.research_sections, framework.research_sections);
        assert_eq!(loaded.map_data, framework.map_data);
        assert_eq!(loaded.board, framework.board);
        assert_eq!(loaded.current_step, WizardStep::Playbook);
    }

    #[tokio::test]
    async fn test_null_json_columns_load_as_empty() {
        let pool = setup_test_db().await;
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO frameworks (id, created_at, updated_at, wells, grid) VALUES (?, ?, ?, '{}', NULL)",
        )
        .bind(id.to_string())
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let loaded = load_framework(&pool, id).await.unwrap().unwrap();
        assert!(loaded.wells.is_all_empty());
        assert!(loaded.grid.is_all_empty());
        assert!(loaded.oppositions.is_empty());
        assert_eq!(loaded.current_step, WizardStep::Input);
    }

    #[tokio::test]
    async fn test_list_orders_by_recent_edit() {
        let pool = setup_test_db().await;
        let first = create_framework(&pool).await.unwrap();
        let mut second = create_framework(&pool).await.unwrap();
        second.updated_at = first.updated_at - chrono::Duration::hours(1);
        save_framework(&pool, &second).await.unwrap();

        let list = list_frameworks(&pool).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[1].id, second.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let pool = setup_test_db().await;
        let record = create_framework(&pool).await.unwrap();

        assert!(delete_framework(&pool, record.id).await.unwrap());
        assert!(!delete_framework(&pool, record.id).await.unwrap());
        assert!(load_framework(&pool, record.id).await.unwrap().is_none());
    }
}
