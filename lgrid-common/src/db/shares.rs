//! Shared sessions table operations

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::share::{SharedSession, SharedSnapshot};
use crate::{Error, Result};

pub async fn insert_share(pool: &SqlitePool, session: &SharedSession) -> Result<()> {
    sqlx::query("INSERT INTO shared_sessions (id, framework_id, data, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.framework_id.map(|id| id.to_string()))
        .bind(serde_json::to_string(&session.data)?)
        .bind(session.data.created_at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_share(pool: &SqlitePool, id: &str) -> Result<Option<SharedSession>> {
    let row: Option<(String, Option<String>, String)> =
        sqlx::query_as("SELECT id, framework_id, data FROM shared_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    let Some((id, framework_id, data)) = row else {
        return Ok(None);
    };

    let framework_id = framework_id
        .map(|fid| Uuid::parse_str(&fid))
        .transpose()
        .map_err(|e| Error::Internal(format!("Corrupt framework id on share {}: {}", id, e)))?;
    let data: SharedSnapshot = serde_json::from_str(&data)?;

    Ok(Some(SharedSession { id, framework_id, data }))
}
