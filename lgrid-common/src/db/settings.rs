//! Settings table key-value accessors

use sqlx::SqlitePool;

use crate::Result;

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|(value,)| value))
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Write `default` only if the key is missing or NULL
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default: &str) -> Result<()> {
    if get_setting(pool, key).await?.is_none() {
        set_setting(pool, key, default).await?;
    }
    Ok(())
}
