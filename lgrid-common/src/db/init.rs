//! Database initialization
//!
//! Creates the database file on first run and bootstraps every table with
//! `CREATE TABLE IF NOT EXISTS`, so startup is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Schema version recorded in the settings table
pub const SCHEMA_VERSION: i64 = 1;

/// Open (or create) the database file and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_frameworks_table(pool).await?;
    create_shared_sessions_table(pool).await?;

    super::settings::ensure_setting(pool, "schema_version", &SCHEMA_VERSION.to_string()).await?;
    Ok(())
}

/// Stores application key-value pairs
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per framework; nested structures are JSON text columns
pub async fn create_frameworks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS frameworks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT 'Untitled Framework',
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'in_progress', 'complete')),
            current_step INTEGER NOT NULL DEFAULT 1 CHECK (current_step BETWEEN 1 AND 3),
            entity_type TEXT NOT NULL DEFAULT 'candidate',
            name TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            goal TEXT NOT NULL DEFAULT '',
            website TEXT NOT NULL DEFAULT '',
            social_media TEXT,
            oppositions TEXT,
            research_sections TEXT,
            map_data TEXT,
            opposition_research TEXT,
            wells TEXT,
            grid TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_frameworks_updated_at ON frameworks(updated_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Share snapshots; `framework_id` is informational and not a foreign key
pub async fn create_shared_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shared_sessions (
            id TEXT PRIMARY KEY,
            framework_id TEXT,
            data TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
