//! Database access for metaslim-ingest
//!
//! One shared SQLite database in the root folder holds the local study
//! dataset and the settings key-value table.

pub mod settings;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the metaslim-ingest tables if they don't exist.
///
/// Public so tests can run the same migration against an in-memory pool.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Settings table for configuration persistence
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Local study dataset; doses is a JSON column
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studies (
            id TEXT PRIMARY KEY,
            drug_name TEXT NOT NULL,
            drug_class TEXT NOT NULL DEFAULT '',
            company TEXT NOT NULL DEFAULT '',
            trial_name TEXT NOT NULL,
            phase TEXT NOT NULL,
            has_t2d INTEGER NOT NULL DEFAULT 0,
            is_chinese_cohort INTEGER NOT NULL DEFAULT 0,
            duration_weeks INTEGER NOT NULL DEFAULT 0,
            formulation TEXT NOT NULL DEFAULT '',
            frequency TEXT NOT NULL DEFAULT '',
            doses TEXT NOT NULL,
            summary TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, studies)");

    Ok(())
}
