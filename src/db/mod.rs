mod models;

pub use models::*;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Open (or create) the SQLite database under `data_dir` and bring the
/// schema up to date.
pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("rentr.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // WAL for concurrent readers; foreign keys are off by default in SQLite
    for pragma in [
        "PRAGMA journal_mode = WAL",
        "PRAGMA synchronous = NORMAL",
        "PRAGMA foreign_keys = ON",
    ] {
        sqlx::query(pragma).execute(&pool).await?;
    }

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Run the statements of one migration file, skipping comment lines
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        let stripped = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        if !stripped.trim().is_empty() {
            sqlx::query(stripped.trim()).execute(pool).await?;
        }
    }
    Ok(())
}

/// True when `table` has a column named `column`
async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let found: Option<(String,)> = sqlx::query_as(&format!(
        "SELECT name FROM pragma_table_info('{table}') WHERE name = ?"
    ))
    .bind(column)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let found: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // 001 is idempotent (CREATE TABLE IF NOT EXISTS); later migrations are
    // guarded by probing for what they add
    apply_migration(pool, include_str!("../../migrations/001_initial.sql")).await?;

    if !table_exists(pool, "reviews").await? {
        apply_migration(pool, include_str!("../../migrations/002_reviews.sql")).await?;
    }

    if !column_exists(pool, "bookings", "gateway_order_id").await? {
        apply_migration(pool, include_str!("../../migrations/003_payment_gateway.sql")).await?;
    }

    if !column_exists(pool, "bookings", "reminder_sent").await? {
        apply_migration(pool, include_str!("../../migrations/004_checkin_reminders.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}
