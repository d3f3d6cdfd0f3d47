mod models;

pub use models::*;

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open (creating if absent) the database file and bring the schema up.
pub async fn init(db_path: &Path) -> Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    info!("Initializing database at {}", db_path.display());

    // WAL mode lets readers proceed during history inserts
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Single-connection in-memory database with the full schema.
pub async fn init_in_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: users and predictions
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    info!("Migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_creates_file_and_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("app.db");

        let pool = init(&path).await.unwrap();
        assert!(path.exists());
        pool.close().await;

        // Second start against the same file keeps working
        let pool = init(&path).await.unwrap();
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'predictions') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec![("predictions".to_string(),), ("users".to_string(),)]);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = init_in_memory().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO predictions (user_id, input_text, label, created_at) VALUES (42, 'x', 'AI', 'now')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_probability_range_enforced() {
        let pool = init_in_memory().await.unwrap();
        let user = User::create(&pool, "ada", "ada@example.com", "hash").await.unwrap();
        let result = sqlx::query(
            "INSERT INTO predictions (user_id, input_text, label, probability, created_at) VALUES (?, 'x', 'AI', 1.5, 'now')",
        )
        .bind(user.id)
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
