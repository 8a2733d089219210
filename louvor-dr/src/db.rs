//! Read-only database access for louvor-dr
//!
//! Inspection never writes; the connection itself enforces it.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;

/// Connect to the database in read-only mode
///
/// Safety: Uses SQLite mode=ro to prevent any write operations
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found: {}\nRun louvor-rd first to initialize the database.",
            db_path.display()
        );
    }

    // mode=ro without immutable: louvor-rd may hold the database in WAL
    // mode, and an immutable connection would not see commits still in
    // the WAL
    let db_url = format!("sqlite://{}?mode=ro", db_path.display());

    let pool = SqlitePool::connect(&db_url)
        .await
        .context("Failed to connect to database in read-only mode")?;

    // Verify read-only by attempting a write (should fail)
    #[cfg(debug_assertions)]
    {
        let write_test = sqlx::query("CREATE TABLE _test_write (id INTEGER)")
            .execute(&pool)
            .await;
        if write_test.is_ok() {
            panic!("SAFETY VIOLATION: Database connection is not read-only!");
        }
    }

    Ok(pool)
}
