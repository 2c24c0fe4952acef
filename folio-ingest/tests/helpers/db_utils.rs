//! Database Test Utilities

use anyhow::Result;
use folio_ingest::services::NoAuthorityLookup;
use folio_ingest::{EngineConfig, WorkIngester};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

/// Single-connection in-memory database with the catalog schema
///
/// Each pooled connection to `sqlite::memory:` is its own database, so the
/// pool is capped at one connection.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    folio_common::db::create_schema(&pool)
        .await
        .expect("Schema initialization failed");

    pool
}

/// Temporary on-disk catalog
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_folio.db");

    let pool = folio_common::db::init_database(&db_path).await?;

    Ok((temp_dir, pool))
}

/// Ingester with default thresholds and authority enrichment disabled
pub fn test_ingester(pool: &SqlitePool) -> WorkIngester {
    WorkIngester::new(pool.clone(), Arc::new(NoAuthorityLookup), EngineConfig::default())
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let query = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar(&query)
        .fetch_one(pool)
        .await
        .expect("Count query failed")
}
