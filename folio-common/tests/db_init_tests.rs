//! Database initialization tests
//!
//! The catalog is created on first run and reopened without changes after.

use folio_common::db::init::init_database;
use sqlx::Row;
use tempfile::TempDir;

const CATALOG_TABLES: &[&str] = &[
    "settings",
    "works",
    "instances",
    "agents",
    "agent_aliases",
    "identifiers",
    "subjects",
    "rights",
    "date_ranges",
    "work_agents",
    "instance_agents",
    "work_identifiers",
    "instance_identifiers",
    "work_subjects",
    "instance_rights",
];

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("folio.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_every_catalog_table_exists() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("folio.db")).await.unwrap();

    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(&pool)
        .await
        .unwrap();
    let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();

    for table in CATALOG_TABLES {
        assert!(names.iter().any(|n| n == table), "missing table {}", table);
    }
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("folio.db");

    let first = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO settings (key, value) VALUES ('marker', 'kept')")
        .execute(&first)
        .await
        .unwrap();
    first.close().await;

    let second = init_database(&db_path).await;
    assert!(second.is_ok(), "Failed to open existing database: {:?}", second.err());

    let value: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'marker'")
        .fetch_one(&second.unwrap())
        .await
        .unwrap();
    assert_eq!(value, "kept");
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("folio.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
