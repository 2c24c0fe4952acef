//! Database initialization
//!
//! Creates the catalog database on first run and brings the schema up to date
//! on every start. All statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers alongside the single writer of one ingest unit
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every catalog table and index
///
/// Separate from [`init_database`] so tests can run it against `sqlite::memory:`.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_settings_table(pool).await?;

    // Entity tables
    create_works_table(pool).await?;
    create_instances_table(pool).await?;
    create_agents_table(pool).await?;
    create_identifiers_table(pool).await?;
    create_subjects_table(pool).await?;
    create_rights_table(pool).await?;
    create_date_ranges_table(pool).await?;

    // Linking tables
    create_agent_links_tables(pool).await?;
    create_identifier_links_tables(pool).await?;
    create_subject_links_table(pool).await?;
    create_rights_links_table(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores configuration key-value pairs (authority API key, overrides).
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

pub async fn create_works_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS works (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            sort_title TEXT,
            sub_title TEXT,
            language TEXT,
            medium TEXT,
            summary TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_instances_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instances (
            guid TEXT PRIMARY KEY,
            work_id TEXT NOT NULL REFERENCES works(guid) ON DELETE CASCADE,
            title TEXT,
            pub_place TEXT,
            edition TEXT,
            edition_statement TEXT,
            extent TEXT,
            volume TEXT,
            table_of_contents TEXT,
            summary TEXT,
            language TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_instances_work ON instances(work_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_agents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agents (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(name) > 0),
            sort_name TEXT NOT NULL,
            lcnaf TEXT,
            viaf TEXT,
            biography TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_agents_viaf ON agents(viaf)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_agents_lcnaf ON agents(lcnaf)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agent_aliases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            agent_id TEXT NOT NULL REFERENCES agents(guid) ON DELETE CASCADE,
            alias TEXT NOT NULL,
            UNIQUE(agent_id, alias)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_identifiers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS identifiers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            id_type TEXT NOT NULL,
            value TEXT NOT NULL,
            UNIQUE(id_type, value)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_subjects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            authority TEXT NOT NULL DEFAULT '',
            subject TEXT NOT NULL,
            UNIQUE(authority, subject)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_rights_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT,
            license TEXT NOT NULL,
            rights_statement TEXT,
            rights_reason TEXT,
            UNIQUE(source, license)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Date ranges are shared across owner types
///
/// No uniqueness constraint on (owner_type, owner_id, date_type): duplicates
/// written by older importers are collapsed by the upsert path instead.
pub async fn create_date_ranges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS date_ranges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_type TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            date_type TEXT NOT NULL,
            display_date TEXT NOT NULL,
            range_lower TEXT,
            range_upper TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_date_ranges_owner ON date_ranges(owner_type, owner_id, date_type)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_agent_links_tables(pool: &SqlitePool) -> Result<()> {
    for owner in ["work", "instance"] {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {owner}_agents (
                {owner}_id TEXT NOT NULL REFERENCES {owner}s(guid) ON DELETE CASCADE,
                agent_id TEXT NOT NULL REFERENCES agents(guid),
                role TEXT NOT NULL,
                PRIMARY KEY ({owner}_id, agent_id, role)
            )
            "#
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}

async fn create_identifier_links_tables(pool: &SqlitePool) -> Result<()> {
    for owner in ["work", "instance"] {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {owner}_identifiers (
                {owner}_id TEXT NOT NULL REFERENCES {owner}s(guid) ON DELETE CASCADE,
                identifier_id INTEGER NOT NULL REFERENCES identifiers(id),
                weight REAL,
                PRIMARY KEY ({owner}_id, identifier_id)
            )
            "#
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}

async fn create_subject_links_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_subjects (
            work_id TEXT NOT NULL REFERENCES works(guid) ON DELETE CASCADE,
            subject_id INTEGER NOT NULL REFERENCES subjects(id),
            weight REAL,
            PRIMARY KEY (work_id, subject_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rights_links_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instance_rights (
            instance_id TEXT NOT NULL REFERENCES instances(guid) ON DELETE CASCADE,
            rights_id INTEGER NOT NULL REFERENCES rights(id),
            PRIMARY KEY (instance_id, rights_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
