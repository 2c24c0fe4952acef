//! Agent database operations
//!
//! Agents are shared across works and instances through role-qualified link
//! rows. They are never deleted.

use crate::db::{link_table, now_timestamp, parse_guid, OwnerKind};
use crate::error::IngestResult;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Person or organization
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub guid: Uuid,
    pub name: String,
    pub sort_name: String,
    pub viaf: Option<String>,
    pub lcnaf: Option<String>,
    pub biography: Option<String>,
}

impl Agent {
    /// Create new agent; sort name is the lowercased name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            guid: Uuid::new_v4(),
            sort_name: name.to_lowercase(),
            name,
            viaf: None,
            lcnaf: None,
            biography: None,
        }
    }

    fn from_row(row: &SqliteRow) -> IngestResult<Self> {
        let guid_str: String = row.get("guid");

        Ok(Self {
            guid: parse_guid(&guid_str)?,
            name: row.get("name"),
            sort_name: row.get("sort_name"),
            viaf: row.get("viaf"),
            lcnaf: row.get("lcnaf"),
            biography: row.get("biography"),
        })
    }
}

const AGENT_COLUMNS: &str = "guid, name, sort_name, viaf, lcnaf, biography";

/// Insert a new agent
pub async fn insert_agent(conn: &mut SqliteConnection, agent: &Agent) -> IngestResult<()> {
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO agents (guid, name, sort_name, viaf, lcnaf, biography, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(agent.guid.to_string())
    .bind(&agent.name)
    .bind(&agent.sort_name)
    .bind(&agent.viaf)
    .bind(&agent.lcnaf)
    .bind(&agent.biography)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite every stored field of an agent
pub async fn update_agent(conn: &mut SqliteConnection, agent: &Agent) -> IngestResult<()> {
    sqlx::query(
        r#"
        UPDATE agents
        SET name = ?, sort_name = ?, viaf = ?, lcnaf = ?, biography = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&agent.name)
    .bind(&agent.sort_name)
    .bind(&agent.viaf)
    .bind(&agent.lcnaf)
    .bind(&agent.biography)
    .bind(now_timestamp())
    .bind(agent.guid.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Load agent by guid
pub async fn load_agent(conn: &mut SqliteConnection, guid: Uuid) -> IngestResult<Option<Agent>> {
    let sql = format!("SELECT {} FROM agents WHERE guid = ?", AGENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(Agent::from_row).transpose()
}

/// Agents matching either authority code, in storage order
pub async fn find_by_authority(
    conn: &mut SqliteConnection,
    viaf: Option<&str>,
    lcnaf: Option<&str>,
) -> IngestResult<Vec<Agent>> {
    if viaf.is_none() && lcnaf.is_none() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM agents WHERE viaf = ? OR lcnaf = ? ORDER BY rowid",
        AGENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(viaf)
        .bind(lcnaf)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(Agent::from_row).collect()
}

/// Every stored agent, in storage order
pub async fn list_agents(conn: &mut SqliteConnection) -> IngestResult<Vec<Agent>> {
    let sql = format!("SELECT {} FROM agents ORDER BY rowid", AGENT_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.iter().map(Agent::from_row).collect()
}

pub async fn count_agents(conn: &mut SqliteConnection) -> IngestResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agents")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Add an alias; returns false when the agent already had it
pub async fn add_alias(conn: &mut SqliteConnection, agent_id: Uuid, alias: &str) -> IngestResult<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO agent_aliases (agent_id, alias) VALUES (?, ?)")
        .bind(agent_id.to_string())
        .bind(alias)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_aliases(conn: &mut SqliteConnection, agent_id: Uuid) -> IngestResult<Vec<String>> {
    let aliases = sqlx::query_scalar("SELECT alias FROM agent_aliases WHERE agent_id = ? ORDER BY id")
        .bind(agent_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    Ok(aliases)
}

/// Link an agent to a work or instance under one role
pub async fn link_agent(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    agent_id: Uuid,
    role: &str,
) -> IngestResult<()> {
    let table = link_table(owner, "agents")?;
    let sql = format!(
        "INSERT OR IGNORE INTO {table} ({owner}_id, agent_id, role) VALUES (?, ?, ?)",
        table = table,
        owner = owner.as_str()
    );

    sqlx::query(&sql)
        .bind(owner_id.to_string())
        .bind(agent_id.to_string())
        .bind(role)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Roles already recorded for an agent on one work or instance
pub async fn roles_for(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    agent_id: Uuid,
) -> IngestResult<BTreeSet<String>> {
    let table = link_table(owner, "agents")?;
    let sql = format!(
        "SELECT role FROM {table} WHERE {owner}_id = ? AND agent_id = ?",
        table = table,
        owner = owner.as_str()
    );

    let roles: Vec<String> = sqlx::query_scalar(&sql)
        .bind(owner_id.to_string())
        .bind(agent_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    Ok(roles.into_iter().collect())
}

/// Names of agents linked to an owner under `role`, in link order
pub async fn agent_names_with_role(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    role: &str,
) -> IngestResult<Vec<String>> {
    let table = link_table(owner, "agents")?;
    let sql = format!(
        r#"
        SELECT a.name
        FROM {table} l
        JOIN agents a ON a.guid = l.agent_id
        WHERE l.{owner}_id = ? AND l.role = ?
        ORDER BY l.rowid
        "#,
        table = table,
        owner = owner.as_str()
    );

    let names = sqlx::query_scalar(&sql)
        .bind(owner_id.to_string())
        .bind(role)
        .fetch_all(&mut *conn)
        .await?;

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;

    #[tokio::test]
    async fn test_insert_and_load_agent() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut agent = Agent::new("Melville, Herman");
        agent.viaf = Some("27068555".to_string());
        insert_agent(&mut conn, &agent).await.unwrap();

        let loaded = load_agent(&mut conn, agent.guid).await.unwrap().unwrap();
        assert_eq!(loaded, agent);
        assert_eq!(loaded.sort_name, "melville, herman");
    }

    #[tokio::test]
    async fn test_find_by_authority_matches_either_code_in_storage_order() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut first = Agent::new("Twain, Mark");
        first.lcnaf = Some("n79021164".to_string());
        let mut second = Agent::new("Clemens, Samuel");
        second.viaf = Some("50566653".to_string());
        insert_agent(&mut conn, &first).await.unwrap();
        insert_agent(&mut conn, &second).await.unwrap();

        let found = find_by_authority(&mut conn, Some("50566653"), Some("n79021164"))
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Twain, Mark", "Clemens, Samuel"]);

        assert!(find_by_authority(&mut conn, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alias_insert_is_idempotent() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let agent = Agent::new("Twain, Mark");
        insert_agent(&mut conn, &agent).await.unwrap();

        assert!(add_alias(&mut conn, agent.guid, "Clemens, Samuel").await.unwrap());
        assert!(!add_alias(&mut conn, agent.guid, "Clemens, Samuel").await.unwrap());
        assert_eq!(list_aliases(&mut conn, agent.guid).await.unwrap().len(), 1);
    }
}
