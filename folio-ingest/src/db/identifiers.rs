//! Identifier database operations
//!
//! Identifier rows are shared across owners and keyed by `(id_type, value)`;
//! the per-owner weight lives on the link row.

use crate::db::{link_table, parse_guid, OwnerKind};
use crate::error::IngestResult;
use crate::models::record::IdentifierRecord;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

/// Normalized `(type, value)`; `None` when either part is blank
fn normalized(identifier: &IdentifierRecord) -> Option<(String, String)> {
    let id_type = identifier.id_type.trim().to_lowercase();
    let value = identifier.identifier.trim().to_string();

    if id_type.is_empty() || value.is_empty() {
        None
    } else {
        Some((id_type, value))
    }
}

/// Get or create the shared identifier row
pub async fn upsert_identifier(
    conn: &mut SqliteConnection,
    identifier: &IdentifierRecord,
) -> IngestResult<Option<i64>> {
    let Some((id_type, value)) = normalized(identifier) else {
        return Ok(None);
    };

    sqlx::query("INSERT OR IGNORE INTO identifiers (id_type, value) VALUES (?, ?)")
        .bind(&id_type)
        .bind(&value)
        .execute(&mut *conn)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM identifiers WHERE id_type = ? AND value = ?")
        .bind(&id_type)
        .bind(&value)
        .fetch_one(&mut *conn)
        .await?;

    Ok(Some(id))
}

/// Attach an identifier to a work or instance; a supplied weight replaces the stored one
pub async fn link_identifier(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    identifier: &IdentifierRecord,
) -> IngestResult<()> {
    let Some(identifier_id) = upsert_identifier(conn, identifier).await? else {
        tracing::debug!(id_type = %identifier.id_type, "Skipping blank identifier");
        return Ok(());
    };

    let table = link_table(owner, "identifiers")?;
    let sql = format!(
        r#"
        INSERT INTO {table} ({owner}_id, identifier_id, weight) VALUES (?, ?, ?)
        ON CONFLICT({owner}_id, identifier_id) DO UPDATE SET
            weight = COALESCE(excluded.weight, weight)
        "#,
        table = table,
        owner = owner.as_str()
    );

    sqlx::query(&sql)
        .bind(owner_id.to_string())
        .bind(identifier_id)
        .bind(identifier.weight)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Identifiers attached to one owner, in attachment order
pub async fn identifiers_for(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
) -> IngestResult<Vec<IdentifierRecord>> {
    let table = link_table(owner, "identifiers")?;
    let sql = format!(
        r#"
        SELECT i.id_type, i.value, l.weight
        FROM {table} l
        JOIN identifiers i ON i.id = l.identifier_id
        WHERE l.{owner}_id = ?
        ORDER BY l.rowid
        "#,
        table = table,
        owner = owner.as_str()
    );

    let rows = sqlx::query(&sql)
        .bind(owner_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows
        .iter()
        .map(|row| IdentifierRecord {
            id_type: row.get("id_type"),
            identifier: row.get("value"),
            weight: row.get("weight"),
        })
        .collect())
}

/// Owners of one kind carrying an identifier, in link order
pub async fn owners_with_identifier(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    identifier: &IdentifierRecord,
) -> IngestResult<Vec<Uuid>> {
    let Some((id_type, value)) = normalized(identifier) else {
        return Ok(Vec::new());
    };

    let table = link_table(owner, "identifiers")?;
    let sql = format!(
        r#"
        SELECT l.{owner}_id
        FROM {table} l
        JOIN identifiers i ON i.id = l.identifier_id
        WHERE i.id_type = ? AND i.value = ?
        ORDER BY l.rowid
        "#,
        table = table,
        owner = owner.as_str()
    );

    let guids: Vec<String> = sqlx::query_scalar(&sql)
        .bind(&id_type)
        .bind(&value)
        .fetch_all(&mut *conn)
        .await?;

    guids.iter().map(|g| parse_guid(g)).collect()
}

/// Works owning an instance that carries an identifier, one entry per instance
pub async fn works_with_instance_identifier(
    conn: &mut SqliteConnection,
    identifier: &IdentifierRecord,
) -> IngestResult<Vec<Uuid>> {
    let Some((id_type, value)) = normalized(identifier) else {
        return Ok(Vec::new());
    };

    let guids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT inst.work_id
        FROM instance_identifiers l
        JOIN identifiers i ON i.id = l.identifier_id
        JOIN instances inst ON inst.guid = l.instance_id
        WHERE i.id_type = ? AND i.value = ?
        ORDER BY l.rowid
        "#,
    )
    .bind(&id_type)
    .bind(&value)
    .fetch_all(&mut *conn)
    .await?;

    guids.iter().map(|g| parse_guid(g)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::db::instances::{insert_instance, Instance};
    use crate::db::works::{insert_work, Work};

    #[tokio::test]
    async fn test_identifier_rows_are_shared() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = upsert_identifier(&mut conn, &IdentifierRecord::new("ISBN", " 111 "))
            .await
            .unwrap();
        let second = upsert_identifier(&mut conn, &IdentifierRecord::new("isbn", "111"))
            .await
            .unwrap();
        assert_eq!(first, second);

        let blank = upsert_identifier(&mut conn, &IdentifierRecord::new("isbn", "  "))
            .await
            .unwrap();
        assert_eq!(blank, None);
    }

    #[tokio::test]
    async fn test_link_keeps_weight_when_none_supplied() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let work = Work::new("Moby Dick");
        insert_work(&mut conn, &work).await.unwrap();

        let mut weighted = IdentifierRecord::new("oclc", "222");
        weighted.weight = Some(0.8);
        link_identifier(&mut conn, OwnerKind::Work, work.guid, &weighted)
            .await
            .unwrap();
        link_identifier(&mut conn, OwnerKind::Work, work.guid, &IdentifierRecord::new("oclc", "222"))
            .await
            .unwrap();

        let stored = identifiers_for(&mut conn, OwnerKind::Work, work.guid).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].weight, Some(0.8));

        let owners = owners_with_identifier(&mut conn, OwnerKind::Work, &IdentifierRecord::new("OCLC", "222"))
            .await
            .unwrap();
        assert_eq!(owners, vec![work.guid]);
    }

    #[tokio::test]
    async fn test_work_found_through_instance_identifier() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let work = Work::new("Walden");
        insert_work(&mut conn, &work).await.unwrap();
        let instance = Instance {
            guid: Uuid::new_v4(),
            work_id: work.guid,
            ..Default::default()
        };
        insert_instance(&mut conn, &instance).await.unwrap();
        link_identifier(&mut conn, OwnerKind::Instance, instance.guid, &IdentifierRecord::new("oclc", "555"))
            .await
            .unwrap();

        let works = works_with_instance_identifier(&mut conn, &IdentifierRecord::new("OCLC", " 555"))
            .await
            .unwrap();
        assert_eq!(works, vec![work.guid]);

        let none = works_with_instance_identifier(&mut conn, &IdentifierRecord::new("oclc", "556"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
