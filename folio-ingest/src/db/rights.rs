//! Rights database operations

use crate::error::IngestResult;
use crate::models::record::{non_blank, RightsRecord};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

/// Get or create a rights row keyed by `(source, license)`
///
/// Statement and reason are refreshed when supplied.
pub async fn upsert_rights(conn: &mut SqliteConnection, rights: &RightsRecord) -> IngestResult<Option<i64>> {
    let license = rights.license.trim();
    if license.is_empty() {
        return Ok(None);
    }
    // NULL never conflicts in a UNIQUE index, so a missing source is stored as ''
    let source = non_blank(&rights.source).unwrap_or("");

    sqlx::query(
        r#"
        INSERT INTO rights (source, license, rights_statement, rights_reason) VALUES (?, ?, ?, ?)
        ON CONFLICT(source, license) DO UPDATE SET
            rights_statement = COALESCE(excluded.rights_statement, rights_statement),
            rights_reason = COALESCE(excluded.rights_reason, rights_reason)
        "#,
    )
    .bind(source)
    .bind(license)
    .bind(non_blank(&rights.statement))
    .bind(non_blank(&rights.reason))
    .execute(&mut *conn)
    .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM rights WHERE source = ? AND license = ?")
        .bind(source)
        .bind(license)
        .fetch_one(&mut *conn)
        .await?;

    Ok(Some(id))
}

pub async fn link_rights(conn: &mut SqliteConnection, instance_id: Uuid, rights: &RightsRecord) -> IngestResult<()> {
    let Some(rights_id) = upsert_rights(conn, rights).await? else {
        return Ok(());
    };

    sqlx::query("INSERT OR IGNORE INTO instance_rights (instance_id, rights_id) VALUES (?, ?)")
        .bind(instance_id.to_string())
        .bind(rights_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn rights_for(conn: &mut SqliteConnection, instance_id: Uuid) -> IngestResult<Vec<RightsRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT r.source, r.license, r.rights_statement, r.rights_reason
        FROM instance_rights l
        JOIN rights r ON r.id = l.rights_id
        WHERE l.instance_id = ?
        ORDER BY l.rowid
        "#,
    )
    .bind(instance_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let source: String = row.get("source");
            RightsRecord {
                source: (!source.is_empty()).then_some(source),
                license: row.get("license"),
                statement: row.get("rights_statement"),
                reason: row.get("rights_reason"),
            }
        })
        .collect())
}
