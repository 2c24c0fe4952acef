//! Subject database operations

use crate::error::IngestResult;
use crate::models::record::{non_blank, SubjectRecord};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

/// Get or create a subject heading keyed by `(authority, subject)`
pub async fn upsert_subject(conn: &mut SqliteConnection, subject: &SubjectRecord) -> IngestResult<Option<i64>> {
    let heading = subject.subject.trim();
    if heading.is_empty() {
        return Ok(None);
    }
    let authority = non_blank(&subject.authority).unwrap_or("");

    sqlx::query("INSERT OR IGNORE INTO subjects (authority, subject) VALUES (?, ?)")
        .bind(authority)
        .bind(heading)
        .execute(&mut *conn)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM subjects WHERE authority = ? AND subject = ?")
        .bind(authority)
        .bind(heading)
        .fetch_one(&mut *conn)
        .await?;

    Ok(Some(id))
}

/// Attach a subject to a work; a supplied weight replaces the stored one
pub async fn link_subject(conn: &mut SqliteConnection, work_id: Uuid, subject: &SubjectRecord) -> IngestResult<()> {
    let Some(subject_id) = upsert_subject(conn, subject).await? else {
        return Ok(());
    };

    sqlx::query(
        r#"
        INSERT INTO work_subjects (work_id, subject_id, weight) VALUES (?, ?, ?)
        ON CONFLICT(work_id, subject_id) DO UPDATE SET
            weight = COALESCE(excluded.weight, weight)
        "#,
    )
    .bind(work_id.to_string())
    .bind(subject_id)
    .bind(subject.weight)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn subjects_for(conn: &mut SqliteConnection, work_id: Uuid) -> IngestResult<Vec<SubjectRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT s.authority, s.subject, l.weight
        FROM work_subjects l
        JOIN subjects s ON s.id = l.subject_id
        WHERE l.work_id = ?
        ORDER BY l.rowid
        "#,
    )
    .bind(work_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let authority: String = row.get("authority");
            SubjectRecord {
                authority: (!authority.is_empty()).then_some(authority),
                subject: row.get("subject"),
                weight: row.get("weight"),
            }
        })
        .collect())
}
