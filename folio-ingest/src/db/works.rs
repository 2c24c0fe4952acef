//! Work database operations

use crate::db::{now_timestamp, parse_guid};
use crate::error::IngestResult;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

/// Abstract intellectual work
#[derive(Debug, Clone, PartialEq)]
pub struct Work {
    pub guid: Uuid,
    pub title: String,
    pub sort_title: String,
    pub sub_title: Option<String>,
    pub language: Option<String>,
    pub medium: Option<String>,
    pub summary: Option<String>,
}

impl Work {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            guid: Uuid::new_v4(),
            sort_title: title.to_lowercase(),
            title,
            sub_title: None,
            language: None,
            medium: None,
            summary: None,
        }
    }

    fn from_row(row: &SqliteRow) -> IngestResult<Self> {
        let guid_str: String = row.get("guid");
        let title: String = row.get("title");
        let sort_title: Option<String> = row.get("sort_title");

        Ok(Self {
            guid: parse_guid(&guid_str)?,
            sort_title: sort_title.unwrap_or_else(|| title.to_lowercase()),
            title,
            sub_title: row.get("sub_title"),
            language: row.get("language"),
            medium: row.get("medium"),
            summary: row.get("summary"),
        })
    }
}

/// Insert a new work
pub async fn insert_work(conn: &mut SqliteConnection, work: &Work) -> IngestResult<()> {
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO works (
            guid, title, sort_title, sub_title, language, medium, summary, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(work.guid.to_string())
    .bind(&work.title)
    .bind(&work.sort_title)
    .bind(&work.sub_title)
    .bind(&work.language)
    .bind(&work.medium)
    .bind(&work.summary)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite every stored field of a work
pub async fn update_work(conn: &mut SqliteConnection, work: &Work) -> IngestResult<()> {
    sqlx::query(
        r#"
        UPDATE works
        SET title = ?, sort_title = ?, sub_title = ?, language = ?, medium = ?, summary = ?,
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&work.title)
    .bind(&work.sort_title)
    .bind(&work.sub_title)
    .bind(&work.language)
    .bind(&work.medium)
    .bind(&work.summary)
    .bind(now_timestamp())
    .bind(work.guid.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Load work by guid
pub async fn load_work(conn: &mut SqliteConnection, guid: Uuid) -> IngestResult<Option<Work>> {
    let row = sqlx::query(
        r#"
        SELECT guid, title, sort_title, sub_title, language, medium, summary
        FROM works
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(Work::from_row).transpose()
}

pub async fn count_works(conn: &mut SqliteConnection) -> IngestResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM works")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}
