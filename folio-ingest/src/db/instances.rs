//! Instance database operations
//!
//! An instance belongs to exactly one work and is removed with it.

use crate::db::{now_timestamp, parse_guid};
use crate::error::IngestResult;
use crate::models::record::InstanceRecord;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

/// One manifestation of a work
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Instance {
    pub guid: Uuid,
    pub work_id: Uuid,
    pub title: Option<String>,
    pub pub_place: Option<String>,
    pub edition: Option<String>,
    pub edition_statement: Option<String>,
    pub extent: Option<String>,
    pub volume: Option<String>,
    pub table_of_contents: Option<String>,
    pub summary: Option<String>,
    pub language: Option<String>,
}

impl Instance {
    /// New instance of `work_id` carrying the record's scalar fields
    pub fn from_record(work_id: Uuid, record: &InstanceRecord) -> Self {
        Self {
            guid: Uuid::new_v4(),
            work_id,
            title: record.title.clone(),
            pub_place: record.pub_place.clone(),
            edition: record.edition.clone(),
            edition_statement: record.edition_statement.clone(),
            extent: record.extent.clone(),
            volume: record.volume.clone(),
            table_of_contents: record.table_of_contents.clone(),
            summary: record.summary.clone(),
            language: record.language.clone(),
        }
    }

    fn from_row(row: &SqliteRow) -> IngestResult<Self> {
        let guid_str: String = row.get("guid");
        let work_str: String = row.get("work_id");

        Ok(Self {
            guid: parse_guid(&guid_str)?,
            work_id: parse_guid(&work_str)?,
            title: row.get("title"),
            pub_place: row.get("pub_place"),
            edition: row.get("edition"),
            edition_statement: row.get("edition_statement"),
            extent: row.get("extent"),
            volume: row.get("volume"),
            table_of_contents: row.get("table_of_contents"),
            summary: row.get("summary"),
            language: row.get("language"),
        })
    }
}

const INSTANCE_COLUMNS: &str = "guid, work_id, title, pub_place, edition, edition_statement, \
     extent, volume, table_of_contents, summary, language";

/// Insert a new instance
pub async fn insert_instance(conn: &mut SqliteConnection, instance: &Instance) -> IngestResult<()> {
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO instances (
            guid, work_id, title, pub_place, edition, edition_statement, extent, volume,
            table_of_contents, summary, language, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(instance.guid.to_string())
    .bind(instance.work_id.to_string())
    .bind(&instance.title)
    .bind(&instance.pub_place)
    .bind(&instance.edition)
    .bind(&instance.edition_statement)
    .bind(&instance.extent)
    .bind(&instance.volume)
    .bind(&instance.table_of_contents)
    .bind(&instance.summary)
    .bind(&instance.language)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite every stored field of an instance
pub async fn update_instance(conn: &mut SqliteConnection, instance: &Instance) -> IngestResult<()> {
    sqlx::query(
        r#"
        UPDATE instances
        SET title = ?, pub_place = ?, edition = ?, edition_statement = ?, extent = ?,
            volume = ?, table_of_contents = ?, summary = ?, language = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&instance.title)
    .bind(&instance.pub_place)
    .bind(&instance.edition)
    .bind(&instance.edition_statement)
    .bind(&instance.extent)
    .bind(&instance.volume)
    .bind(&instance.table_of_contents)
    .bind(&instance.summary)
    .bind(&instance.language)
    .bind(now_timestamp())
    .bind(instance.guid.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Load instance by guid
pub async fn load_instance(conn: &mut SqliteConnection, guid: Uuid) -> IngestResult<Option<Instance>> {
    let sql = format!("SELECT {} FROM instances WHERE guid = ?", INSTANCE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(Instance::from_row).transpose()
}

/// Instances of one work, in storage order
pub async fn instances_for_work(conn: &mut SqliteConnection, work_id: Uuid) -> IngestResult<Vec<Instance>> {
    let sql = format!(
        "SELECT {} FROM instances WHERE work_id = ? ORDER BY rowid",
        INSTANCE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(work_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(Instance::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::db::works::{insert_work, Work};

    #[tokio::test]
    async fn test_instances_listed_in_storage_order() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let work = Work::new("Moby Dick");
        insert_work(&mut conn, &work).await.unwrap();

        let mut guids = Vec::new();
        for place in ["New York", "London", "Boston"] {
            let record = InstanceRecord {
                pub_place: Some(place.to_string()),
                ..Default::default()
            };
            let instance = Instance::from_record(work.guid, &record);
            insert_instance(&mut conn, &instance).await.unwrap();
            guids.push(instance.guid);
        }

        let loaded = instances_for_work(&mut conn, work.guid).await.unwrap();
        let loaded_guids: Vec<_> = loaded.iter().map(|i| i.guid).collect();
        assert_eq!(loaded_guids, guids);
        assert_eq!(loaded[1].pub_place.as_deref(), Some("London"));
    }

    #[tokio::test]
    async fn test_update_instance() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let work = Work::new("Moby Dick");
        insert_work(&mut conn, &work).await.unwrap();

        let mut instance = Instance::from_record(work.guid, &InstanceRecord::default());
        insert_instance(&mut conn, &instance).await.unwrap();

        instance.extent = Some("635 p.".to_string());
        update_instance(&mut conn, &instance).await.unwrap();

        let loaded = load_instance(&mut conn, instance.guid).await.unwrap().unwrap();
        assert_eq!(loaded, instance);
    }
}
