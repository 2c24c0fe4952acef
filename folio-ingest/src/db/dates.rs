//! Date range database operations
//!
//! At most one range per `(owner, date_type)` survives an upsert. Rows that
//! violate this (written by older importers) are collapsed on the next write.

use crate::db::{now_timestamp, OwnerKind};
use crate::error::IngestResult;
use crate::models::date_range::{DateInterval, DateRange, DateType};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::warn;
use uuid::Uuid;

fn interval_from_row(row: &SqliteRow) -> Option<DateInterval> {
    let lower: Option<NaiveDate> = row.get("range_lower");
    let upper: Option<NaiveDate> = row.get("range_upper");

    lower.map(|lower| DateInterval { lower, upper })
}

fn date_from_row(row: &SqliteRow) -> DateRange {
    let date_type: String = row.get("date_type");

    DateRange {
        display: row.get("display_date"),
        range: interval_from_row(row),
        date_type: DateType::parse(&date_type),
    }
}

/// Attach a date to an owner, replacing any existing date of the same type
///
/// Display and interval are both overwritten; an unparsed date clears the
/// stored interval. Returns the surviving row id.
pub async fn upsert_date(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    date: &DateRange,
) -> IngestResult<i64> {
    let existing: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM date_ranges
        WHERE owner_type = ? AND owner_id = ? AND date_type = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(owner.as_str())
    .bind(owner_id.to_string())
    .bind(date.date_type.as_str())
    .fetch_all(&mut *conn)
    .await?;

    let keep_id = match existing.as_slice() {
        [] => return insert_date(conn, owner, owner_id, date).await,
        [only] => *only,
        [earliest, ..] => {
            warn!(
                owner = owner.as_str(),
                owner_id = %owner_id,
                date_type = %date.date_type,
                duplicates = existing.len(),
                "Multiple date ranges of one type on one owner, collapsing to the earliest row"
            );
            collapse_duplicates(conn, owner, owner_id, &date.date_type, *earliest).await?;
            *earliest
        }
    };

    sqlx::query(
        r#"
        UPDATE date_ranges
        SET display_date = ?, range_lower = ?, range_upper = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&date.display)
    .bind(date.lower())
    .bind(date.upper())
    .bind(now_timestamp())
    .bind(keep_id)
    .execute(&mut *conn)
    .await?;

    Ok(keep_id)
}

async fn insert_date(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    date: &DateRange,
) -> IngestResult<i64> {
    let now = now_timestamp();

    let result = sqlx::query(
        r#"
        INSERT INTO date_ranges (
            owner_type, owner_id, date_type, display_date, range_lower, range_upper,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(owner.as_str())
    .bind(owner_id.to_string())
    .bind(date.date_type.as_str())
    .bind(&date.display)
    .bind(date.lower())
    .bind(date.upper())
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Copy the most recently modified duplicate into `keep_id` and delete the rest
async fn collapse_duplicates(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    date_type: &DateType,
    keep_id: i64,
) -> IngestResult<()> {
    let latest = sqlx::query(
        r#"
        SELECT display_date, range_lower, range_upper FROM date_ranges
        WHERE owner_type = ? AND owner_id = ? AND date_type = ?
        ORDER BY updated_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(owner.as_str())
    .bind(owner_id.to_string())
    .bind(date_type.as_str())
    .fetch_one(&mut *conn)
    .await?;

    let display: String = latest.get("display_date");
    let lower: Option<NaiveDate> = latest.get("range_lower");
    let upper: Option<NaiveDate> = latest.get("range_upper");

    sqlx::query("UPDATE date_ranges SET display_date = ?, range_lower = ?, range_upper = ? WHERE id = ?")
        .bind(display)
        .bind(lower)
        .bind(upper)
        .bind(keep_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        DELETE FROM date_ranges
        WHERE owner_type = ? AND owner_id = ? AND date_type = ? AND id != ?
        "#,
    )
    .bind(owner.as_str())
    .bind(owner_id.to_string())
    .bind(date_type.as_str())
    .bind(keep_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Date of one type on an owner
pub async fn load_date(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
    date_type: &DateType,
) -> IngestResult<Option<DateRange>> {
    let row = sqlx::query(
        r#"
        SELECT date_type, display_date, range_lower, range_upper FROM date_ranges
        WHERE owner_type = ? AND owner_id = ? AND date_type = ?
        ORDER BY updated_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(owner.as_str())
    .bind(owner_id.to_string())
    .bind(date_type.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(date_from_row))
}

/// Every date attached to an owner, in creation order
pub async fn dates_for(
    conn: &mut SqliteConnection,
    owner: OwnerKind,
    owner_id: Uuid,
) -> IngestResult<Vec<DateRange>> {
    let rows = sqlx::query(
        r#"
        SELECT date_type, display_date, range_lower, range_upper FROM date_ranges
        WHERE owner_type = ? AND owner_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(owner.as_str())
    .bind(owner_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(date_from_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::services::date_normalizer::DateNormalizer;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_overwrites() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let owner_id = Uuid::new_v4();

        let first = DateNormalizer::parse("1851", DateType::Publication);
        let id1 = upsert_date(&mut conn, OwnerKind::Instance, owner_id, &first).await.unwrap();

        let second = DateNormalizer::parse("1990-1995", DateType::Publication);
        let id2 = upsert_date(&mut conn, OwnerKind::Instance, owner_id, &second).await.unwrap();

        assert_eq!(id1, id2);
        let dates = dates_for(&mut conn, OwnerKind::Instance, owner_id).await.unwrap();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].display, "1990/1995");
        assert_eq!(dates[0].lower(), Some(ymd(1990, 1, 1)));
        assert_eq!(dates[0].upper(), Some(ymd(1995, 12, 31)));
    }

    #[tokio::test]
    async fn test_unparsed_date_clears_stored_interval() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let owner_id = Uuid::new_v4();

        let parsed = DateNormalizer::parse("1851", DateType::Publication);
        upsert_date(&mut conn, OwnerKind::Instance, owner_id, &parsed).await.unwrap();

        let garbage = DateNormalizer::parse("not a date", DateType::Publication);
        upsert_date(&mut conn, OwnerKind::Instance, owner_id, &garbage).await.unwrap();

        let stored = load_date(&mut conn, OwnerKind::Instance, owner_id, &DateType::Publication)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.display, "not a date");
        assert_eq!(stored.range, None);
    }

    #[tokio::test]
    async fn test_duplicates_collapse_to_earliest_row_with_latest_values() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let owner_id = Uuid::new_v4().to_string();

        for (display, lower, created, updated) in [
            ("1850", "1850-01-01", "2020-01-01T00:00:00.000000Z", "2020-01-01T00:00:00.000000Z"),
            ("1851", "1851-01-01", "2021-01-01T00:00:00.000000Z", "2023-01-01T00:00:00.000000Z"),
            ("1852", "1852-01-01", "2022-01-01T00:00:00.000000Z", "2022-01-01T00:00:00.000000Z"),
        ] {
            sqlx::query(
                "INSERT INTO date_ranges (owner_type, owner_id, date_type, display_date, range_lower,
                 range_upper, created_at, updated_at) VALUES ('agent', ?, 'birth_date', ?, ?, NULL, ?, ?)",
            )
            .bind(&owner_id)
            .bind(display)
            .bind(lower)
            .bind(created)
            .bind(updated)
            .execute(&mut *conn)
            .await
            .unwrap();
        }

        let owner = Uuid::parse_str(&owner_id).unwrap();
        let incoming = DateNormalizer::parse("1849", DateType::Birth);
        let kept = upsert_date(&mut conn, OwnerKind::Agent, owner, &incoming).await.unwrap();

        assert_eq!(kept, 1);
        let dates = dates_for(&mut conn, OwnerKind::Agent, owner).await.unwrap();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].display, "1849");
        assert_eq!(dates[0].lower(), Some(ymd(1849, 1, 1)));
        assert_eq!(dates[0].upper(), Some(ymd(1849, 12, 31)));
    }
}
