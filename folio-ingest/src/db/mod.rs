//! Catalog storage access
//!
//! Functions take `&mut SqliteConnection` so the ingester can run a whole Work
//! record inside one transaction (`&mut tx` coerces) while tests and the
//! edition report use a plain pooled connection.

pub mod agents;
pub mod dates;
pub mod identifiers;
pub mod instances;
pub mod rights;
pub mod settings;
pub mod subjects;
pub mod works;

use crate::error::{IngestError, IngestResult};
use uuid::Uuid;

/// Entity kind owning a date range or a link row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    Work,
    Instance,
    Agent,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKind::Work => "work",
            OwnerKind::Instance => "instance",
            OwnerKind::Agent => "agent",
        }
    }
}

/// Name of a `{owner}_{suffix}` link table; agents own no link rows
pub(crate) fn link_table(owner: OwnerKind, suffix: &str) -> IngestResult<String> {
    match owner {
        OwnerKind::Work | OwnerKind::Instance => Ok(format!("{}_{}", owner.as_str(), suffix)),
        OwnerKind::Agent => Err(IngestError::Other(anyhow::anyhow!(
            "agents have no {} links",
            suffix
        ))),
    }
}

/// Fixed-width UTC timestamp; sorts lexically in creation order
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

pub(crate) fn parse_guid(value: &str) -> IngestResult<Uuid> {
    Ok(Uuid::parse_str(value)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Single-connection in-memory pool with the catalog schema
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
}
