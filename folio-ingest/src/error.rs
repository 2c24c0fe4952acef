//! Error types for folio-ingest
//!
//! Only input-validation and storage failures ever leave the engine. Ambiguous
//! matches, unparseable dates, authority outages and clustering degeneracies
//! are resolved internally and logged.

use thiserror::Error;

/// Ingest error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// Agent name was empty once cleaned; fatal to that agent only
    #[error("Agent name is empty after cleaning (raw: {0:?})")]
    EmptyAgentName(String),

    /// Work record carried no usable title
    #[error("Work record has no title")]
    MissingTitle,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored row could not be decoded
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// folio-common error
    #[error("Common error: {0}")]
    Common(#[from] folio_common::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<uuid::Error> for IngestError {
    fn from(err: uuid::Error) -> Self {
        IngestError::CorruptRow(format!("invalid guid: {}", err))
    }
}

/// Result type for engine operations
pub type IngestResult<T> = Result<T, IngestError>;
