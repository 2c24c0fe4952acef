//! Shared error type for the folio crates

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file or table present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// None of the platform config locations exists
    #[error("No config file found (searched {searched:?})")]
    ConfigNotFound { searched: Vec<PathBuf> },
}
