//! # Folio Common Library
//!
//! Shared code for the folio crates including:
//! - Error and result types
//! - Configuration loading (root folder, TOML config file)
//! - SQLite database initialization and catalog schema

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
