//! folio-ingest library interface
//!
//! Entity resolution and edition clustering for harvested bibliographic
//! records. The binary in `main.rs` is a thin CLI over these modules.

pub mod clustering;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::clustering::{EditionClusterer, EditionGroup};
pub use crate::config::EngineConfig;
pub use crate::error::{IngestError, IngestResult};
pub use crate::models::{DateRange, DateType, WorkRecord};
pub use crate::services::{AgentResolver, DateNormalizer, InstanceMatcher, WorkIngester};
