//! Data models for the ingest engine
//!
//! - `record`: intermediate record shape handed over by source adapters
//! - `date_range`: normalized date values
//! - `staging`: transient per-record relation lists

pub mod date_range;
pub mod record;
pub mod staging;

pub use date_range::{DateInterval, DateRange, DateType};
pub use record::{
    AgentRecord, DateRecord, IdentifierRecord, InstanceRecord, RightsRecord, SubjectRecord,
    WorkRecord,
};
pub use staging::{StagedInstance, StagedWork};
