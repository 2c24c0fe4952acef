//! Entity resolution services
//!
//! - `date_normalizer`: free-text dates to inclusive calendar ranges
//! - `name_cleaner` / `similarity`: agent name preparation and scoring
//! - `agent_resolver`: authority then fuzzy agent matching
//! - `instance_matcher`: identifier-overlap instance matching
//! - `authority_client`: optional VIAF/LCNAF enrichment
//! - `work_ingester`: per-record pipeline tying the above together

pub mod agent_resolver;
pub mod authority_client;
pub mod date_normalizer;
pub mod instance_matcher;
pub mod name_cleaner;
pub mod similarity;
pub mod work_ingester;

pub use agent_resolver::{AgentResolution, AgentResolver};
pub use authority_client::{
    AuthorityError, AuthorityLookup, AuthorityRecord, HttpAuthorityClient, NoAuthorityLookup,
};
pub use date_normalizer::DateNormalizer;
pub use instance_matcher::InstanceMatcher;
pub use name_cleaner::{clean_agent_name, CleanedName};
pub use work_ingester::{IngestReport, WorkIngester};
