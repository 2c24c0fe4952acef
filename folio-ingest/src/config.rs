//! Engine configuration
//!
//! Tunable matching and clustering constants, read from the `[matching]` and
//! `[clustering]` tables of the TOML config, plus authority key resolution
//! with Database → ENV → TOML priority.

use crate::services::authority_client::{AuthorityLookup, HttpAuthorityClient, NoAuthorityLookup};
use folio_common::config::TomlConfig;
use folio_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variable carrying the authority service API key
pub const AUTHORITY_API_KEY_ENV: &str = "FOLIO_AUTHORITY_API_KEY";

/// Agent and instance matching thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum trigram similarity for a stored name to be a fuzzy candidate
    pub trigram_threshold: f64,
    /// Minimum Jaro-Winkler similarity for a candidate to be retained
    pub jaro_winkler_threshold: f64,
    /// Identifier types too coarse to tell manifestations apart
    pub excluded_identifier_types: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            trigram_threshold: 0.3,
            jaro_winkler_threshold: 0.9,
            excluded_identifier_types: vec!["ddc".to_string(), "lcc".to_string()],
        }
    }
}

/// Edition clustering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub place_weight: f64,
    pub publisher_weight: f64,
    pub year_weight: f64,
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub max_iterations: usize,
    /// k-means++ seed; fixed so reports are reproducible
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            place_weight: 0.5,
            publisher_weight: 1.0,
            year_weight: 2.0,
            ngram_min: 2,
            ngram_max: 4,
            max_iterations: 300,
            seed: 42,
        }
    }
}

/// All engine tuning constants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub matching: MatchingConfig,
    pub clustering: ClusteringConfig,
}

impl EngineConfig {
    /// Build from the optional tuning tables; absent keys keep their defaults
    pub fn from_toml(toml_config: &TomlConfig) -> Result<Self> {
        let matching = match &toml_config.matching {
            Some(table) => decode_table(table, "matching")?,
            None => MatchingConfig::default(),
        };
        let clustering = match &toml_config.clustering {
            Some(table) => decode_table(table, "clustering")?,
            None => ClusteringConfig::default(),
        };

        if clustering.ngram_min == 0 || clustering.ngram_min > clustering.ngram_max {
            return Err(Error::Config(format!(
                "Invalid clustering n-gram range {}..={}",
                clustering.ngram_min, clustering.ngram_max
            )));
        }

        Ok(Self {
            matching,
            clustering,
        })
    }
}

fn decode_table<T: serde::de::DeserializeOwned>(table: &toml::Table, name: &str) -> Result<T> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|e| Error::Config(format!("Invalid [{}] table: {}", name, e)))
}

/// Resolve the authority service API key
///
/// **Priority:** Database → ENV → TOML. A missing key is not an error: it
/// disables authority enrichment.
pub async fn resolve_authority_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_authority_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(AUTHORITY_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .authority
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Authority API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(source) = sources.first() {
        info!("Authority API key loaded from {}", source);
    }

    Ok(db_key.or(env_key).or(toml_key))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Construct the authority lookup once at startup
///
/// Enrichment needs both an endpoint and a key; otherwise lookups are disabled.
pub fn build_authority_lookup(
    toml_config: &TomlConfig,
    api_key: Option<String>,
) -> Arc<dyn AuthorityLookup> {
    let endpoint = toml_config
        .authority
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    match (endpoint, api_key) {
        (Some(endpoint), Some(key)) => match HttpAuthorityClient::new(endpoint, Some(key)) {
            Ok(client) => {
                info!(endpoint = %endpoint, "Authority enrichment enabled");
                Arc::new(client)
            }
            Err(e) => {
                warn!("Authority client construction failed, enrichment disabled: {}", e);
                Arc::new(NoAuthorityLookup)
            }
        },
        _ => {
            info!("Authority endpoint or API key not configured, enrichment disabled");
            Arc::new(NoAuthorityLookup)
        }
    }
}
