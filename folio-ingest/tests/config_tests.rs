//! Configuration resolution tests
//!
//! Authority API key priority: Database → ENV → TOML.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate FOLIO_AUTHORITY_API_KEY are marked with #[serial].

mod helpers;

use folio_common::config::{AuthorityConfig, TomlConfig};
use folio_ingest::config::{
    build_authority_lookup, resolve_authority_api_key, EngineConfig, AUTHORITY_API_KEY_ENV,
};
use folio_ingest::db::settings::set_authority_api_key;
use folio_ingest::services::AuthorityLookup;
use helpers::memory_pool;
use serial_test::serial;

fn toml_with_key(key: Option<&str>) -> TomlConfig {
    TomlConfig {
        authority: AuthorityConfig {
            endpoint: None,
            api_key: key.map(str::to_string),
        },
        ..Default::default()
    }
}

// ============================================================================
// Resolution Tests
// ============================================================================

#[tokio::test]
#[serial]
async fn test_database_overrides_env_and_toml() {
    let pool = memory_pool().await;
    set_authority_api_key(&pool, "db-key".to_string()).await.unwrap();
    std::env::set_var(AUTHORITY_API_KEY_ENV, "env-key");

    let result = resolve_authority_api_key(&pool, &toml_with_key(Some("toml-key")))
        .await
        .unwrap();
    assert_eq!(result.as_deref(), Some("db-key"));

    std::env::remove_var(AUTHORITY_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_env_fallback_when_database_empty() {
    let pool = memory_pool().await;
    std::env::set_var(AUTHORITY_API_KEY_ENV, "env-key");

    let result = resolve_authority_api_key(&pool, &toml_with_key(Some("toml-key")))
        .await
        .unwrap();
    assert_eq!(result.as_deref(), Some("env-key"));

    std::env::remove_var(AUTHORITY_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_toml_fallback_when_database_and_env_empty() {
    let pool = memory_pool().await;
    std::env::remove_var(AUTHORITY_API_KEY_ENV);

    let result = resolve_authority_api_key(&pool, &toml_with_key(Some("toml-key")))
        .await
        .unwrap();
    assert_eq!(result.as_deref(), Some("toml-key"));
}

#[tokio::test]
#[serial]
async fn test_whitespace_keys_are_ignored() {
    let pool = memory_pool().await;
    set_authority_api_key(&pool, "   ".to_string()).await.unwrap();
    std::env::set_var(AUTHORITY_API_KEY_ENV, "");

    let result = resolve_authority_api_key(&pool, &toml_with_key(Some("toml-key")))
        .await
        .unwrap();
    assert_eq!(result.as_deref(), Some("toml-key"));

    std::env::remove_var(AUTHORITY_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_no_key_anywhere_disables_enrichment() {
    let pool = memory_pool().await;
    std::env::remove_var(AUTHORITY_API_KEY_ENV);

    let result = resolve_authority_api_key(&pool, &toml_with_key(None)).await.unwrap();
    assert_eq!(result, None);
}

// ============================================================================
// Engine Configuration
// ============================================================================

#[tokio::test]
async fn test_lookup_without_endpoint_returns_nothing() {
    let lookup = build_authority_lookup(&toml_with_key(Some("toml-key")), Some("toml-key".to_string()));
    assert_eq!(lookup.lookup("Melville, Herman").await, None);
}

#[test]
fn test_engine_config_from_toml_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[logging]
level = "debug"

[matching]
jaro_winkler_threshold = 0.95
excluded_identifier_types = ["ddc"]

[clustering]
year_weight = 3.0
seed = 7
"#,
    )
    .unwrap();

    let toml_config = folio_common::config::load_toml_config(&path).unwrap();
    let engine = EngineConfig::from_toml(&toml_config).unwrap();

    assert_eq!(toml_config.logging.level, "debug");
    assert_eq!(engine.matching.jaro_winkler_threshold, 0.95);
    assert_eq!(engine.matching.trigram_threshold, 0.3);
    assert_eq!(engine.matching.excluded_identifier_types, vec!["ddc".to_string()]);
    assert_eq!(engine.clustering.year_weight, 3.0);
    assert_eq!(engine.clustering.seed, 7);
    assert_eq!(engine.clustering.ngram_max, 4);
}
