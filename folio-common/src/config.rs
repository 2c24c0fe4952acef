//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "FOLIO_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "folio.db";

/// TOML configuration file contents
///
/// Every section is optional; a missing file or missing section falls back to
/// compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Root folder holding the catalog database
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Authority lookup service settings
    #[serde(default)]
    pub authority: AuthorityConfig,

    /// Agent/instance matching thresholds (raw table, interpreted by folio-ingest)
    #[serde(default)]
    pub matching: Option<toml::Table>,

    /// Edition clustering weights (raw table, interpreted by folio-ingest)
    #[serde(default)]
    pub clustering: Option<toml::Table>,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Authority lookup section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthorityConfig {
    /// Name-query endpoint; enrichment is disabled when absent
    pub endpoint: Option<String>,

    /// API key sent with each query
    pub api_key: Option<String>,
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    use_config_file: bool,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if use_config_file {
        if let Ok(config_path) = locate_config_file() {
            match load_toml_config(&config_path) {
                Ok(config) => {
                    if let Some(root_folder) = config.root_folder {
                        return root_folder;
                    }
                }
                Err(e) => warn!("Ignoring unreadable config file: {}", e),
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Locate the configuration file for the platform
pub fn locate_config_file() -> Result<PathBuf> {
    let mut searched = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        searched.push(dir.join("folio").join("config.toml"));
    }
    if cfg!(unix) {
        searched.push(PathBuf::from("/etc/folio/config.toml"));
    }

    match searched.iter().find(|path| path.exists()) {
        Some(path) => Ok(path.clone()),
        None => Err(Error::ConfigNotFound { searched }),
    }
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/folio (or /var/lib/folio for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("folio"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/folio"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("folio"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/folio"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("folio"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\folio"))
    } else {
        PathBuf::from("./folio_data")
    }
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let path = resolve_root_folder(Some(Path::new("/tmp/folio-cli")), "FOLIO_UNSET_VAR", false);
        assert_eq!(path, PathBuf::from("/tmp/folio-cli"));
    }

    #[test]
    fn database_path_joins_file_name() {
        let path = database_path(Path::new("/srv/folio"));
        assert_eq!(path, PathBuf::from("/srv/folio/folio.db"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("root_folder = \"/data\"").unwrap();
        assert_eq!(config.root_folder, Some(PathBuf::from("/data")));
        assert_eq!(config.logging.level, "info");
        assert!(config.authority.endpoint.is_none());
        assert!(config.matching.is_none());
    }
}
