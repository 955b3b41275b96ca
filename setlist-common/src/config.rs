//! Bootstrap configuration loading
//!
//! Two-tier configuration:
//! 1. **TOML bootstrap**: database path, port, logging, oracle endpoint
//! 2. **Database runtime**: matching thresholds in the `settings` table
//!    (see [`crate::db::settings`])
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/setlist/setlist.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable file is never fatal: a warning is logged and
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SETLIST_CONFIG";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5790;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Data folder (holds the database when `database_path` is relative)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Base URL of the identification oracle (optional)
    #[serde(default)]
    pub oracle_url: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            port: default_port(),
            root_folder: None,
            oracle_url: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Absolute database location
    ///
    /// Relative `database_path` values are resolved against `root_folder`,
    /// falling back to the OS data directory.
    pub fn resolved_database_path(&self) -> PathBuf {
        if self.database_path.is_absolute() {
            return self.database_path.clone();
        }
        let base = self
            .root_folder
            .clone()
            .unwrap_or_else(default_data_folder);
        base.join(&self.database_path)
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("setlist.db")
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the config file following the priority order above
///
/// Returns `None` when no candidate exists on disk.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file
    dirs::config_dir()
        .map(|d| d.join("setlist").join("setlist.toml"))
        .filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn parse_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load bootstrap config with graceful degradation
///
/// Never fails: unresolvable or malformed files yield defaults.
pub fn load_toml_config(cli_arg: Option<&Path>) -> TomlConfig {
    let Some(path) = resolve_config_path(cli_arg) else {
        info!("No config file found, using compiled defaults");
        return TomlConfig::default();
    };

    match parse_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Get OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/setlist (or /var/lib/setlist for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("setlist"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/setlist"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("setlist"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/setlist"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("setlist"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\setlist"))
    } else {
        PathBuf::from("./setlist_data")
    }
}
