//! # Ledger Configuration
//!
//! Runtime settings for the database layer and the showcase lifecycle.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MOSTRUARIO_DB_PATH=/var/lib/mostruario/ledger.db                   │
//! │     MOSTRUARIO_SHOWCASE_PREFIX=MST                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/mostruario/mostruario.toml (Linux)                       │
//! │     ~/Library/Application Support/br.mostruario.mostruario/... (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/mostruario/ledger.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//! operation_timeout_ms = 10000
//!
//! [ledger]
//! showcase_code_prefix = "MST"
//! restock_returns_on_finish = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

const ENV_DB_PATH: &str = "MOSTRUARIO_DB_PATH";
const ENV_DB_MAX_CONNECTIONS: &str = "MOSTRUARIO_DB_MAX_CONNECTIONS";
const ENV_OPERATION_TIMEOUT_MS: &str = "MOSTRUARIO_OPERATION_TIMEOUT_MS";
const ENV_SHOWCASE_PREFIX: &str = "MOSTRUARIO_SHOWCASE_PREFIX";
const ENV_RESTOCK_RETURNS: &str = "MOSTRUARIO_RESTOCK_RETURNS";

/// Longest allowed showcase code prefix.
pub const MAX_PREFIX_LENGTH: usize = 10;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long to wait for a pooled connection (seconds).
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// How long SQLite waits on a locked database before failing (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Deadline for every public operation (milliseconds).
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("br", "mostruario", "mostruario")
        .map(|dirs| dirs.data_dir().join("mostruario.db"))
        .unwrap_or_else(|| PathBuf::from("./mostruario.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5_000
}

fn default_operation_timeout() -> u64 {
    10_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            busy_timeout_ms: default_busy_timeout(),
            operation_timeout_ms: default_operation_timeout(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// `[ledger]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// First segment of generated showcase codes ("MST-20261019-0001").
    #[serde(default = "default_prefix")]
    pub showcase_code_prefix: String,

    /// Append positive movements for returned units when a showcase is finished.
    ///
    /// Off by default: the shipment movement stands and returned units
    /// are only excluded from settlement.
    #[serde(default)]
    pub restock_returns_on_finish: bool,
}

fn default_prefix() -> String {
    "MST".to_string()
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            showcase_code_prefix: default_prefix(),
            restock_returns_on_finish: false,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (mostruario.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Reads and parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DbError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parses TOML; missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::InvalidConfig(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        let db = &self.database;

        if db.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if db.min_connections > db.max_connections {
            return Err(DbError::InvalidConfig(format!(
                "min_connections ({}) must not exceed max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }

        if db.acquire_timeout_secs == 0 || db.busy_timeout_ms == 0 || db.operation_timeout_ms == 0
        {
            return Err(DbError::InvalidConfig("timeouts must be greater than 0".into()));
        }

        let prefix = &self.ledger.showcase_code_prefix;
        if prefix.is_empty()
            || prefix.len() > MAX_PREFIX_LENGTH
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(DbError::InvalidConfig(format!(
                "showcase_code_prefix must be 1-{} ASCII letters or digits, got '{}'",
                MAX_PREFIX_LENGTH, prefix
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup(ENV_DB_MAX_CONNECTIONS) {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid {}", ENV_DB_MAX_CONNECTIONS),
            }
        }

        if let Some(ms) = lookup(ENV_OPERATION_TIMEOUT_MS) {
            match ms.parse::<u64>() {
                Ok(n) => self.database.operation_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid {}", ENV_OPERATION_TIMEOUT_MS),
            }
        }

        if let Some(prefix) = lookup(ENV_SHOWCASE_PREFIX) {
            self.ledger.showcase_code_prefix = prefix;
        }

        if let Some(flag) = lookup(ENV_RESTOCK_RETURNS) {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.ledger.restock_returns_on_finish = true,
                "0" | "false" | "no" | "off" => self.ledger.restock_returns_on_finish = false,
                _ => warn!(value = %flag, "Ignoring invalid {}", ENV_RESTOCK_RETURNS),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "mostruario", "mostruario")
            .map(|dirs| dirs.config_dir().join("mostruario.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.database.operation_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database.acquire_timeout_secs)
    }
}
