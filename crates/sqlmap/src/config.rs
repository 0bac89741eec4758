//! Settings
//!
//! Hierarchical settings loading from:
//! - sqlmap.toml (default settings)
//! - sqlmap.local.toml (git-ignored local overrides)
//! - Environment variables (SQLMAP_* prefix)
//!
//! ## Example
//!
//! ```toml
//! [database]
//! mode = "local"
//! path = "/var/lib/app/app.db"
//! transaction_behavior = "immediate"
//!
//! [executor]
//! default_executor_type = "batch"
//! transaction_timeout_secs = 10
//!
//! [cache]
//! default_size = 512
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! SQLMAP_DATABASE__PATH=/custom/app.db
//! SQLMAP_EXECUTOR__CACHE_ENABLED=false
//! ```

use crate::constants::{DEFAULT_CACHE_SIZE, DEFAULT_CONNECT_TIMEOUT_SECS};
use crate::error::Result;
use crate::models::ExecutorType;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Data source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// `local`, `remote` or `remote_replica`
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Local database file (local and remote_replica modes)
    #[serde(default)]
    pub path: Option<String>,

    /// Remote database URL (remote and remote_replica modes)
    #[serde(default)]
    pub url: Option<String>,

    /// Remote auth token
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// `deferred`, `immediate`, `exclusive` or `read_only`
    #[serde(default = "default_transaction_behavior")]
    pub transaction_behavior: String,
}

/// Executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSettings {
    #[serde(default)]
    pub default_executor_type: ExecutorType,

    /// Applied to statements that declare no timeout of their own
    #[serde(default)]
    pub default_statement_timeout_secs: Option<u64>,

    /// Deadline of every transaction, measured from its first statement
    #[serde(default)]
    pub transaction_timeout_secs: Option<u64>,

    /// Wrap executors in the caching executor
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Capacity of namespace caches built without an explicit size
    #[serde(default = "default_cache_size")]
    pub default_size: usize,
}

fn default_mode() -> String {
    "local".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_transaction_behavior() -> String {
    "deferred".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            mode: default_mode(),
            path: None,
            url: None,
            auth_token: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            transaction_behavior: default_transaction_behavior(),
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        ExecutorSettings {
            default_executor_type: ExecutorType::Reuse,
            default_statement_timeout_secs: None,
            transaction_timeout_secs: None,
            cache_enabled: true,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            default_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from the default locations
    pub fn load() -> Result<Self> {
        Ok(Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("sqlmap.toml"))
            .merge(Toml::file("sqlmap.local.toml"))
            .merge(Env::prefixed("SQLMAP_").split("__"))
            .extract()?)
    }

    /// Load settings from a specific file, still honouring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SQLMAP_").split("__"))
            .extract()?)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::string(toml))
            .extract()?)
    }

    /// Local file database settings with everything else defaulted
    pub fn local(path: impl Into<String>) -> Self {
        let mut settings = Settings::default();
        settings.database.path = Some(path.into());
        settings
    }

    pub fn default_statement_timeout(&self) -> Option<Duration> {
        self.executor
            .default_statement_timeout_secs
            .map(Duration::from_secs)
    }

    pub fn transaction_timeout(&self) -> Option<Duration> {
        self.executor
            .transaction_timeout_secs
            .map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connect_timeout_secs)
    }
}
