//! # Engine Configuration
//!
//! Configuration management for the inventory engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKFLOW_DB_PATH=/var/lib/stockflow/stock.db                      │
//! │     STOCKFLOW_TX_TIMEOUT_MS=5000                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockflow/stockflow.toml (Linux)                         │
//! │     ~/Library/Application Support/dev.stockflow.stockflow/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockflow.toml
//! [database]
//! path = "stockflow.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [transactions]
//! timeout_ms = 10000
//! max_retries = 3
//! initial_backoff_ms = 20
//! max_backoff_ms = 500
//!
//! [query]
//! default_page_size = 10
//! max_page_size = 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use stockflow_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use stockflow_db::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

/// Where the ledger lives and how the pool behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:` for a throwaway database.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Wait for a pooled connection (milliseconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Wait for the SQLite write lock (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stockflow.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30_000
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_ms: default_connect_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        if self.path.as_os_str() == stockflow_db::pool::IN_MEMORY_PATH {
            return DbConfig::in_memory().busy_timeout(Duration::from_millis(self.busy_timeout_ms));
        }

        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

// =============================================================================
// Transaction Settings
// =============================================================================

/// Time budget and retry policy of one mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSettings {
    /// Upper bound for a single unit of work (milliseconds).
    #[serde(default = "default_tx_timeout")]
    pub timeout_ms: u64,

    /// Extra attempts after a `Conflict`. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_tx_timeout() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    20
}

fn default_max_backoff() -> u64 {
    500
}

impl Default for TransactionSettings {
    fn default() -> Self {
        TransactionSettings {
            timeout_ms: default_tx_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl TransactionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// Query Settings
// =============================================================================

/// Paging limits for list operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

impl Default for QuerySettings {
    fn default() -> Self {
        QuerySettings {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

// =============================================================================
// Root Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockflowConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub transactions: TransactionSettings,

    #[serde(default)]
    pub query: QuerySettings,
}

impl StockflowConfig {
    /// Defaults pointing at a database file.
    pub fn with_database(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.database.path = path.into();
        config
    }

    /// Defaults on a private in-memory database.
    pub fn in_memory() -> Self {
        Self::with_database(stockflow_db::pool::IN_MEMORY_PATH)
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockflow.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(EngineError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(EngineError::Config(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.transactions.timeout_ms == 0 {
            return Err(EngineError::Config(
                "transactions.timeout_ms must be greater than 0".into(),
            ));
        }

        if self.transactions.initial_backoff_ms > self.transactions.max_backoff_ms {
            return Err(EngineError::Config(
                "transactions.initial_backoff_ms exceeds max_backoff_ms".into(),
            ));
        }

        let query = &self.query;
        if query.max_page_size == 0 || query.max_page_size > MAX_PAGE_SIZE {
            return Err(EngineError::Config(format!(
                "query.max_page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if query.default_page_size == 0 || query.default_page_size > query.max_page_size {
            return Err(EngineError::Config(
                "query.default_page_size must be between 1 and max_page_size".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("STOCKFLOW_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = env_number("STOCKFLOW_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }

        if let Some(ms) = env_number("STOCKFLOW_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = ms;
        }

        if let Some(ms) = env_number("STOCKFLOW_TX_TIMEOUT_MS") {
            debug!(timeout_ms = ms, "Overriding transaction timeout from environment");
            self.transactions.timeout_ms = ms;
        }

        if let Some(retries) = env_number("STOCKFLOW_MAX_RETRIES") {
            self.transactions.max_retries = retries;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "stockflow", "stockflow")
            .map(|dirs| dirs.config_dir().join("stockflow.toml"))
    }
}

/// Reads a numeric environment variable, ignoring unparsable values.
fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring non-numeric environment value");
            None
        }
    }
}
