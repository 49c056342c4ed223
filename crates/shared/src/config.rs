//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// General ledger engine configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// How a budget overrun is treated when an expense is posted or approved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPolicy {
    /// Overruns are reported back to the caller and the posting proceeds.
    #[default]
    Warn,
    /// Overruns reject the posting.
    Strict,
}

impl BudgetPolicy {
    /// Returns true if overruns must block the posting.
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// General ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Budget overrun policy.
    #[serde(default)]
    pub budget_policy: BudgetPolicy,
    /// Number of ledgers written per transaction during year-end closing.
    #[serde(default = "default_closing_chunk_size")]
    pub closing_chunk_size: usize,
    /// Maximum number of cached (ledger, year) balances.
    #[serde(default = "default_balance_cache_capacity")]
    pub balance_cache_capacity: u64,
    /// Time-to-live of a cached balance in seconds.
    #[serde(default = "default_balance_cache_ttl")]
    pub balance_cache_ttl_secs: u64,
    /// Reporting currency code (ISO 4217). All amounts are in this currency.
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,
}

fn default_closing_chunk_size() -> usize {
    200
}

fn default_balance_cache_capacity() -> u64 {
    10_000
}

fn default_balance_cache_ttl() -> u64 {
    900 // 15 minutes
}

fn default_reporting_currency() -> String {
    "INR".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            budget_policy: BudgetPolicy::default(),
            closing_chunk_size: default_closing_chunk_size(),
            balance_cache_capacity: default_balance_cache_capacity(),
            balance_cache_ttl_secs: default_balance_cache_ttl(),
            reporting_currency: default_reporting_currency(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "devalaya=info,sea_orm=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, then `DEVALAYA__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("DEVALAYA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
