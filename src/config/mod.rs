//! Configuration types and builders.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default database location when `DATABASE_PATH` is unset.
pub const DEFAULT_DATABASE_PATH: &str = "database.db";

/// Columns probed, in priority order, when the synthesizer looks for a
/// date-like column to hang the implicit date window on.
pub const DATE_COLUMN_CANDIDATES: &[&str] = &[
    "date",
    "created_at",
    "updated_at",
    "timestamp",
    "time",
    "datetime",
    "start_date",
    "end_date",
];

/// Tunables for the query-synthesis pipeline.
///
/// Read-only inputs to the pipeline; constructed once and passed in
/// explicitly so multiple configurations can coexist in one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
    /// Result limit applied when the caller does not supply one.
    pub default_limit: u32,
    /// Row cap for the table-preview tool.
    pub max_preview_rows: u32,
    /// Width of the implicit trailing date window, in days.
    pub default_window_days: i64,
    /// Ceiling on estimated result cardinality before sampling kicks in.
    pub max_rows_budget: u64,
    /// Fraction of rows retained when a query is downgraded to sampling.
    pub sampling_rate: f64,
    /// Upper bound on any single storage call.
    pub query_timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.into(),
            default_limit: 50,
            max_preview_rows: 50,
            default_window_days: 365,
            max_rows_budget: 1_000_000,
            sampling_rate: 0.01,
            query_timeout: Duration::from_secs(300),
        }
    }
}

impl QueryConfig {
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }
}

/// Builder for QueryConfig with fluent API.
#[derive(Default)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn default_limit(mut self, limit: u32) -> Self {
        self.config.default_limit = limit;
        self
    }

    pub fn max_preview_rows(mut self, rows: u32) -> Self {
        self.config.max_preview_rows = rows;
        self
    }

    pub fn default_window_days(mut self, days: i64) -> Self {
        self.config.default_window_days = days;
        self
    }

    pub fn max_rows_budget(mut self, budget: u64) -> Self {
        self.config.max_rows_budget = budget;
        self
    }

    pub fn sampling_rate(mut self, rate: f64) -> Self {
        self.config.sampling_rate = rate;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = timeout;
        self
    }

    /// Build from environment variables.
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(path) = env::var("DATABASE_PATH") {
            self.config.database_path = path.into();
        }

        if let Ok(limit) = env::var("DEFAULT_LIMIT") {
            self.config.default_limit = limit.parse().map_err(|_| ConfigError::InvalidValue {
                field: "DEFAULT_LIMIT".into(),
                message: "Invalid row limit".into(),
            })?;
        }

        if let Ok(budget) = env::var("MAX_ROWS_BUDGET") {
            self.config.max_rows_budget = budget.parse().map_err(|_| ConfigError::InvalidValue {
                field: "MAX_ROWS_BUDGET".into(),
                message: "Invalid rows budget".into(),
            })?;
        }

        if let Ok(rate) = env::var("SAMPLING_RATE") {
            self.config.sampling_rate = rate.parse().map_err(|_| ConfigError::InvalidValue {
                field: "SAMPLING_RATE".into(),
                message: "Invalid sampling rate".into(),
            })?;
        }

        if let Ok(secs) = env::var("QUERY_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
                field: "QUERY_TIMEOUT_SECS".into(),
                message: "Invalid timeout".into(),
            })?;
            self.config.query_timeout = Duration::from_secs(secs);
        }

        Ok(self)
    }

    pub fn build(self) -> Result<QueryConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("database_path".into()).into());
        }
        if self.config.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_limit".into(),
                message: "Limit must be greater than 0".into(),
            }
            .into());
        }
        if !(self.config.sampling_rate > 0.0 && self.config.sampling_rate <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "sampling_rate".into(),
                message: "Sampling rate must be in (0, 1]".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub query: QueryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "sqlite-query-mcp".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            query: QueryConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn query(mut self, query: QueryConfig) -> Self {
        self.config.query = query;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueryConfig::default();
        assert_eq!(config.database_path, PathBuf::from("database.db"));
        assert_eq!(config.default_limit, 50);
        assert_eq!(config.max_rows_budget, 1_000_000);
        assert_eq!(config.default_window_days, 365);
        assert!((config.sampling_rate - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_query_config_builder() {
        let config = QueryConfig::builder()
            .database_path("/tmp/test.db")
            .default_limit(25)
            .max_rows_budget(500)
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.default_limit, 25);
        assert_eq!(config.max_rows_budget, 500);
    }

    #[test]
    fn test_invalid_sampling_rate_rejected() {
        let result = QueryConfig::builder().sampling_rate(0.0).build();
        assert!(result.is_err());

        let result = QueryConfig::builder().sampling_rate(1.5).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_date_column_candidates_order() {
        assert_eq!(DATE_COLUMN_CANDIDATES[0], "date");
        assert_eq!(DATE_COLUMN_CANDIDATES[1], "created_at");
        assert_eq!(DATE_COLUMN_CANDIDATES.len(), 8);
    }
}
