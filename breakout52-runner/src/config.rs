//! Backtest configuration file (TOML).
//!
//! ```toml
//! [backtest]
//! universe = ["AAPL", "MSFT"]
//! benchmark = "^DJI"
//! start_date = "2019-06-30"
//! end_date = "2025-06-30"
//!
//! [strategy]
//! position_size = 20.0
//! hold_period_days = 15
//!
//! [report]
//! drawdown_rows = 3
//! ```
//!
//! Every key has a default; unknown keys are rejected.

use std::path::Path;

use breakout52_core::engine::{validate_universe, ConfigError as StrategyError, StrategyConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default universe: Dow Jones Industrial Average names.
pub const DOW_UNIVERSE: [&str; 31] = [
    "AAPL", "AMGN", "AXP", "BA", "CAT", "CRM", "CSCO", "CVX", "DIS", "DOW", "GS", "HD", "HON",
    "IBM", "INTC", "JNJ", "JPM", "KO", "MCD", "MMM", "MRK", "MSFT", "NKE", "PFE", "PG", "RTX",
    "TRV", "UNH", "V", "VZ", "WMT",
];

pub const DEFAULT_BENCHMARK: &str = "^DJI";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("benchmark symbol is empty")]
    EmptyBenchmark,

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Full configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategyConfig,
    pub report: ReportConfig,
}

/// Universe, benchmark and date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub universe: Vec<String>,
    pub benchmark: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            universe: DOW_UNIVERSE.iter().map(|s| s.to_string()).collect(),
            benchmark: DEFAULT_BENCHMARK.to_string(),
            start_date: NaiveDate::from_ymd_opt(2019, 6, 30).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default(),
        }
    }
}

/// How many rows the summary tables show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub drawdown_rows: usize,
    pub trade_rows: usize,
    pub histogram_bins: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            drawdown_rows: 3,
            trade_rows: 10,
            histogram_bins: 30,
        }
    }
}

impl BacktestConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.start_date > b.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: b.start_date,
                end: b.end_date,
            });
        }
        if b.benchmark.trim().is_empty() {
            return Err(ConfigError::EmptyBenchmark);
        }
        validate_universe(&b.universe)?;
        self.strategy.validate()?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
