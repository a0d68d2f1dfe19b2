//! Breakout52 Runner: backtest orchestration on top of `breakout52-core`.
//!
//! - Backtest config file (TOML) with validation
//! - Data loading with cache/download/synthetic fallback
//! - Performance metrics and month-start reporting
//! - Artifact export (CSV, JSON, Markdown)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod reporting;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, ReportConfig, DEFAULT_BENCHMARK, DOW_UNIVERSE};
pub use data_loader::{load_market_data, LoadError, LoadOptions, LoadedData};
pub use export::{load_manifest, save_artifacts, RunManifest};
pub use metrics::{EquityMetrics, PerformanceMetrics};
pub use reporting::{MarkdownReportGenerator, PerformanceReport};
pub use runner::{run_backtest, run_backtest_from_data, BacktestRun, RunError, SCHEMA_VERSION};
