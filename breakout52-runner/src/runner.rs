//! Backtest runner: wires data loading, the simulation and reporting.
//!
//! Two entry points:
//! - `run_backtest()`: loads data (cache, download, synthetic), then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded, aligned data. No I/O.

use std::collections::BTreeMap;

use breakout52_core::data::{DataProvider, DataSource, DownloadProgress, ParquetCache};
use breakout52_core::{
    run_simulation, BenchmarkSeries, PriceHistory, SimulationError, SimulationResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_market_data, LoadError, LoadOptions};
use crate::reporting::PerformanceReport;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete output of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: BacktestConfig,
    pub result: SimulationResult,
    pub report: PerformanceReport,
    /// Where each symbol's bars came from.
    pub data_sources: BTreeMap<String, DataSource>,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestRun {
    pub fn run_id(&self) -> &str {
        self.result.fingerprint.short()
    }
}

/// Load market data per `config` and run the backtest.
pub fn run_backtest(
    config: &BacktestConfig,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    progress: Option<&dyn DownloadProgress>,
    opts: &LoadOptions,
) -> Result<BacktestRun, RunError> {
    config.validate()?;
    let loaded = load_market_data(
        &config.backtest.universe,
        &config.backtest.benchmark,
        cache,
        provider,
        progress,
        opts,
    )?;

    let mut run = run_backtest_from_data(config, &loaded.history, &loaded.benchmark)?;
    run.data_sources = loaded.sources.into_iter().collect();
    run.has_synthetic = loaded.has_synthetic;
    Ok(run)
}

/// Run on pre-loaded data. `benchmark` must be aligned to `history`'s calendar.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    history: &PriceHistory,
    benchmark: &BenchmarkSeries,
) -> Result<BacktestRun, RunError> {
    config.validate()?;
    let result = run_simulation(history, benchmark, &config.strategy)?;
    let report = PerformanceReport::build(&result, benchmark, &config.report);

    tracing::info!(
        run_id = result.fingerprint.short(),
        final_value = result.final_value(),
        trades = result.trades.len(),
        "backtest finished"
    );

    Ok(BacktestRun {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        result,
        report,
        data_sources: BTreeMap::new(),
        has_synthetic: false,
    })
}
