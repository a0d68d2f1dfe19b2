//! Simulation output and error types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{ConfigError, StrategyConfig};
use crate::domain::{BlockedEntries, PortfolioState, Position, Trade};
use crate::fingerprint::RunFingerprint;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("data integrity: {0}")]
    DataIntegrity(String),
}

/// Everything a completed run produced.
///
/// `snapshots` and `blocked` hold exactly one entry per calendar date, in
/// calendar order. `trades` is in close order; trades closed on the same day
/// follow entry order. `open_positions` were still held when the calendar
/// ran out and have no trade record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub config: StrategyConfig,
    pub tickers: Vec<String>,
    pub benchmark_symbol: String,
    pub snapshots: Vec<PortfolioState>,
    pub trades: Vec<Trade>,
    pub blocked: Vec<BlockedEntries>,
    pub open_positions: Vec<Position>,
    pub total_commission: f64,
    /// Breakout days across the universe, whether or not they were traded.
    pub signal_count: usize,
    pub fingerprint: RunFingerprint,
}

impl SimulationResult {
    pub fn snapshot_on(&self, date: NaiveDate) -> Option<&PortfolioState> {
        self.snapshots
            .binary_search_by_key(&date, |s| s.date)
            .ok()
            .map(|i| &self.snapshots[i])
    }

    pub fn blocked_on(&self, date: NaiveDate) -> Option<&BlockedEntries> {
        self.blocked
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &self.blocked[i])
    }

    pub fn final_value(&self) -> f64 {
        self.snapshots
            .last()
            .map(|s| s.total_value)
            .unwrap_or(self.config.starting_cash)
    }

    /// Percentage change from starting cash to the final total value.
    pub fn total_return_pct(&self) -> f64 {
        if self.config.starting_cash > 0.0 {
            (self.final_value() / self.config.starting_cash - 1.0) * 100.0
        } else {
            0.0
        }
    }

    /// Days on which at least one breakout could not be funded.
    pub fn blocked_days(&self) -> usize {
        self.blocked.iter().filter(|b| !b.is_empty()).count()
    }
}
