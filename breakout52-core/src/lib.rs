//! Breakout52 Core: domain types, market data, breakout signal and the
//! day-by-day portfolio simulation.
//!
//! - Price history aligned on a shared trading calendar
//! - Prior 52-week high signal (no look-ahead)
//! - Fixed-dollar ledger with cash and one-position-per-ticker invariants
//! - Deterministic simulation loop and run fingerprinting
//! - Yahoo Finance provider and Parquet cache

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod signal;

pub use data::{BenchmarkSeries, PriceHistory, PriceSeries, TradingCalendar};
pub use domain::{BlockedEntries, PortfolioState, Position, Ticker, Trade};
pub use engine::{run_simulation, SimulationError, SimulationResult, StrategyConfig};
pub use fingerprint::RunFingerprint;
pub use signal::SignalEngine;
