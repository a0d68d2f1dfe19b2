//! Simulation engine: strategy configuration, ledger and the daily loop.

pub mod config;
pub mod cost_model;
pub mod ledger;
pub mod loop_runner;
pub mod state;

pub use config::{validate_universe, ConfigError, StrategyConfig};
pub use cost_model::CostModel;
pub use ledger::{OpenRefusal, PortfolioLedger};
pub use loop_runner::run_simulation;
pub use state::{SimulationError, SimulationResult};
