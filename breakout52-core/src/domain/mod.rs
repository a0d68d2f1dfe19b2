//! Domain types for the breakout simulation.

pub mod position;
pub mod snapshot;
pub mod trade;

pub use position::Position;
pub use snapshot::{BlockedEntries, PortfolioState};
pub use trade::Trade;

/// Ticker identifier.
pub type Ticker = String;
