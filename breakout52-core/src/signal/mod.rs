//! 52-week high breakout signal.

pub mod engine;
pub mod rolling_high;

pub use engine::SignalEngine;
pub use rolling_high::{prior_high_naive, prior_high_series};
