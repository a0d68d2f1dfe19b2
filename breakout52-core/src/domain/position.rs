use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Ticker;

/// An open long position sized at a fixed dollar amount.
///
/// `entry_index` is the trading-calendar position of the entry date and is
/// the only clock used for hold-period arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: Ticker,
    pub entry_date: NaiveDate,
    pub entry_index: usize,
    pub entry_price: f64,
    /// Dollar amount allocated at entry (before commission).
    pub entry_amount: f64,
    pub shares: f64,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.shares * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.shares * (current_price - self.entry_price)
    }

    /// Trading-calendar steps elapsed since entry.
    pub fn bars_held(&self, current_index: usize) -> usize {
        current_index.saturating_sub(self.entry_index)
    }
}
