//! Daily portfolio snapshot and per-day funding blocks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Ticker;

/// Portfolio state at the close of one trading date.
///
/// Accounting identity: `total_value == cash + invested_value`, where
/// `invested_value` is the sum of open positions marked at the day's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub date: NaiveDate,
    pub calendar_index: usize,
    pub cash: f64,
    pub invested_value: f64,
    pub total_value: f64,
    /// `total_value` plus all commission paid so far.
    pub total_value_ex_commission: f64,
    /// Open tickers in entry order.
    pub holdings: Vec<Ticker>,
}

impl PortfolioState {
    pub fn num_holdings(&self) -> usize {
        self.holdings.len()
    }
}

/// Tickers that fired an entry signal on `date` but could not be funded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEntries {
    pub date: NaiveDate,
    pub tickers: Vec<Ticker>,
}

impl BlockedEntries {
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
