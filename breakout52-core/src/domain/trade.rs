//! Closed round-trip trade record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Position, Ticker};

/// Immutable record of a closed position.
///
/// Built exactly once from a [`Position`] plus its exit data and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: Ticker,
    pub entry_date: NaiveDate,
    pub entry_index: usize,
    pub entry_price: f64,
    pub entry_amount: f64,
    pub shares: f64,
    pub exit_date: NaiveDate,
    pub exit_index: usize,
    pub exit_price: f64,
    pub exit_amount: f64,
    /// `(exit_price - entry_price) / entry_price * 100`.
    pub return_pct: f64,
    pub entry_commission: f64,
    pub exit_commission: f64,
    pub total_commission: f64,
}

impl Trade {
    pub(crate) fn from_exit(
        position: Position,
        exit_index: usize,
        exit_date: NaiveDate,
        exit_price: f64,
        exit_commission: f64,
    ) -> Self {
        let exit_amount = position.shares * exit_price;
        let return_pct = (exit_price - position.entry_price) / position.entry_price * 100.0;
        Self {
            total_commission: position.entry_commission + exit_commission,
            ticker: position.ticker,
            entry_date: position.entry_date,
            entry_index: position.entry_index,
            entry_price: position.entry_price,
            entry_amount: position.entry_amount,
            shares: position.shares,
            exit_date,
            exit_index,
            exit_price,
            exit_amount,
            return_pct,
            entry_commission: position.entry_commission,
            exit_commission,
        }
    }

    /// Net PnL after both commissions.
    pub fn net_pnl(&self) -> f64 {
        self.exit_amount - self.entry_amount - self.total_commission
    }

    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }

    pub fn holding_bars(&self) -> usize {
        self.exit_index - self.entry_index
    }
}
