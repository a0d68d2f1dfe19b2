//! Portfolio ledger: cash, open positions and the closed-trade record.
//!
//! All state changes go through `try_open` and `close`. Everything else is
//! read-only, so the cash floor and one-position-per-ticker invariants hold by
//! construction.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use super::cost_model::CostModel;
use crate::domain::{PortfolioState, Position, Ticker, Trade};

/// Why an entry was not taken.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum OpenRefusal {
    #[error("a position is already open for this ticker")]
    AlreadyOpen,

    #[error("insufficient cash: need {required:.4}, have {available:.4}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("entry price must be positive and finite, got {0}")]
    InvalidPrice(f64),
}

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    starting_cash: f64,
    cash: f64,
    /// Entry order.
    positions: Vec<Position>,
    trades: Vec<Trade>,
    total_commission: f64,
}

impl PortfolioLedger {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            starting_cash,
            cash: starting_cash,
            positions: Vec::new(),
            trades: Vec::new(),
            total_commission: 0.0,
        }
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.positions.iter().any(|p| p.ticker == ticker)
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    /// Open a fixed-dollar position at `entry_close`.
    ///
    /// Cash must cover `position_size` plus the entry commission; a refused
    /// entry leaves the ledger untouched.
    pub fn try_open(
        &mut self,
        ticker: &str,
        index: usize,
        date: NaiveDate,
        entry_close: f64,
        position_size: f64,
        cost: &CostModel,
    ) -> Result<&Position, OpenRefusal> {
        if self.has_position(ticker) {
            return Err(OpenRefusal::AlreadyOpen);
        }
        if !(entry_close.is_finite() && entry_close > 0.0) {
            return Err(OpenRefusal::InvalidPrice(entry_close));
        }

        // Affordability is checked on the position size alone; the entry
        // commission may take cash below zero by at most one commission.
        if self.cash < position_size {
            return Err(OpenRefusal::InsufficientFunds {
                required: position_size,
                available: self.cash,
            });
        }

        let commission = cost.commission(position_size);
        self.cash -= position_size + commission;
        self.total_commission += commission;
        let position = Position {
            ticker: ticker.to_string(),
            entry_date: date,
            entry_index: index,
            entry_price: entry_close,
            entry_amount: position_size,
            shares: position_size / entry_close,
            entry_commission: commission,
        };
        tracing::debug!(
            ticker,
            %date,
            price = entry_close,
            shares = position.shares,
            cash = self.cash,
            "opened position"
        );
        self.positions.push(position);
        Ok(&self.positions[self.positions.len() - 1])
    }

    /// Close the open position for `ticker` at `exit_close`.
    ///
    /// Returns `None` when nothing is open, so repeated calls are harmless.
    pub fn close(
        &mut self,
        ticker: &str,
        index: usize,
        date: NaiveDate,
        exit_close: f64,
        cost: &CostModel,
    ) -> Option<Trade> {
        let pos_idx = self.positions.iter().position(|p| p.ticker == ticker)?;
        let position = self.positions.remove(pos_idx);

        let exit_amount = position.shares * exit_close;
        let commission = cost.commission(exit_amount);
        self.cash += exit_amount - commission;
        self.total_commission += commission;

        let trade = Trade::from_exit(position, index, date, exit_close, commission);
        tracing::debug!(
            ticker,
            %date,
            price = exit_close,
            return_pct = trade.return_pct,
            cash = self.cash,
            "closed position"
        );
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Mark-to-market snapshot. Positions without a mark are valued at their
    /// entry price.
    pub fn valuation(
        &self,
        date: NaiveDate,
        index: usize,
        marks: &HashMap<Ticker, f64>,
    ) -> PortfolioState {
        let invested_value: f64 = self
            .positions
            .iter()
            .map(|p| p.market_value(marks.get(&p.ticker).copied().unwrap_or(p.entry_price)))
            .sum();
        let total_value = self.cash + invested_value;
        PortfolioState {
            date,
            calendar_index: index,
            cash: self.cash,
            invested_value,
            total_value,
            total_value_ex_commission: total_value + self.total_commission,
            holdings: self.positions.iter().map(|p| p.ticker.clone()).collect(),
        }
    }

    /// Consume the ledger, returning the closed trades and still-open positions.
    pub fn into_parts(self) -> (Vec<Trade>, Vec<Position>) {
        (self.trades, self.positions)
    }
}
