//! Breakout signal per (ticker, calendar index).

use super::rolling_high::prior_high_series;
use crate::data::PriceHistory;
use crate::domain::Ticker;
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct TickerSignals {
    prior_high: Vec<f64>,
    breakout: Vec<bool>,
}

/// Precomputed prior highs and breakout flags for a whole universe.
///
/// Built once before the simulation loop. Tickers are independent, so the
/// precomputation runs in parallel; lookups are read-only afterwards.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    lookback: usize,
    min_periods: usize,
    signals: HashMap<Ticker, TickerSignals>,
}

impl SignalEngine {
    pub fn new(history: &PriceHistory, lookback: usize, min_periods: usize) -> Self {
        let signals = history
            .tickers()
            .par_iter()
            .filter_map(|ticker| {
                let series = history.series(ticker)?;
                let prior_high = prior_high_series(series.highs(), lookback, min_periods);
                let breakout = prior_high
                    .iter()
                    .enumerate()
                    .map(|(i, &prior)| match series.high_at(i) {
                        Some(high) => prior.is_finite() && high > prior,
                        None => false,
                    })
                    .collect();
                Some((
                    ticker.clone(),
                    TickerSignals {
                        prior_high,
                        breakout,
                    },
                ))
            })
            .collect();

        Self {
            lookback,
            min_periods,
            signals,
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn min_periods(&self) -> usize {
        self.min_periods
    }

    /// Max high over the window strictly before `index`, if enough
    /// observations exist.
    pub fn prior_high(&self, ticker: &str, index: usize) -> Option<f64> {
        self.signals
            .get(ticker)?
            .prior_high
            .get(index)
            .copied()
            .filter(|v| v.is_finite())
    }

    /// Today's high exceeds the prior rolling high.
    pub fn is_breakout(&self, ticker: &str, index: usize) -> bool {
        self.signals
            .get(ticker)
            .and_then(|s| s.breakout.get(index).copied())
            .unwrap_or(false)
    }

    /// Total breakout days across all tickers.
    pub fn signal_count(&self) -> usize {
        self.signals
            .values()
            .map(|s| s.breakout.iter().filter(|&&b| b).count())
            .sum()
    }

    /// Calendar indices on which `ticker` breaks out.
    pub fn breakout_indices(&self, ticker: &str) -> Vec<usize> {
        self.signals
            .get(ticker)
            .map(|s| {
                s.breakout
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &b)| b.then_some(i))
                    .collect()
            })
            .unwrap_or_default()
    }
}
