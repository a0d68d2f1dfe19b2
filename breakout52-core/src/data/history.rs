//! In-memory price history on a shared trading calendar.
//!
//! Every series is indexed by calendar position. Missing observations are
//! stored as NaN and surfaced as `None` by the accessors, so callers never
//! compare against NaN directly.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::Ticker;

#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("trading calendar must be strictly ascending (violation at position {0})")]
    UnsortedCalendar(usize),

    #[error("series for '{ticker}' has {actual} values, calendar has {expected}")]
    LengthMismatch {
        ticker: String,
        expected: usize,
        actual: usize,
    },
}

/// Ordered, strictly ascending sequence of trading dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, HistoryError> {
        if let Some(pos) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(HistoryError::UnsortedCalendar(pos + 1));
        }
        Ok(Self { dates })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    /// Calendar position of `date`, if it is a trading date.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// Close and high for one ticker, aligned to the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    close: Vec<f64>,
    high: Vec<f64>,
}

impl PriceSeries {
    /// Both vectors must have the same length; the shorter one is NaN-padded.
    pub fn new(mut close: Vec<f64>, mut high: Vec<f64>) -> Self {
        let n = close.len().max(high.len());
        close.resize(n, f64::NAN);
        high.resize(n, f64::NAN);
        Self { close, high }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn close_at(&self, index: usize) -> Option<f64> {
        self.close.get(index).copied().filter(|v| v.is_finite())
    }

    pub fn high_at(&self, index: usize) -> Option<f64> {
        self.high.get(index).copied().filter(|v| v.is_finite())
    }

    /// Raw highs (NaN where missing), for window computations.
    pub fn highs(&self) -> &[f64] {
        &self.high
    }

    pub fn closes(&self) -> &[f64] {
        &self.close
    }
}

/// Immutable per-ticker price data for a fixed universe.
///
/// `tickers()` preserves the configured universe order, which is the entry
/// iteration order of the simulation. A universe ticker with no series simply
/// never trades.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    calendar: TradingCalendar,
    tickers: Vec<Ticker>,
    series: HashMap<Ticker, PriceSeries>,
}

impl PriceHistory {
    pub fn new(
        calendar: TradingCalendar,
        tickers: Vec<Ticker>,
        series: HashMap<Ticker, PriceSeries>,
    ) -> Result<Self, HistoryError> {
        for (ticker, s) in &series {
            if s.len() != calendar.len() {
                return Err(HistoryError::LengthMismatch {
                    ticker: ticker.clone(),
                    expected: calendar.len(),
                    actual: s.len(),
                });
            }
        }
        Ok(Self {
            calendar,
            tickers,
            series,
        })
    }

    /// Convenience constructor: universe order is the order of `columns`.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(Ticker, PriceSeries)>,
    ) -> Result<Self, HistoryError> {
        let calendar = TradingCalendar::new(dates)?;
        let tickers = columns.iter().map(|(t, _)| t.clone()).collect();
        Self::new(calendar, tickers, columns.into_iter().collect())
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn series(&self, ticker: &str) -> Option<&PriceSeries> {
        self.series.get(ticker)
    }

    pub fn close(&self, ticker: &str, index: usize) -> Option<f64> {
        self.series.get(ticker)?.close_at(index)
    }

    pub fn high(&self, ticker: &str, index: usize) -> Option<f64> {
        self.series.get(ticker)?.high_at(index)
    }

    pub fn num_days(&self) -> usize {
        self.calendar.len()
    }
}

/// Benchmark closes aligned to the universe calendar (NaN on dates the
/// benchmark did not trade).
///
/// Alongside the exact-date closes it keeps an as-of view: the last close on
/// or before each calendar date, which may come from a benchmark date the
/// universe did not trade.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSeries {
    pub symbol: String,
    closes: Vec<f64>,
    as_of: Vec<Option<f64>>,
}

impl BenchmarkSeries {
    /// Closes on the calendar only; the as-of view is their forward fill.
    pub fn new(symbol: impl Into<String>, closes: Vec<f64>) -> Self {
        let mut last = None;
        let as_of = closes
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    last = Some(v);
                }
                last
            })
            .collect();
        Self {
            symbol: symbol.into(),
            closes,
            as_of,
        }
    }

    pub(crate) fn with_as_of(
        symbol: impl Into<String>,
        closes: Vec<f64>,
        as_of: Vec<Option<f64>>,
    ) -> Self {
        debug_assert_eq!(closes.len(), as_of.len());
        Self {
            symbol: symbol.into(),
            closes,
            as_of,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn close_at(&self, index: usize) -> Option<f64> {
        self.closes.get(index).copied().filter(|v| v.is_finite())
    }

    /// Number of calendar dates with an actual benchmark observation.
    pub fn observed_count(&self) -> usize {
        self.closes.iter().filter(|v| v.is_finite()).count()
    }

    /// Last known close at each calendar date. Leading gaps stay `None`.
    pub fn forward_filled(&self) -> Vec<Option<f64>> {
        self.as_of.clone()
    }
}
