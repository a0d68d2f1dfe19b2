//! Multi-symbol time alignment.
//!
//! Universe bars are aligned to the union of their trading dates. A symbol
//! missing on a date gets NaN (no forward-fill of tradable price data). The
//! benchmark is aligned onto that same calendar; closes on its own extra
//! dates only feed the as-of (forward-filled) view.

use super::history::{BenchmarkSeries, HistoryError, PriceHistory, PriceSeries, TradingCalendar};
use super::provider::RawBar;
use crate::domain::Ticker;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Align the universe's bars to a common calendar.
///
/// `universe` fixes the ticker order of the resulting history. Void bars do
/// not contribute a calendar date.
pub fn align_universe(
    universe: &[Ticker],
    symbol_bars: &HashMap<String, Vec<RawBar>>,
) -> Result<PriceHistory, HistoryError> {
    let mut all_dates = BTreeSet::new();
    for ticker in universe {
        if let Some(bars) = symbol_bars.get(ticker) {
            all_dates.extend(bars.iter().filter(|b| !b.is_void()).map(|b| b.date));
        }
    }
    let calendar = TradingCalendar::new(all_dates.into_iter().collect())?;

    let mut series = HashMap::new();
    for ticker in universe {
        let Some(bars) = symbol_bars.get(ticker) else {
            continue;
        };
        let by_date: HashMap<NaiveDate, &RawBar> = bars.iter().map(|b| (b.date, b)).collect();

        let (close, high): (Vec<f64>, Vec<f64>) = calendar
            .dates()
            .iter()
            .map(|date| match by_date.get(date) {
                Some(b) => (b.close, b.high),
                None => (f64::NAN, f64::NAN),
            })
            .unzip();
        series.insert(ticker.clone(), PriceSeries::new(close, high));
    }

    PriceHistory::new(calendar, universe.to_vec(), series)
}

/// Align benchmark closes onto `calendar`.
///
/// Exact-date closes are NaN where the benchmark has no bar. The as-of view
/// walks the benchmark's own dates, so a close printed between two calendar
/// dates is carried into the later one.
pub fn align_benchmark(
    calendar: &TradingCalendar,
    symbol: &str,
    bars: &[RawBar],
) -> BenchmarkSeries {
    let mut observed: Vec<&RawBar> = bars.iter().filter(|b| b.close.is_finite()).collect();
    observed.sort_by_key(|b| b.date);
    let by_date: HashMap<NaiveDate, f64> = observed.iter().map(|b| (b.date, b.close)).collect();

    let mut pending = observed.into_iter().peekable();
    let mut last = None;
    let mut closes = Vec::with_capacity(calendar.len());
    let mut as_of = Vec::with_capacity(calendar.len());
    for date in calendar.dates() {
        while let Some(bar) = pending.next_if(|b| b.date <= *date) {
            last = Some(bar.close);
        }
        closes.push(by_date.get(date).copied().unwrap_or(f64::NAN));
        as_of.push(last);
    }
    BenchmarkSeries::with_as_of(symbol, closes, as_of)
}
