//! Month-start resampling of the daily simulation output.

use breakout52_core::{BenchmarkSeries, SimulationResult, Ticker};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Portfolio state on the first trading date of a calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub date: NaiveDate,
    pub cash: f64,
    pub invested_value: f64,
    pub total_value: f64,
    pub total_value_ex_commission: f64,
    /// Benchmark rebased to 100 at the first month-start row with a value.
    pub benchmark_value: Option<f64>,
    pub holdings: Vec<Ticker>,
    /// Breakouts that could not be funded on this date.
    pub blocked: Vec<Ticker>,
}

impl MonthlyRow {
    pub fn num_holdings(&self) -> usize {
        self.holdings.len()
    }
}

/// Indices of the first date of each calendar month. `dates` must be sorted.
pub fn month_start_indices(dates: &[NaiveDate]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut current: Option<(i32, u32)> = None;
    for (i, date) in dates.iter().enumerate() {
        let key = (date.year(), date.month());
        if current != Some(key) {
            out.push(i);
            current = Some(key);
        }
    }
    out
}

/// Resample snapshots to month starts.
///
/// `benchmark` must be aligned to the same calendar as `result.snapshots`;
/// gaps are forward-filled before rebasing.
pub fn monthly_rows(result: &SimulationResult, benchmark: &BenchmarkSeries) -> Vec<MonthlyRow> {
    let dates: Vec<NaiveDate> = result.snapshots.iter().map(|s| s.date).collect();
    let filled = benchmark.forward_filled();
    let indices = month_start_indices(&dates);

    let base = indices
        .iter()
        .find_map(|&i| filled.get(i).copied().flatten())
        .filter(|v| *v != 0.0);

    indices
        .into_iter()
        .map(|i| {
            let snap = &result.snapshots[i];
            let benchmark_value = match (base, filled.get(i).copied().flatten()) {
                (Some(base), Some(v)) => Some(100.0 * v / base),
                _ => None,
            };
            let blocked = result
                .blocked
                .get(i)
                .filter(|b| b.date == snap.date)
                .map(|b| b.tickers.clone())
                .unwrap_or_default();
            MonthlyRow {
                date: snap.date,
                cash: snap.cash,
                invested_value: snap.invested_value,
                total_value: snap.total_value,
                total_value_ex_commission: snap.total_value_ex_commission,
                benchmark_value,
                holdings: snap.holdings.clone(),
                blocked,
            }
        })
        .collect()
}
