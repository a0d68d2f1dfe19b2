//! Month-over-month returns keyed by (year, month).

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::monthly::MonthlyRow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    /// Percent change of total value since the previous month start.
    pub portfolio_pct: Option<f64>,
    pub benchmark_pct: Option<f64>,
}

/// One entry per month-start row; the first row has no prior month.
pub fn monthly_returns(rows: &[MonthlyRow]) -> Vec<MonthlyReturn> {
    let mut out = Vec::with_capacity(rows.len());
    let mut prev: Option<&MonthlyRow> = None;
    for row in rows {
        out.push(MonthlyReturn {
            year: row.date.year(),
            month: row.date.month(),
            portfolio_pct: prev.and_then(|p| pct_change(Some(p.total_value), Some(row.total_value))),
            benchmark_pct: prev.and_then(|p| pct_change(p.benchmark_value, row.benchmark_value)),
        });
        prev = Some(row);
    }
    out
}

fn pct_change(from: Option<f64>, to: Option<f64>) -> Option<f64> {
    match (from, to) {
        (Some(a), Some(b)) if a != 0.0 && a.is_finite() && b.is_finite() => {
            Some(100.0 * (b - a) / a)
        }
        _ => None,
    }
}

/// Year x month grid of one return column (index 0 = January).
pub fn pivot_by_year(
    returns: &[MonthlyReturn],
    column: impl Fn(&MonthlyReturn) -> Option<f64>,
) -> BTreeMap<i32, [Option<f64>; 12]> {
    let mut grid: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in returns {
        let month_idx = r.month.saturating_sub(1) as usize;
        if let Some(slot) = grid.entry(r.year).or_insert([None; 12]).get_mut(month_idx) {
            *slot = column(r);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(y: i32, m: u32, total: f64, bench: Option<f64>) -> MonthlyRow {
        MonthlyRow {
            date: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            cash: total,
            invested_value: 0.0,
            total_value: total,
            total_value_ex_commission: total,
            benchmark_value: bench,
            holdings: vec![],
            blocked: vec![],
        }
    }

    #[test]
    fn month_over_month_change() {
        let rows = vec![
            row(2023, 12, 100.0, Some(100.0)),
            row(2024, 1, 110.0, Some(95.0)),
            row(2024, 2, 99.0, None),
        ];
        let r = monthly_returns(&rows);
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].portfolio_pct, None);
        assert!((r[1].portfolio_pct.unwrap() - 10.0).abs() < 1e-12);
        assert!((r[1].benchmark_pct.unwrap() + 5.0).abs() < 1e-12);
        assert!((r[2].portfolio_pct.unwrap() + 10.0).abs() < 1e-12);
        assert_eq!(r[2].benchmark_pct, None);
    }

    #[test]
    fn pivot_places_months() {
        let rows = vec![
            row(2023, 12, 100.0, None),
            row(2024, 1, 110.0, None),
            row(2024, 2, 121.0, None),
        ];
        let grid = pivot_by_year(&monthly_returns(&rows), |r| r.portfolio_pct);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[&2023][11], None);
        assert!((grid[&2024][1].unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(grid[&2024][5], None);
    }
}
