//! Peak-to-trough drawdowns on the month-start rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::monthly::MonthlyRow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// `100 * (value - running_max) / running_max`; never positive.
    pub drawdown_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSummary {
    pub portfolio: Vec<DrawdownPoint>,
    pub benchmark: Vec<DrawdownPoint>,
    /// Worst rows first.
    pub portfolio_worst: Vec<DrawdownPoint>,
    pub benchmark_worst: Vec<DrawdownPoint>,
    pub portfolio_max: Option<DrawdownPoint>,
}

impl DrawdownSummary {
    pub fn from_monthly(rows: &[MonthlyRow], worst_n: usize) -> Self {
        let portfolio = drawdown_series(rows.iter().map(|r| (r.date, Some(r.total_value))));
        let benchmark = drawdown_series(rows.iter().map(|r| (r.date, r.benchmark_value)));
        Self {
            portfolio_worst: worst(&portfolio, worst_n),
            benchmark_worst: worst(&benchmark, worst_n),
            portfolio_max: worst(&portfolio, 1).into_iter().next(),
            portfolio,
            benchmark,
        }
    }
}

/// Percentage drawdown against the running maximum.
///
/// Missing or non-finite values are skipped and do not move the maximum.
pub fn drawdown_series(
    values: impl IntoIterator<Item = (NaiveDate, Option<f64>)>,
) -> Vec<DrawdownPoint> {
    let mut running_max = f64::NEG_INFINITY;
    values
        .into_iter()
        .filter_map(|(date, value)| {
            let value = value.filter(|v| v.is_finite())?;
            running_max = running_max.max(value);
            let drawdown_pct = if running_max > 0.0 {
                (100.0 * (value - running_max) / running_max).min(0.0)
            } else {
                0.0
            };
            Some(DrawdownPoint {
                date,
                value,
                drawdown_pct,
            })
        })
        .collect()
}

/// The `n` deepest points, deepest first; ties keep date order.
pub fn worst(points: &[DrawdownPoint], n: usize) -> Vec<DrawdownPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.drawdown_pct.total_cmp(&b.drawdown_pct));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn series(values: &[f64]) -> Vec<DrawdownPoint> {
        drawdown_series(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (d(i as u32 + 1), Some(v))),
        )
    }

    #[test]
    fn drawdown_against_running_max() {
        let points = series(&[100.0, 110.0, 99.0, 120.0, 90.0]);
        let dd: Vec<f64> = points.iter().map(|p| p.drawdown_pct).collect();
        assert_eq!(dd[0], 0.0);
        assert_eq!(dd[1], 0.0);
        assert!((dd[2] + 10.0).abs() < 1e-12);
        assert_eq!(dd[3], 0.0);
        assert!((dd[4] + 25.0).abs() < 1e-12);
    }

    #[test]
    fn missing_values_are_skipped() {
        let points = drawdown_series(vec![
            (d(1), None),
            (d(2), Some(100.0)),
            (d(3), Some(f64::NAN)),
            (d(4), Some(80.0)),
        ]);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, d(2));
        assert!((points[1].drawdown_pct + 20.0).abs() < 1e-12);
    }

    #[test]
    fn worst_orders_deepest_first() {
        let points = series(&[100.0, 90.0, 95.0, 70.0, 100.0, 90.0]);
        let top = worst(&points, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].date, d(4));
        assert!((top[0].drawdown_pct + 30.0).abs() < 1e-12);
        // -10% twice: earlier date first
        assert_eq!(top[1].date, d(2));
        assert_eq!(top[2].date, d(6));
        assert!(worst(&points, 0).is_empty());
    }
}
