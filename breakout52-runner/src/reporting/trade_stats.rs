//! Distribution of per-trade returns.

use breakout52_core::Trade;
use serde::{Deserialize, Serialize};

use crate::metrics::{mean_f64, std_dev};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Summary of `return_pct` over closed trades. Values are percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReturnStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Fraction of trades with a positive return.
    pub win_rate: f64,
    pub histogram: Vec<HistogramBin>,
}

impl TradeReturnStats {
    /// `None` when there are no trades.
    pub fn compute(trades: &[Trade], bins: usize) -> Option<Self> {
        let mut returns: Vec<f64> = trades
            .iter()
            .map(|t| t.return_pct)
            .filter(|r| r.is_finite())
            .collect();
        if returns.is_empty() {
            return None;
        }
        returns.sort_by(f64::total_cmp);

        let count = returns.len();
        let min = returns[0];
        let max = returns[count - 1];
        let median = if count % 2 == 1 {
            returns[count / 2]
        } else {
            (returns[count / 2 - 1] + returns[count / 2]) / 2.0
        };
        let winners = returns.iter().filter(|&&r| r > 0.0).count();

        Some(Self {
            count,
            mean: mean_f64(&returns),
            median,
            std_dev: std_dev(&returns),
            min,
            max,
            win_rate: winners as f64 / count as f64,
            histogram: histogram(&returns, bins),
        })
    }
}

/// Equal-width bins over `[min, max]`; the last bin is closed on the right.
/// A degenerate range is widened to `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(return_pct: f64) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        Trade {
            ticker: "MMM".into(),
            entry_date: date,
            entry_index: 0,
            entry_price: 100.0,
            entry_amount: 20.0,
            shares: 0.2,
            exit_date: date,
            exit_index: 15,
            exit_price: 100.0 + return_pct,
            exit_amount: 0.2 * (100.0 + return_pct),
            return_pct,
            entry_commission: 0.0,
            exit_commission: 0.0,
            total_commission: 0.0,
        }
    }

    #[test]
    fn no_trades_no_stats() {
        assert!(TradeReturnStats::compute(&[], 30).is_none());
    }

    #[test]
    fn summary_statistics() {
        let trades: Vec<Trade> = [4.0, -2.0, 1.0, 3.0].into_iter().map(trade).collect();
        let stats = TradeReturnStats::compute(&trades, 30).unwrap();
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 1.5).abs() < 1e-12);
        assert!((stats.median - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.win_rate - 0.75).abs() < 1e-12);
        // sample std of [-2, 1, 3, 4]
        let expected = ((12.25 + 0.25 + 2.25 + 6.25) / 3.0_f64).sqrt();
        assert!((stats.std_dev - expected).abs() < 1e-12);
        assert_eq!(stats.histogram.len(), 30);
        assert_eq!(stats.histogram.iter().map(|b| b.count).sum::<usize>(), 4);
    }

    #[test]
    fn histogram_edges() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[3].upper, 4.0);
    }

    #[test]
    fn histogram_single_value() {
        let bins = histogram(&[5.0, 5.0], 2);
        assert_eq!(bins[0].lower, 4.5);
        assert_eq!(bins[1].upper, 5.5);
        assert_eq!(bins[1].count, 2);
        assert!(histogram(&[], 10).is_empty());
    }
}
