//! Prior rolling high: max(high) over the `lookback` positions strictly
//! before each index.
//!
//! Missing highs (NaN) are skipped and do not count toward `min_periods`.
//! The output at index `i` depends only on `highs[..i]`.

use std::collections::VecDeque;

/// Prior rolling high for every index, NaN where fewer than `min_periods`
/// observed highs fall inside the window.
///
/// Sliding maximum over a monotonic deque of indices whose highs are strictly
/// decreasing from front to back.
pub fn prior_high_series(highs: &[f64], lookback: usize, min_periods: usize) -> Vec<f64> {
    let n = highs.len();
    let mut out = vec![f64::NAN; n];
    if lookback == 0 {
        return out;
    }

    let mut deque: VecDeque<usize> = VecDeque::with_capacity(lookback.min(n));
    let mut observed = 0usize;

    for i in 0..n {
        // Window for index i is [i - lookback, i).
        if i > lookback {
            let leaving = i - lookback - 1;
            if highs[leaving].is_finite() {
                observed -= 1;
            }
        }
        let window_start = i.saturating_sub(lookback);
        while deque.front().is_some_and(|&j| j < window_start) {
            deque.pop_front();
        }

        if observed >= min_periods.max(1) {
            if let Some(&front) = deque.front() {
                out[i] = highs[front];
            }
        }

        let h = highs[i];
        if h.is_finite() {
            observed += 1;
            while deque.back().is_some_and(|&j| highs[j] <= h) {
                deque.pop_back();
            }
            deque.push_back(i);
        }
    }

    out
}

/// Direct window scan. Reference for `prior_high_series`.
pub fn prior_high_naive(
    highs: &[f64],
    index: usize,
    lookback: usize,
    min_periods: usize,
) -> Option<f64> {
    let end = index.min(highs.len());
    let start = index.saturating_sub(lookback);
    if start >= end {
        return None;
    }
    let observed: Vec<f64> = highs[start..end]
        .iter()
        .copied()
        .filter(|h| h.is_finite())
        .collect();
    if observed.is_empty() || observed.len() < min_periods {
        return None;
    }
    observed.into_iter().reduce(f64::max)
}
