//! Performance metrics: pure functions from an equity curve and/or trade
//! list to a scalar.
//!
//! Fractions, not percentages. Daily series are annualized with 252
//! trading days.

use breakout52_core::Trade;
use serde::{Deserialize, Serialize};

const TRADING_DAYS: f64 = 252.0;

/// Curve-only statistics, shared by the portfolio and the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
}

impl EquityMetrics {
    pub fn compute(equity_curve: &[f64]) -> Self {
        let days = equity_curve.len();
        Self {
            total_return: total_return(equity_curve),
            cagr: cagr(equity_curve, days),
            volatility: annualized_volatility(equity_curve),
            sharpe: sharpe_ratio(equity_curve, 0.0),
            sortino: sortino_ratio(equity_curve, 0.0),
            calmar: calmar_ratio(equity_curve, days),
            max_drawdown: max_drawdown(equity_curve),
        }
    }
}

/// Aggregate metrics for the simulated portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub equity: EquityMetrics,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub turnover: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[Trade], starting_cash: f64) -> Self {
        Self {
            equity: EquityMetrics::compute(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            turnover: turnover(trades, starting_cash, equity_curve.len()),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
        }
    }
}

// ─── Curve metrics ──────────────────────────────────────────────────

fn endpoints(equity_curve: &[f64]) -> Option<(f64, f64)> {
    if equity_curve.len() < 2 {
        return None;
    }
    Some((*equity_curve.first()?, *equity_curve.last()?))
}

/// `(final - initial) / initial`.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match endpoints(equity_curve) {
        Some((initial, final_eq)) if initial > 0.0 => (final_eq - initial) / initial,
        _ => 0.0,
    }
}

/// Compound annual growth rate. 0.0 for fewer than two points.
pub fn cagr(equity_curve: &[f64], trading_days: usize) -> f64 {
    if trading_days < 2 {
        return 0.0;
    }
    let Some((initial, final_eq)) = endpoints(equity_curve) else {
        return 0.0;
    };
    if initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = trading_days as f64 / TRADING_DAYS;
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Standard deviation of daily returns, annualized.
pub fn annualized_volatility(equity_curve: &[f64]) -> f64 {
    std_dev(&daily_returns(equity_curve)) * TRADING_DAYS.sqrt()
}

/// Annualized Sharpe ratio. 0.0 when the daily returns have no variance.
pub fn sharpe_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / TRADING_DAYS;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&excess) / std) * TRADING_DAYS.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
pub fn sortino_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / TRADING_DAYS;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();

    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&excess) / downside_std) * TRADING_DAYS.sqrt()
}

/// CAGR / |max drawdown|. 0.0 without a drawdown or with non-positive CAGR.
pub fn calmar_ratio(equity_curve: &[f64], trading_days: usize) -> f64 {
    let c = cagr(equity_curve, trading_days);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction (-0.15 = 15% below the peak).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

// ─── Trade metrics ──────────────────────────────────────────────────

/// Fraction of trades with a positive price return.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profit / gross loss on net PnL, capped at 100.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let (gross_profit, gross_loss) = trades.iter().map(Trade::net_pnl).fold(
        (0.0_f64, 0.0_f64),
        |(p, l), pnl| {
            if pnl > 0.0 {
                (p + pnl, l)
            } else {
                (p, l - pnl)
            }
        },
    );

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Traded notional (both legs) per unit of starting cash, per year.
pub fn turnover(trades: &[Trade], starting_cash: f64, trading_days: usize) -> f64 {
    if trades.is_empty() || starting_cash <= 0.0 || trading_days < 2 {
        return 0.0;
    }
    let total_notional: f64 = trades.iter().map(|t| t.entry_amount + t.exit_amount).sum();
    let years = trading_days as f64 / TRADING_DAYS;
    total_notional / starting_cash / years
}

pub fn max_consecutive_wins(trades: &[Trade]) -> usize {
    max_consecutive(trades, true)
}

pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    max_consecutive(trades, false)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple daily returns. A non-positive base yields 0.0.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_trade(return_pct: f64) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let exit_price = 100.0 * (1.0 + return_pct / 100.0);
        Trade {
            ticker: "KO".into(),
            entry_date: date,
            entry_index: 0,
            entry_price: 100.0,
            entry_amount: 20.0,
            shares: 0.2,
            exit_date: date,
            exit_index: 15,
            exit_price,
            exit_amount: 0.2 * exit_price,
            return_pct,
            entry_commission: 0.0,
            exit_commission: 0.0,
            total_commission: 0.0,
        }
    }

    // ── Curve metrics ──

    #[test]
    fn total_return_known() {
        assert!((total_return(&[100.0, 100.5, 101.0, 110.0]) - 0.1).abs() < 1e-10);
        assert!((total_return(&[100.0, 95.0, 90.0]) + 0.1).abs() < 1e-10);
        assert_eq!(total_return(&[100.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn cagr_one_year() {
        let mut eq = vec![100.0];
        for i in 1..252 {
            eq.push(eq[i - 1] * 1.1_f64.powf(1.0 / 251.0));
        }
        let c = cagr(&eq, 252);
        assert!((c - 0.1).abs() < 0.005, "CAGR should be ~10%, got {c}");
        assert_eq!(cagr(&[100.0; 252], 252), 0.0);
        assert_eq!(cagr(&[100.0], 1), 0.0);
    }

    #[test]
    fn sharpe_edge_cases() {
        assert_eq!(sharpe_ratio(&[100.0; 100], 0.0), 0.0);
        assert_eq!(sharpe_ratio(&[100.0], 0.0), 0.0);

        let mut constant = vec![100.0];
        for i in 1..253 {
            constant.push(constant[i - 1] * 1.001);
        }
        assert_eq!(sharpe_ratio(&constant, 0.0), 0.0);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        let mut eq = vec![100.0];
        for i in 1..253 {
            let r = if i % 2 == 0 { 1.002 } else { 1.0005 };
            eq.push(eq[i - 1] * r);
        }
        let s = sharpe_ratio(&eq, 0.0);
        assert!(s > 5.0, "got {s}");
        assert!(annualized_volatility(&eq) > 0.0);
    }

    #[test]
    fn sortino_needs_downside() {
        let rising: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        assert_eq!(sortino_ratio(&rising, 0.0), 0.0);

        let mut eq = vec![100.0];
        for r in std::iter::repeat(1.002)
            .take(50)
            .chain(std::iter::repeat(0.995).take(10))
            .chain(std::iter::repeat(1.002).take(50))
        {
            let last = eq[eq.len() - 1];
            eq.push(last * r);
        }
        assert!(sortino_ratio(&eq, 0.0) > 0.0);
    }

    #[test]
    fn max_drawdown_known() {
        let dd = max_drawdown(&[100.0, 110.0, 90.0, 95.0]);
        assert!((dd - (90.0 - 110.0) / 110.0).abs() < 1e-10);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn calmar_requires_drawdown() {
        let rising: Vec<f64> = (0..252).map(|i| 100.0 + i as f64).collect();
        assert_eq!(calmar_ratio(&rising, 252), 0.0);

        let mut eq = vec![100.0];
        for r in std::iter::repeat(1.001)
            .take(126)
            .chain(std::iter::repeat(0.998).take(30))
            .chain(std::iter::repeat(1.002).take(96))
        {
            let last = eq[eq.len() - 1];
            eq.push(last * r);
        }
        assert!(calmar_ratio(&eq, eq.len()) > 0.0);
    }

    // ── Trade metrics ──

    #[test]
    fn win_rate_mixed() {
        let trades = vec![
            make_trade(5.0),
            make_trade(-2.0),
            make_trade(3.0),
            make_trade(-1.0),
        ];
        assert!((win_rate(&trades) - 0.5).abs() < 1e-10);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn flat_trade_is_not_a_win() {
        assert_eq!(win_rate(&[make_trade(0.0)]), 0.0);
    }

    #[test]
    fn profit_factor_mixed() {
        // net pnl: +1.0, -0.4, +0.6
        let trades = vec![make_trade(5.0), make_trade(-2.0), make_trade(3.0)];
        assert!((profit_factor(&trades) - 4.0).abs() < 1e-9);
        assert_eq!(profit_factor(&[make_trade(5.0)]), 100.0);
        assert_eq!(profit_factor(&[make_trade(-5.0)]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn turnover_counts_both_legs() {
        // 20 in + 22 out over one year on 100 starting cash
        let t = turnover(&[make_trade(10.0)], 100.0, 252);
        assert!((t - 0.42).abs() < 1e-9);
        assert_eq!(turnover(&[], 100.0, 252), 0.0);
    }

    #[test]
    fn consecutive_streaks() {
        let trades = vec![
            make_trade(1.0),
            make_trade(2.0),
            make_trade(3.0),
            make_trade(-1.0),
            make_trade(-2.0),
            make_trade(2.0),
        ];
        assert_eq!(max_consecutive_wins(&trades), 3);
        assert_eq!(max_consecutive_losses(&trades), 2);
        assert_eq!(max_consecutive_wins(&[]), 0);
    }

    // ── Aggregate ──

    #[test]
    fn compute_without_trades_is_finite() {
        let m = PerformanceMetrics::compute(&[100.0; 100], &[], 100.0);
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.equity.total_return, 0.0);
        assert!(m.equity.sharpe.is_finite());
        assert!(m.equity.sortino.is_finite());
    }

    #[test]
    fn compute_with_trades() {
        let mut eq = vec![100.0];
        for i in 1..253 {
            let r = if i % 2 == 0 { 1.001 } else { 1.0003 };
            eq.push(eq[i - 1] * r);
        }
        let trades = vec![make_trade(5.0), make_trade(-2.0), make_trade(3.0)];
        let m = PerformanceMetrics::compute(&eq, &trades, 100.0);
        assert!(m.equity.total_return > 0.0);
        assert!(m.equity.sharpe > 0.0);
        assert_eq!(m.trade_count, 3);
        assert!((m.win_rate - 2.0 / 3.0).abs() < 1e-10);
        assert!(m.turnover.is_finite());
    }

    #[test]
    fn daily_returns_basic() {
        let r = daily_returns(&[100.0, 110.0, 105.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-10);
        assert!((r[1] - (105.0 - 110.0) / 110.0).abs() < 1e-10);
        assert!(daily_returns(&[100.0]).is_empty());
    }
}
