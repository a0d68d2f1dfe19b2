//! Performance reporting: month-start resampling, drawdowns, monthly
//! returns, trade-return distribution and summary metrics.

pub mod drawdown;
pub mod markdown;
pub mod monthly;
pub mod returns_grid;
pub mod trade_stats;

use breakout52_core::{BenchmarkSeries, SimulationResult, Trade};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::metrics::{EquityMetrics, PerformanceMetrics};

pub use drawdown::{DrawdownPoint, DrawdownSummary};
pub use markdown::MarkdownReportGenerator;
pub use monthly::{month_start_indices, monthly_rows, MonthlyRow};
pub use returns_grid::{monthly_returns, pivot_by_year, MonthlyReturn};
pub use trade_stats::{HistogramBin, TradeReturnStats};

/// Headline numbers for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub trading_days: usize,
    pub starting_cash: f64,
    pub final_value: f64,
    pub total_commission: f64,
    pub signal_count: usize,
    pub open_positions: usize,
    pub blocked_days: usize,
    pub portfolio: PerformanceMetrics,
    pub benchmark_symbol: String,
    /// `None` when the benchmark has fewer than two observations.
    pub benchmark: Option<EquityMetrics>,
}

/// Everything the CLI prints and `report.json` stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub summary: RunSummary,
    pub monthly: Vec<MonthlyRow>,
    pub drawdowns: DrawdownSummary,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub trade_returns: Option<TradeReturnStats>,
    /// Earliest trades by entry date.
    pub first_trades: Vec<Trade>,
    /// Latest trades by entry date.
    pub last_trades: Vec<Trade>,
}

impl PerformanceReport {
    /// `benchmark` must be aligned to the calendar the simulation ran on.
    pub fn build(
        result: &SimulationResult,
        benchmark: &BenchmarkSeries,
        config: &ReportConfig,
    ) -> Self {
        let equity: Vec<f64> = result.snapshots.iter().map(|s| s.total_value).collect();
        let benchmark_curve: Vec<f64> = benchmark.forward_filled().into_iter().flatten().collect();
        let benchmark_metrics =
            (benchmark_curve.len() >= 2).then(|| EquityMetrics::compute(&benchmark_curve));

        let monthly = monthly_rows(result, benchmark);
        let drawdowns = DrawdownSummary::from_monthly(&monthly, config.drawdown_rows);
        let monthly_returns = monthly_returns(&monthly);

        let mut by_entry: Vec<&Trade> = result.trades.iter().collect();
        by_entry.sort_by_key(|t| (t.entry_date, t.exit_date));
        let n = config.trade_rows;
        let first_trades = by_entry.iter().take(n).map(|t| (*t).clone()).collect();
        let last_trades = by_entry[by_entry.len().saturating_sub(n)..]
            .iter()
            .map(|t| (*t).clone())
            .collect();

        let summary = RunSummary {
            run_id: result.fingerprint.short().to_string(),
            start_date: result.snapshots.first().map(|s| s.date),
            end_date: result.snapshots.last().map(|s| s.date),
            trading_days: result.snapshots.len(),
            starting_cash: result.config.starting_cash,
            final_value: result.final_value(),
            total_commission: result.total_commission,
            signal_count: result.signal_count,
            open_positions: result.open_positions.len(),
            blocked_days: result.blocked_days(),
            portfolio: PerformanceMetrics::compute(
                &equity,
                &result.trades,
                result.config.starting_cash,
            ),
            benchmark_symbol: result.benchmark_symbol.clone(),
            benchmark: benchmark_metrics,
        };

        Self {
            summary,
            monthly,
            drawdowns,
            monthly_returns,
            trade_returns: TradeReturnStats::compute(&result.trades, config.histogram_bins),
            first_trades,
            last_trades,
        }
    }
}
