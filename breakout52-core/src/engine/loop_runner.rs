//! Day-by-day simulation loop.
//!
//! Per trading date, in order:
//! 1. Mark update: record today's close for every ticker that has one
//! 2. Exit pass: close positions held for `hold_period_days` calendar steps
//! 3. Entry pass: open breakouts in universe order while cash allows
//! 4. Valuation: append the day's snapshot

use std::collections::HashMap;

use super::config::{validate_universe, StrategyConfig};
use super::cost_model::CostModel;
use super::ledger::{OpenRefusal, PortfolioLedger};
use super::state::{SimulationError, SimulationResult};
use crate::data::{BenchmarkSeries, PriceHistory};
use crate::domain::{BlockedEntries, Ticker};
use crate::fingerprint::{dataset_hash, RunFingerprint};
use crate::signal::SignalEngine;

/// Run the breakout strategy over `history`.
///
/// `benchmark` must be aligned to the history's calendar. It does not affect
/// trading; it is checked for overlap and folded into the run fingerprint.
pub fn run_simulation(
    history: &PriceHistory,
    benchmark: &BenchmarkSeries,
    config: &StrategyConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    validate_universe(history.tickers())?;
    check_data(history, benchmark)?;

    let calendar = history.calendar();
    let tickers = history.tickers();
    let num_days = calendar.len();

    let signals = SignalEngine::new(history, config.lookback_window, config.min_periods);
    let cost = CostModel::new(config.transaction_cost_pct);
    let mut ledger = PortfolioLedger::new(config.starting_cash);

    // Last valid close per ticker; void days keep the previous mark.
    let mut marks: HashMap<Ticker, f64> = HashMap::with_capacity(tickers.len());
    let mut snapshots = Vec::with_capacity(num_days);
    let mut blocked = Vec::with_capacity(num_days);

    tracing::info!(
        tickers = tickers.len(),
        days = num_days,
        first = ?calendar.first(),
        last = ?calendar.last(),
        "starting simulation"
    );

    for (index, &date) in calendar.dates().iter().enumerate() {
        for ticker in tickers {
            if let Some(close) = history.close(ticker, index) {
                marks.insert(ticker.clone(), close);
            }
        }

        let due: Vec<(Ticker, f64)> = ledger
            .open_positions()
            .iter()
            .filter(|p| p.bars_held(index) >= config.hold_period_days)
            .map(|p| {
                let price = marks.get(&p.ticker).copied().unwrap_or(p.entry_price);
                (p.ticker.clone(), price)
            })
            .collect();
        for (ticker, price) in due {
            ledger.close(&ticker, index, date, price, &cost);
        }

        let mut blocked_today = Vec::new();
        for ticker in tickers {
            if ledger.has_position(ticker) {
                continue;
            }
            let (Some(_), Some(close)) = (history.high(ticker, index), history.close(ticker, index))
            else {
                continue;
            };
            if !signals.is_breakout(ticker, index) {
                continue;
            }
            match ledger.try_open(ticker, index, date, close, config.position_size, &cost) {
                Ok(_) => {}
                Err(OpenRefusal::InsufficientFunds { .. }) => blocked_today.push(ticker.clone()),
                Err(refusal) => tracing::debug!(ticker, %date, %refusal, "entry skipped"),
            }
        }

        snapshots.push(ledger.valuation(date, index, &marks));
        blocked.push(BlockedEntries {
            date,
            tickers: blocked_today,
        });
    }

    let total_commission = ledger.total_commission();
    let (trades, open_positions) = ledger.into_parts();
    let fingerprint = RunFingerprint::new(config, tickers, dataset_hash(history, benchmark));

    tracing::info!(
        trades = trades.len(),
        open = open_positions.len(),
        signals = signals.signal_count(),
        final_value = snapshots.last().map(|s| s.total_value),
        "simulation complete"
    );

    Ok(SimulationResult {
        config: config.clone(),
        tickers: tickers.to_vec(),
        benchmark_symbol: benchmark.symbol.clone(),
        snapshots,
        trades,
        blocked,
        open_positions,
        total_commission,
        signal_count: signals.signal_count(),
        fingerprint,
    })
}

fn check_data(history: &PriceHistory, benchmark: &BenchmarkSeries) -> Result<(), SimulationError> {
    let days = history.num_days();
    if days == 0 {
        return Err(SimulationError::DataIntegrity(
            "trading calendar is empty".into(),
        ));
    }
    if benchmark.len() != days {
        return Err(SimulationError::DataIntegrity(format!(
            "benchmark '{}' has {} values, calendar has {days}",
            benchmark.symbol,
            benchmark.len()
        )));
    }
    if benchmark.observed_count() == 0 {
        return Err(SimulationError::DataIntegrity(format!(
            "benchmark '{}' shares no dates with the universe calendar",
            benchmark.symbol
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceSeries;
    use crate::engine::config::ConfigError;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    fn flat_history(tickers: &[&str], n: usize) -> PriceHistory {
        PriceHistory::from_columns(
            dates(n),
            tickers
                .iter()
                .map(|t| (t.to_string(), PriceSeries::new(vec![10.0; n], vec![10.0; n])))
                .collect(),
        )
        .unwrap()
    }

    fn bench(n: usize) -> BenchmarkSeries {
        BenchmarkSeries::new("^DJI", vec![100.0; n])
    }

    #[test]
    fn flat_prices_never_trade() {
        let h = flat_history(&["A", "B"], 30);
        let result = run_simulation(&h, &bench(30), &StrategyConfig::default()).unwrap();
        assert_eq!(result.snapshots.len(), 30);
        assert_eq!(result.blocked.len(), 30);
        assert!(result.trades.is_empty());
        assert_eq!(result.final_value(), 100.0);
        assert_eq!(result.signal_count, 0);
    }

    #[test]
    fn invalid_config_is_fatal() {
        let h = flat_history(&["A"], 5);
        let config = StrategyConfig {
            hold_period_days: 0,
            ..Default::default()
        };
        assert!(matches!(
            run_simulation(&h, &bench(5), &config),
            Err(SimulationError::Config(ConfigError::ZeroHoldPeriod))
        ));
    }

    #[test]
    fn empty_universe_is_fatal() {
        let h = PriceHistory::from_columns(dates(3), Vec::new()).unwrap();
        assert!(matches!(
            run_simulation(&h, &bench(3), &StrategyConfig::default()),
            Err(SimulationError::Config(ConfigError::EmptyUniverse))
        ));
    }

    #[test]
    fn empty_calendar_is_fatal() {
        let h = flat_history(&["A"], 0);
        assert!(matches!(
            run_simulation(&h, &bench(0), &StrategyConfig::default()),
            Err(SimulationError::DataIntegrity(_))
        ));
    }

    #[test]
    fn benchmark_without_overlap_is_fatal() {
        let h = flat_history(&["A"], 4);
        let benchmark = BenchmarkSeries::new("^DJI", vec![f64::NAN; 4]);
        assert!(matches!(
            run_simulation(&h, &benchmark, &StrategyConfig::default()),
            Err(SimulationError::DataIntegrity(_))
        ));
    }

    #[test]
    fn snapshot_lookup_by_date() {
        let h = flat_history(&["A"], 5);
        let result = run_simulation(&h, &bench(5), &StrategyConfig::default()).unwrap();
        let day = dates(5)[3];
        assert_eq!(result.snapshot_on(day).map(|s| s.calendar_index), Some(3));
        assert!(result
            .snapshot_on(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
            .is_none());
    }
}
