//! Run fingerprinting: deterministic identification of a run's inputs.
//!
//! - `config_hash`: BLAKE3 over canonical JSON of the strategy parameters and
//!   the universe (in order).
//! - `dataset_hash`: BLAKE3 over the aligned calendar and price values.
//! - `run_hash`: BLAKE3 over both. Identical inputs give identical run hashes.

use serde::{Deserialize, Serialize};

use crate::data::{BenchmarkSeries, PriceHistory};
use crate::engine::StrategyConfig;
use crate::domain::Ticker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: String,
    pub dataset_hash: String,
    pub run_hash: String,
}

impl RunFingerprint {
    pub fn new(config: &StrategyConfig, tickers: &[Ticker], dataset_hash: String) -> Self {
        let config_hash = config_hash(config, tickers);
        let mut hasher = blake3::Hasher::new();
        hasher.update(config_hash.as_bytes());
        hasher.update(dataset_hash.as_bytes());
        Self {
            config_hash,
            dataset_hash,
            run_hash: hasher.finalize().to_hex().to_string(),
        }
    }

    /// First 12 hex characters of the run hash; used for artifact directory names.
    pub fn short(&self) -> &str {
        &self.run_hash[..self.run_hash.len().min(12)]
    }
}

pub fn config_hash(config: &StrategyConfig, tickers: &[Ticker]) -> String {
    // serde_json maps are key-ordered, so the text is canonical.
    let canonical = serde_json::json!({
        "strategy": {
            "starting_cash": config.starting_cash,
            "position_size": config.position_size,
            "hold_period_days": config.hold_period_days,
            "transaction_cost_pct": config.transaction_cost_pct,
            "lookback_window": config.lookback_window,
            "min_periods": config.min_periods,
        },
        "universe": tickers,
    });
    blake3::hash(canonical.to_string().as_bytes())
        .to_hex()
        .to_string()
}

/// Hash of every value the simulation can observe. NaN gaps hash by bit
/// pattern, so a missing bar changes the hash.
pub fn dataset_hash(history: &PriceHistory, benchmark: &BenchmarkSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    for date in history.calendar().dates() {
        hasher.update(date.to_string().as_bytes());
    }
    for ticker in history.tickers() {
        hasher.update(ticker.as_bytes());
        if let Some(series) = history.series(ticker) {
            for v in series.closes().iter().chain(series.highs()) {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
    }
    hasher.update(benchmark.symbol.as_bytes());
    for i in 0..benchmark.len() {
        let v = benchmark.close_at(i).unwrap_or(f64::NAN);
        hasher.update(&v.to_bits().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceSeries;
    use chrono::NaiveDate;

    fn tickers() -> Vec<Ticker> {
        vec!["AAPL".into(), "MSFT".into()]
    }

    fn history(close: f64) -> PriceHistory {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        PriceHistory::from_columns(
            vec![d],
            vec![("A".into(), PriceSeries::new(vec![close], vec![close]))],
        )
        .unwrap()
    }

    #[test]
    fn config_hash_is_deterministic() {
        let c = StrategyConfig::default();
        assert_eq!(config_hash(&c, &tickers()), config_hash(&c, &tickers()));
        assert_eq!(config_hash(&c, &tickers()).len(), 64);
    }

    #[test]
    fn config_hash_sensitive_to_params_and_order() {
        let c1 = StrategyConfig::default();
        let c2 = StrategyConfig {
            hold_period_days: 10,
            ..Default::default()
        };
        assert_ne!(config_hash(&c1, &tickers()), config_hash(&c2, &tickers()));

        let mut reversed = tickers();
        reversed.reverse();
        assert_ne!(config_hash(&c1, &tickers()), config_hash(&c1, &reversed));
    }

    #[test]
    fn dataset_hash_tracks_prices() {
        let b = BenchmarkSeries::new("^DJI", vec![1.0]);
        assert_eq!(dataset_hash(&history(1.0), &b), dataset_hash(&history(1.0), &b));
        assert_ne!(dataset_hash(&history(1.0), &b), dataset_hash(&history(2.0), &b));
    }

    #[test]
    fn run_hash_combines_both() {
        let c = StrategyConfig::default();
        let f1 = RunFingerprint::new(&c, &tickers(), "abc".into());
        let f2 = RunFingerprint::new(&c, &tickers(), "abd".into());
        assert_eq!(f1.config_hash, f2.config_hash);
        assert_ne!(f1.run_hash, f2.run_hash);
        assert_eq!(f1.short().len(), 12);
    }
}
