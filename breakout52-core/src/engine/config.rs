//! Strategy parameters and their validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::Ticker;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("position_size must be a positive finite number, got {0}")]
    InvalidPositionSize(f64),

    #[error("hold_period_days must be at least 1")]
    ZeroHoldPeriod,

    #[error("ticker universe is empty")]
    EmptyUniverse,

    #[error("ticker '{0}' appears more than once in the universe")]
    DuplicateTicker(Ticker),

    #[error("starting_cash must be a non-negative finite number, got {0}")]
    InvalidStartingCash(f64),

    #[error("transaction_cost_pct must be a non-negative finite number, got {0}")]
    InvalidCostRate(f64),

    #[error("lookback_window must be at least 1")]
    ZeroLookback,

    #[error("min_periods must be in 1..={lookback_window}, got {min_periods}")]
    InvalidMinPeriods {
        min_periods: usize,
        lookback_window: usize,
    },
}

/// Parameters of the breakout strategy.
///
/// `transaction_cost_pct` is a fraction (0.0003 = 3 bps) charged on both the
/// entry and the exit notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    pub starting_cash: f64,
    pub position_size: f64,
    pub hold_period_days: usize,
    pub transaction_cost_pct: f64,
    pub lookback_window: usize,
    pub min_periods: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            starting_cash: 100.0,
            position_size: 20.0,
            hold_period_days: 15,
            transaction_cost_pct: 0.0003,
            lookback_window: 252,
            min_periods: 50,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.position_size.is_finite() && self.position_size > 0.0) {
            return Err(ConfigError::InvalidPositionSize(self.position_size));
        }
        if self.hold_period_days == 0 {
            return Err(ConfigError::ZeroHoldPeriod);
        }
        if !(self.starting_cash.is_finite() && self.starting_cash >= 0.0) {
            return Err(ConfigError::InvalidStartingCash(self.starting_cash));
        }
        if !(self.transaction_cost_pct.is_finite() && self.transaction_cost_pct >= 0.0) {
            return Err(ConfigError::InvalidCostRate(self.transaction_cost_pct));
        }
        if self.lookback_window == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        if self.min_periods == 0 || self.min_periods > self.lookback_window {
            return Err(ConfigError::InvalidMinPeriods {
                min_periods: self.min_periods,
                lookback_window: self.lookback_window,
            });
        }
        Ok(())
    }
}

/// The universe must be non-empty and free of duplicates.
pub fn validate_universe(tickers: &[Ticker]) -> Result<(), ConfigError> {
    if tickers.is_empty() {
        return Err(ConfigError::EmptyUniverse);
    }
    let mut seen = HashSet::with_capacity(tickers.len());
    for ticker in tickers {
        if !seen.insert(ticker.as_str()) {
            return Err(ConfigError::DuplicateTicker(ticker.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StrategyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hold_period_days, 15);
        assert_eq!(config.lookback_window, 252);
    }

    #[test]
    fn rejects_bad_position_size() {
        for size in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let config = StrategyConfig {
                position_size: size,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidPositionSize(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_hold_and_lookback() {
        let config = StrategyConfig {
            hold_period_days: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroHoldPeriod));

        let config = StrategyConfig {
            lookback_window: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroLookback));
    }

    #[test]
    fn rejects_min_periods_out_of_range() {
        let config = StrategyConfig {
            lookback_window: 10,
            min_periods: 11,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMinPeriods { .. })
        ));
        let config = StrategyConfig {
            min_periods: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_cash_and_cost() {
        let config = StrategyConfig {
            starting_cash: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStartingCash(_))
        ));
        let config = StrategyConfig {
            transaction_cost_pct: -0.01,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCostRate(_))
        ));
    }

    #[test]
    fn universe_checks() {
        assert_eq!(validate_universe(&[]), Err(ConfigError::EmptyUniverse));
        let dup = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        assert_eq!(
            validate_universe(&dup),
            Err(ConfigError::DuplicateTicker("A".into()))
        );
        assert!(validate_universe(&["A".to_string()]).is_ok());
    }

    #[test]
    fn deserializes_partial_and_rejects_unknown() {
        let config: StrategyConfig = serde_json::from_str(r#"{"hold_period_days": 5}"#).unwrap();
        assert_eq!(config.hold_period_days, 5);
        assert_eq!(config.position_size, 20.0);
        assert!(serde_json::from_str::<StrategyConfig>(r#"{"bogus": 1}"#).is_err());
    }
}
