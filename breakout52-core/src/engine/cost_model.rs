//! Flat-rate commission.

use serde::{Deserialize, Serialize};

/// Commission as a fraction of traded notional, charged on each side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub rate: f64,
}

impl CostModel {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0)
    }

    /// `commission = notional * rate`
    pub fn commission(&self, notional: f64) -> f64 {
        notional * self.rate
    }

    pub fn is_frictionless(&self) -> bool {
        self.rate == 0.0
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_charges_nothing() {
        let cost = CostModel::frictionless();
        assert!(cost.is_frictionless());
        assert_eq!(cost.commission(20.0), 0.0);
    }

    #[test]
    fn commission_is_proportional() {
        let cost = CostModel::new(0.0003);
        // 20 * 0.0003 = 0.006
        assert!((cost.commission(20.0) - 0.006).abs() < 1e-12);
        assert!((cost.commission(40.0) - 0.012).abs() < 1e-12);
    }
}
