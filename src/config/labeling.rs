use super::traits::ConfigSection;
use crate::error::TradegateError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Barrier multipliers for one instrument: (profit take, stop loss) in ATR units.
pub type BarrierFactors = (f64, f64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelingConfig {
    pub profit_take_mult: f64,   // e.g., 1.5 = 1.5 * ATR above entry
    pub stop_loss_mult: f64,     // e.g., 1.0 = 1.0 * ATR below entry
    pub lookahead_days: usize,   // time barrier, in trading days
    pub atr_period: usize,       // volatility window, 14 by convention
    /// Per-symbol overrides for the barrier multipliers.
    pub symbol_factors: HashMap<String, BarrierFactors>,
}

impl LabelingConfig {
    /// Multipliers for a symbol, falling back to the defaults.
    pub fn factors_for(&self, symbol: &str) -> BarrierFactors {
        self.symbol_factors
            .get(symbol)
            .copied()
            .unwrap_or((self.profit_take_mult, self.stop_loss_mult))
    }

    /// The same config with the multipliers resolved for one symbol, ready
    /// to hand to the labeler.
    pub fn for_symbol(mut self, symbol: &str) -> Self {
        let (pt, sl) = self.factors_for(symbol);
        self.profit_take_mult = pt;
        self.stop_loss_mult = sl;
        self
    }
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            profit_take_mult: 1.5,
            stop_loss_mult: 1.0,
            lookahead_days: 5,
            atr_period: 14,
            symbol_factors: HashMap::new(),
        }
    }
}

impl ConfigSection for LabelingConfig {
    fn section_name() -> &'static str {
        "labeling"
    }

    fn validate(&self) -> Result<(), TradegateError> {
        if self.profit_take_mult < 0.0 || self.stop_loss_mult < 0.0 {
            return Err(TradegateError::Configuration(
                "Barrier multipliers must be non-negative".to_string(),
            ));
        }
        if self.lookahead_days < 1 {
            return Err(TradegateError::Configuration(
                "Lookahead window must be at least 1 trading day".to_string(),
            ));
        }
        if self.atr_period < 1 {
            return Err(TradegateError::Configuration(
                "ATR period must be at least 1".to_string(),
            ));
        }
        for (symbol, (pt, sl)) in &self.symbol_factors {
            if *pt < 0.0 || *sl < 0.0 {
                return Err(TradegateError::Configuration(format!(
                    "Barrier multipliers for {} must be non-negative",
                    symbol
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_factors_fall_back_to_defaults() {
        let mut config = LabelingConfig::default();
        config.symbol_factors.insert("VALE3".to_string(), (1.3, 0.8));

        assert_eq!(config.factors_for("VALE3"), (1.3, 0.8));
        assert_eq!(config.factors_for("ITSA4"), (1.5, 1.0));

        let resolved = config.for_symbol("VALE3");
        assert_eq!(resolved.profit_take_mult, 1.3);
        assert_eq!(resolved.stop_loss_mult, 0.8);
    }

    #[test]
    fn rejects_zero_lookahead() {
        let config = LabelingConfig {
            lookahead_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
