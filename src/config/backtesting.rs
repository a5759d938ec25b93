use super::traits::ConfigSection;
use crate::error::TradegateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestingConfig {
    pub cost_per_trade: f64,      // fractional cost charged on each leg
    pub annualization_days: usize, // trading days per year for Sharpe/Sortino
    pub decision_threshold: f64,  // probability above which a signal goes long
}

impl Default for BacktestingConfig {
    fn default() -> Self {
        Self {
            cost_per_trade: 0.001,
            annualization_days: 252,
            decision_threshold: 0.5,
        }
    }
}

impl ConfigSection for BacktestingConfig {
    fn section_name() -> &'static str {
        "backtesting"
    }

    fn validate(&self) -> Result<(), TradegateError> {
        if self.cost_per_trade < 0.0 {
            return Err(TradegateError::Configuration(
                "Cost per trade must be non-negative".to_string(),
            ));
        }
        if self.annualization_days == 0 {
            return Err(TradegateError::Configuration(
                "Annualization days must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(TradegateError::Configuration(
                "Decision threshold must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}
