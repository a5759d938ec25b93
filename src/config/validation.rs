use super::traits::ConfigSection;
use crate::error::TradegateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub n_splits: usize,
    pub purge_days: usize,      // embargo shift between test end and train resume
    pub min_train_size: usize,  // folds with fewer train samples are skipped
    pub min_test_size: usize,   // folds with fewer test samples are skipped
    pub acceptance: AcceptanceCriteria,
}

/// Thresholds a walk-forward report must clear before a model is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceCriteria {
    pub min_valid_folds: usize,
    pub min_mean_sharpe: f64,
    pub min_mean_trades: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            purge_days: 5,
            min_train_size: 100,
            min_test_size: 20,
            acceptance: AcceptanceCriteria::default(),
        }
    }
}

impl Default for AcceptanceCriteria {
    fn default() -> Self {
        Self {
            min_valid_folds: 3,
            min_mean_sharpe: -0.1,
            min_mean_trades: 2.5,
        }
    }
}

impl ConfigSection for ValidationConfig {
    fn section_name() -> &'static str {
        "validation"
    }

    fn validate(&self) -> Result<(), TradegateError> {
        if self.n_splits < 2 {
            return Err(TradegateError::Configuration(
                "Cross-validation requires at least 2 splits".to_string(),
            ));
        }
        if self.min_test_size < 1 {
            return Err(TradegateError::Configuration(
                "Minimum test size must be at least 1".to_string(),
            ));
        }
        if self.acceptance.min_valid_folds > self.n_splits {
            return Err(TradegateError::Configuration(format!(
                "min_valid_folds ({}) cannot exceed n_splits ({})",
                self.acceptance.min_valid_folds, self.n_splits
            )));
        }
        Ok(())
    }
}
