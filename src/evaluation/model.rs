use crate::error::{Result, TradegateError};
use polars::prelude::*;

/// A pluggable classifier. Any model exposing fit and positive-class
/// probability prediction can be walked forward; concrete implementations
/// (gradient-boosted trees, linear models, external bindings) live outside
/// this crate.
pub trait SignalModel: Send {
    /// Train on a feature matrix and its aligned labels in {-1, 0, 1}.
    fn fit(&mut self, features: &DataFrame, labels: &[i64]) -> Result<()>;

    /// Per-row probability of the positive (+1) class.
    fn predict_probability(&self, features: &DataFrame) -> Result<Vec<f64>>;
}

/// Baseline model predicting the training frequency of the positive class
/// for every row. Useful as a sanity floor and in tests; a real model must
/// beat it to justify deployment.
#[derive(Debug, Default)]
pub struct ClassPriorModel {
    prior: Option<f64>,
}

impl ClassPriorModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalModel for ClassPriorModel {
    fn fit(&mut self, _features: &DataFrame, labels: &[i64]) -> Result<()> {
        if labels.is_empty() {
            return Err(TradegateError::Model(
                "Cannot fit on an empty label set".to_string(),
            ));
        }
        let positives = labels.iter().filter(|&&l| l == 1).count();
        self.prior = Some(positives as f64 / labels.len() as f64);
        Ok(())
    }

    fn predict_probability(&self, features: &DataFrame) -> Result<Vec<f64>> {
        let prior = self.prior.ok_or_else(|| {
            TradegateError::Model("Model not trained yet".to_string())
        })?;
        Ok(vec![prior; features.height()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn prior_matches_positive_share() {
        let features = df! { "x" => &[1.0, 2.0, 3.0, 4.0] }.unwrap();
        let mut model = ClassPriorModel::new();
        model.fit(&features, &[1, -1, 0, 1]).unwrap();

        let probas = model.predict_probability(&features).unwrap();
        assert_eq!(probas, vec![0.5; 4]);
    }

    #[test]
    fn predict_before_fit_fails() {
        let features = df! { "x" => &[1.0] }.unwrap();
        let model = ClassPriorModel::new();
        assert!(model.predict_probability(&features).is_err());
    }

    #[test]
    fn fit_on_empty_labels_fails() {
        let features = df! { "x" => &[1.0] }.unwrap();
        let mut model = ClassPriorModel::new();
        assert!(model.fit(&features, &[]).is_err());
    }
}
