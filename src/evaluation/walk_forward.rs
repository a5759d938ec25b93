use crate::backtest::{RiskMetrics, SignalBacktester};
use crate::config::{AcceptanceCriteria, BacktestingConfig, ValidationConfig};
use crate::error::{Result, TradegateError};
use crate::evaluation::model::SignalModel;
use crate::validation::{DataSplitter, FoldSplit, PurgedKFold};
use chrono::{DateTime, Utc};
use log::{info, warn};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Everything a walk-forward run consumes, borrowed from the caller and
/// sharing one timestamp domain: features row i, label i, price i and event
/// end time i all describe the sample entered at `index[i]`.
#[derive(Clone, Copy)]
pub struct EvaluationData<'a> {
    pub features: &'a DataFrame,
    pub labels: &'a [i64],
    pub prices: &'a [f64],
    pub index: &'a [DateTime<Utc>],
    pub end_times: &'a [DateTime<Utc>],
}

impl<'a> EvaluationData<'a> {
    pub fn new(
        features: &'a DataFrame,
        labels: &'a [i64],
        prices: &'a [f64],
        index: &'a [DateTime<Utc>],
        end_times: &'a [DateTime<Utc>],
    ) -> Result<Self> {
        let n = features.height();
        if labels.len() != n || prices.len() != n || index.len() != n || end_times.len() != n {
            return Err(TradegateError::IndexMismatch(format!(
                "features={}, labels={}, prices={}, index={}, end_times={}",
                n,
                labels.len(),
                prices.len(),
                index.len(),
                end_times.len()
            )));
        }
        Ok(Self {
            features,
            labels,
            prices,
            index,
            end_times,
        })
    }
}

/// Out-of-sample result of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldOutcome {
    pub fold_num: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub metrics: RiskMetrics,
}

/// Aggregate verdict over all folds. `valid_folds == 0` is the "no valid
/// folds" state, distinct from valid folds that merely scored zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub folds: Vec<FoldOutcome>,
    pub requested_folds: usize,
    pub valid_folds: usize,
    pub mean_sharpe: f64,
    pub mean_trades: f64,
    pub mean_return: f64,
}

impl WalkForwardReport {
    /// Aggregate a set of completed fold outcomes. A partial set is legal
    /// input: a caller that abandons remaining folds (timeout, budget) can
    /// still aggregate what finished, and the report shows fewer valid
    /// folds.
    pub fn from_outcomes(outcomes: Vec<FoldOutcome>, requested_folds: usize) -> Self {
        let valid_folds = outcomes.len();
        let (mean_sharpe, mean_trades, mean_return) = if valid_folds == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let n = valid_folds as f64;
            (
                outcomes.iter().map(|f| f.metrics.sharpe).sum::<f64>() / n,
                outcomes.iter().map(|f| f.metrics.trades as f64).sum::<f64>() / n,
                outcomes.iter().map(|f| f.metrics.total_return).sum::<f64>() / n,
            )
        };

        Self {
            folds: outcomes,
            requested_folds,
            valid_folds,
            mean_sharpe,
            mean_trades,
            mean_return,
        }
    }

    pub fn has_valid_folds(&self) -> bool {
        self.valid_folds > 0
    }

    /// Whether the report clears the acceptance gate used to decide if a
    /// trained model may be persisted.
    pub fn passes(&self, criteria: &AcceptanceCriteria) -> bool {
        self.valid_folds >= criteria.min_valid_folds
            && self.mean_sharpe > criteria.min_mean_sharpe
            && self.mean_trades >= criteria.min_mean_trades
    }
}

/// Orchestrates purged splitting, per-fold model training and backtesting
/// into one out-of-sample performance estimate.
pub struct WalkForwardEvaluator {
    validation: ValidationConfig,
    backtesting: BacktestingConfig,
}

impl WalkForwardEvaluator {
    pub fn new(validation: ValidationConfig, backtesting: BacktestingConfig) -> Self {
        Self {
            validation,
            backtesting,
        }
    }

    /// Walk the folds, training a fresh model per fold and scoring its test
    /// signals. Folds below the configured train/test sizes are skipped, as
    /// are folds whose model fails to fit; a single bad fold never aborts
    /// the run.
    pub fn evaluate<F>(&self, data: &EvaluationData<'_>, model_factory: F) -> Result<WalkForwardReport>
    where
        F: Fn() -> Box<dyn SignalModel> + Sync,
    {
        let folds = self.split(data)?;
        let requested = folds.len();

        let mut outcomes: Vec<FoldOutcome> = folds
            .par_iter()
            .map(|fold| {
                self.evaluate_fold(
                    data,
                    fold,
                    &model_factory,
                    self.validation.min_train_size,
                    self.validation.min_test_size,
                )
            })
            .collect::<Result<Vec<Option<FoldOutcome>>>>()?
            .into_iter()
            .flatten()
            .collect();

        // Fold evaluation may complete in any order; aggregation is
        // order-independent but the report is kept chronological.
        outcomes.sort_by_key(|outcome| outcome.fold_num);

        let report = WalkForwardReport::from_outcomes(outcomes, requested);
        info!(
            "Walk-forward: {}/{} valid folds, mean sharpe {:.3}, mean trades {:.1}",
            report.valid_folds, report.requested_folds, report.mean_sharpe, report.mean_trades
        );
        Ok(report)
    }

    /// The authoritative out-of-sample view: every fold's realized trade
    /// returns, concatenated in chronological order into one continuous
    /// equity/drawdown curve. Uses the configured (already calibrated)
    /// decision threshold; only empty test folds are skipped.
    pub fn oos_performance<F>(&self, data: &EvaluationData<'_>, model_factory: F) -> Result<RiskMetrics>
    where
        F: Fn() -> Box<dyn SignalModel> + Sync,
    {
        let folds = self.split(data)?;

        let mut outcomes: Vec<FoldOutcome> = folds
            .par_iter()
            .map(|fold| self.evaluate_fold(data, fold, &model_factory, 1, 1))
            .collect::<Result<Vec<Option<FoldOutcome>>>>()?
            .into_iter()
            .flatten()
            .collect();

        outcomes.sort_by_key(|outcome| outcome.fold_num);

        let all_returns: Vec<f64> = outcomes
            .into_iter()
            .flat_map(|outcome| outcome.metrics.returns)
            .collect();

        if all_returns.is_empty() {
            return Ok(RiskMetrics::empty());
        }

        Ok(RiskMetrics::from_returns(
            all_returns,
            self.backtesting.annualization_days,
        ))
    }

    /// Calibrate the decision threshold on purged validation folds: sweep
    /// candidate thresholds and keep, per fold, the one maximizing the F1
    /// score of the positive class; the calibrated value is their mean.
    /// Falls back to 0.5 when no fold can be used.
    pub fn calibrate_threshold<F>(&self, data: &EvaluationData<'_>, model_factory: F) -> Result<f64>
    where
        F: Fn() -> Box<dyn SignalModel> + Sync,
    {
        let folds = self.split(data)?;

        let thresholds: Vec<f64> = folds
            .par_iter()
            .map(|fold| self.best_fold_threshold(data, fold, &model_factory))
            .collect::<Result<Vec<Option<f64>>>>()?
            .into_iter()
            .flatten()
            .collect();

        if thresholds.is_empty() {
            return Ok(0.5);
        }
        Ok(thresholds.iter().sum::<f64>() / thresholds.len() as f64)
    }

    fn split(&self, data: &EvaluationData<'_>) -> Result<Vec<FoldSplit>> {
        let splitter = PurgedKFold::new(self.validation.n_splits, self.validation.purge_days);
        splitter.split(data.index, data.end_times)
    }

    /// Train and score one fold. `Ok(None)` means the fold was skipped:
    /// undersized, or its model failed to fit.
    fn evaluate_fold<F>(
        &self,
        data: &EvaluationData<'_>,
        fold: &FoldSplit,
        model_factory: &F,
        min_train: usize,
        min_test: usize,
    ) -> Result<Option<FoldOutcome>>
    where
        F: Fn() -> Box<dyn SignalModel> + Sync,
    {
        if fold.train.len() < min_train || fold.test.len() < min_test {
            info!(
                "Fold {}: skipped (train={}, test={})",
                fold.fold_num,
                fold.train.len(),
                fold.test.len()
            );
            return Ok(None);
        }

        let signals = match self.fold_signals(data, fold, model_factory) {
            Ok(signals) => signals,
            Err(e) => {
                warn!("Fold {}: model failed, fold skipped: {}", fold.fold_num, e);
                return Ok(None);
            }
        };

        let test_prices: Vec<f64> = fold.test.iter().map(|&i| data.prices[i]).collect();
        let backtester = SignalBacktester::new(&self.backtesting);
        let metrics = backtester.run(&test_prices, &signals)?;

        info!(
            "Fold {}: train={}, test={}, trades={}, sharpe={:.3}",
            fold.fold_num,
            fold.train.len(),
            fold.test.len(),
            metrics.trades,
            metrics.sharpe
        );

        Ok(Some(FoldOutcome {
            fold_num: fold.fold_num,
            train_size: fold.train.len(),
            test_size: fold.test.len(),
            metrics,
        }))
    }

    /// Fit a fresh model on the fold's training rows and turn its test-set
    /// probabilities into long/flat signals.
    fn fold_signals<F>(
        &self,
        data: &EvaluationData<'_>,
        fold: &FoldSplit,
        model_factory: &F,
    ) -> Result<Vec<u8>>
    where
        F: Fn() -> Box<dyn SignalModel> + Sync,
    {
        let train_features = take_rows(data.features, &fold.train)?;
        let train_labels: Vec<i64> = fold.train.iter().map(|&i| data.labels[i]).collect();

        let mut model = model_factory();
        model.fit(&train_features, &train_labels)?;

        let test_features = take_rows(data.features, &fold.test)?;
        let probabilities = model.predict_probability(&test_features)?;
        if probabilities.len() != fold.test.len() {
            return Err(TradegateError::Model(format!(
                "Model returned {} probabilities for {} test rows",
                probabilities.len(),
                fold.test.len()
            )));
        }

        Ok(probabilities
            .iter()
            .map(|&p| u8::from(p >= self.backtesting.decision_threshold))
            .collect())
    }

    /// The threshold maximizing positive-class F1 on this fold's test rows,
    /// or `None` when the fold cannot be used.
    fn best_fold_threshold<F>(
        &self,
        data: &EvaluationData<'_>,
        fold: &FoldSplit,
        model_factory: &F,
    ) -> Result<Option<f64>>
    where
        F: Fn() -> Box<dyn SignalModel> + Sync,
    {
        if fold.train.is_empty() || fold.test.is_empty() {
            return Ok(None);
        }

        let train_features = take_rows(data.features, &fold.train)?;
        let train_labels: Vec<i64> = fold.train.iter().map(|&i| data.labels[i]).collect();

        let mut model = model_factory();
        if let Err(e) = model.fit(&train_features, &train_labels) {
            warn!(
                "Fold {}: model failed during calibration: {}",
                fold.fold_num, e
            );
            return Ok(None);
        }

        let test_features = take_rows(data.features, &fold.test)?;
        let probabilities = model.predict_probability(&test_features)?;
        let actual_positive: Vec<bool> =
            fold.test.iter().map(|&i| data.labels[i] == 1).collect();

        let mut best_f1 = 0.0;
        let mut best_threshold = 0.5;
        for step in 0..40 {
            let candidate = 0.20 + step as f64 * 0.01;
            let predicted: Vec<bool> = probabilities.iter().map(|&p| p > candidate).collect();
            let f1 = f1_score(&actual_positive, &predicted);
            if f1 > best_f1 {
                best_f1 = f1;
                best_threshold = candidate;
            }
        }

        Ok(Some(best_threshold))
    }
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let indices: IdxCa = IdxCa::from_vec(
        "rows".into(),
        rows.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&indices)?)
}

/// Binary F1 score with zero-division mapped to 0.
fn f1_score(actual: &[bool], predicted: &[bool]) -> f64 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&a, &p) in actual.iter().zip(predicted.iter()) {
        match (a, p) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    if tp + fp == 0 || tp + fn_ == 0 {
        return 0.0;
    }
    let precision = tp as f64 / (tp + fp) as f64;
    let recall = tp as f64 / (tp + fn_) as f64;
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f1_score_basics() {
        let actual = [true, true, false, false];
        assert_eq!(f1_score(&actual, &[true, true, false, false]), 1.0);
        assert_eq!(f1_score(&actual, &[false, false, false, false]), 0.0);

        // One of two positives found, no false positives: p=1, r=0.5.
        let f1 = f1_score(&actual, &[true, false, false, false]);
        assert!((f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn report_aggregates_means() {
        let outcome = |fold_num: usize, sharpe: f64, trades: usize| FoldOutcome {
            fold_num,
            train_size: 100,
            test_size: 20,
            metrics: RiskMetrics {
                sharpe,
                trades,
                ..RiskMetrics::empty()
            },
        };

        let report = WalkForwardReport::from_outcomes(
            vec![outcome(0, 1.0, 4), outcome(1, 2.0, 6)],
            5,
        );

        assert_eq!(report.valid_folds, 2);
        assert_eq!(report.requested_folds, 5);
        assert!((report.mean_sharpe - 1.5).abs() < 1e-12);
        assert!((report.mean_trades - 5.0).abs() < 1e-12);
    }

    #[test]
    fn empty_report_is_distinct_from_zero_performance() {
        let report = WalkForwardReport::from_outcomes(Vec::new(), 5);
        assert!(!report.has_valid_folds());
        assert_eq!(report.mean_sharpe, 0.0);
        assert!(!report.passes(&AcceptanceCriteria::default()));
    }

    #[test]
    fn acceptance_gate_boundaries() {
        let criteria = AcceptanceCriteria {
            min_valid_folds: 3,
            min_mean_sharpe: -0.1,
            min_mean_trades: 2.5,
        };

        let report = |valid_folds: usize, mean_sharpe: f64, mean_trades: f64| WalkForwardReport {
            folds: Vec::new(),
            requested_folds: 5,
            valid_folds,
            mean_sharpe,
            mean_trades,
            mean_return: 0.0,
        };

        assert!(report(3, 0.0, 2.5).passes(&criteria));
        assert!(!report(2, 0.0, 2.5).passes(&criteria));
        assert!(!report(3, -0.1, 2.5).passes(&criteria));
        assert!(!report(3, 0.0, 2.4).passes(&criteria));
    }
}
