use crate::backtest::metrics::RiskMetrics;
use crate::config::BacktestingConfig;
use crate::error::{Result, TradegateError};
use log::info;

/// Vectorized long/flat backtest: pairs signal transitions into round-trip
/// trades and scores the realized returns.
pub struct SignalBacktester {
    cost_per_trade: f64,
    annualization_days: usize,
}

impl SignalBacktester {
    pub fn new(config: &BacktestingConfig) -> Self {
        Self {
            cost_per_trade: config.cost_per_trade,
            annualization_days: config.annualization_days,
        }
    }

    pub fn with_cost(cost_per_trade: f64) -> Self {
        Self {
            cost_per_trade,
            annualization_days: 252,
        }
    }

    /// Score a time-ordered (price, signal) series. Signal 1 holds a long
    /// position, 0 stays flat; the series starts from an implicit flat
    /// position, so a signal that begins at 1 enters on the first bar.
    ///
    /// An all-zero signal is not an error: it returns the canonical empty
    /// metrics.
    pub fn run(&self, prices: &[f64], signals: &[u8]) -> Result<RiskMetrics> {
        if prices.len() != signals.len() {
            return Err(TradegateError::IndexMismatch(format!(
                "{} prices vs {} signals",
                prices.len(),
                signals.len()
            )));
        }
        if let Some(bad) = signals.iter().find(|&&s| s > 1) {
            return Err(TradegateError::Validation(format!(
                "Signals must be 0 or 1, got {}",
                bad
            )));
        }

        if signals.iter().all(|&s| s == 0) {
            return Ok(RiskMetrics::empty());
        }

        // Signal transitions against the previous value, the first sample
        // against the implicit flat start: +1 enters, -1 exits.
        let mut transitions: Vec<(usize, i8)> = Vec::new();
        let mut previous = 0u8;
        for (i, &signal) in signals.iter().enumerate() {
            let change = signal as i8 - previous as i8;
            if change != 0 {
                transitions.push((i, change));
            }
            previous = signal;
        }

        // An exit with no preceding entry carries no trade.
        if matches!(transitions.first(), Some(&(_, -1))) {
            transitions.remove(0);
        }
        // An entry that never exits is an open position, excluded from
        // realized performance.
        if matches!(transitions.last(), Some(&(_, 1))) {
            transitions.pop();
        }

        let mut entries: Vec<f64> = transitions
            .iter()
            .filter(|&&(_, change)| change == 1)
            .map(|&(i, _)| prices[i])
            .collect();
        let exits: Vec<f64> = transitions
            .iter()
            .filter(|&&(_, change)| change == -1)
            .map(|&(i, _)| prices[i])
            .collect();

        entries.truncate(exits.len());

        let returns: Vec<f64> = entries
            .iter()
            .zip(exits.iter())
            .map(|(entry, exit)| exit / entry - 1.0 - 2.0 * self.cost_per_trade)
            .collect();

        if returns.is_empty() {
            return Ok(RiskMetrics::empty());
        }

        let metrics = RiskMetrics::from_returns(returns, self.annualization_days);
        info!(
            "Backtest: {} trades, return {:.2}%, sharpe {:.2}",
            metrics.trades,
            metrics.total_return * 100.0,
            metrics.sharpe
        );

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_return_nets_both_legs() {
        let backtester = SignalBacktester::with_cost(0.001);
        let prices = [100.0, 105.0, 110.0, 108.0];
        let signals = [1, 1, 0, 0];

        let metrics = backtester.run(&prices, &signals).unwrap();

        assert_eq!(metrics.trades, 1);
        assert!((metrics.returns[0] - 0.098).abs() < 1e-12);
    }

    #[test]
    fn zero_signal_yields_empty_metrics() {
        let backtester = SignalBacktester::with_cost(0.001);
        let metrics = backtester.run(&[100.0, 101.0, 102.0], &[0, 0, 0]).unwrap();
        assert_eq!(metrics, RiskMetrics::empty());
    }

    #[test]
    fn open_position_is_excluded() {
        let backtester = SignalBacktester::with_cost(0.0);
        let prices = [100.0, 110.0, 120.0];
        let signals = [0, 1, 1];

        let metrics = backtester.run(&prices, &signals).unwrap();
        assert_eq!(metrics, RiskMetrics::empty());
    }

    #[test]
    fn first_bar_entry_is_counted() {
        let backtester = SignalBacktester::with_cost(0.0);
        let prices = [100.0, 120.0, 120.0];
        let signals = [1, 0, 0];

        let metrics = backtester.run(&prices, &signals).unwrap();
        assert_eq!(metrics.trades, 1);
        assert!((metrics.returns[0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn multiple_round_trips_pair_in_order() {
        let backtester = SignalBacktester::with_cost(0.0);
        let prices = [100.0, 105.0, 102.0, 110.0, 99.0, 99.0];
        let signals = [1, 0, 1, 0, 1, 1];

        let metrics = backtester.run(&prices, &signals).unwrap();

        // Third entry never exits and is dropped.
        assert_eq!(metrics.trades, 2);
        assert!((metrics.returns[0] - 0.05).abs() < 1e-12);
        assert!((metrics.returns[1] - (110.0 / 102.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn backtest_is_idempotent() {
        let backtester = SignalBacktester::with_cost(0.001);
        let prices = [100.0, 103.0, 99.0, 104.0, 101.0];
        let signals = [0, 1, 0, 1, 0];

        let first = backtester.run(&prices, &signals).unwrap();
        let second = backtester.run(&prices, &signals).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let backtester = SignalBacktester::with_cost(0.0);
        assert!(matches!(
            backtester.run(&[100.0, 101.0], &[1]),
            Err(TradegateError::IndexMismatch(_))
        ));
    }
}
