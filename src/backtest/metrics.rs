use serde::{Deserialize, Serialize};

/// Snapshot of a strategy's realized performance. Recomputed fresh on every
/// backtest; degenerate samples produce sentinel values (0 or +∞), never
/// errors, so aggregation downstream cannot crash on one-sided results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_return: f64,
    pub trades: usize,
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub payoff_ratio: f64,
    /// Cumulative equity, starting at 1.0 (length = trades + 1).
    pub equity_curve: Vec<f64>,
    /// Decline from the running equity peak at each step (≤ 0).
    pub drawdown_series: Vec<f64>,
    /// Realized per-trade returns, net of costs.
    pub returns: Vec<f64>,
}

impl RiskMetrics {
    /// The canonical result for a run with no realized trades.
    pub fn empty() -> Self {
        Self {
            total_return: 0.0,
            trades: 0,
            sharpe: 0.0,
            sortino: 0.0,
            max_drawdown: 0.0,
            win_rate: 0.0,
            profit_factor: 0.0,
            payoff_ratio: 0.0,
            equity_curve: Vec::new(),
            drawdown_series: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// Build the full snapshot from a realized return sequence.
    pub fn from_returns(returns: Vec<f64>, annualization_days: usize) -> Self {
        if returns.is_empty() {
            return Self::empty();
        }

        let equity = equity_curve(&returns);
        let drawdowns = drawdown_series(&equity);
        let max_drawdown = drawdowns.iter().copied().fold(0.0_f64, f64::min);

        let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        };

        let avg_win = if wins.is_empty() {
            0.0
        } else {
            gross_profit / wins.len() as f64
        };
        let avg_loss = if losses.is_empty() {
            0.0
        } else {
            gross_loss / losses.len() as f64
        };
        let payoff_ratio = if avg_loss > 0.0 {
            avg_win / avg_loss
        } else {
            f64::INFINITY
        };

        Self {
            total_return: equity[equity.len() - 1] - 1.0,
            trades: returns.len(),
            sharpe: sharpe_ratio(&returns, annualization_days),
            sortino: sortino_ratio(&returns, annualization_days),
            max_drawdown,
            win_rate: wins.len() as f64 / returns.len() as f64,
            profit_factor,
            payoff_ratio,
            equity_curve: equity,
            drawdown_series: drawdowns,
            returns,
        }
    }
}

/// Cumulative product of (1 + return), with the starting capital of 1.0
/// prepended.
pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    curve.push(1.0);
    let mut equity = 1.0;
    for r in returns {
        equity *= 1.0 + r;
        curve.push(equity);
    }
    curve
}

/// Fractional decline from the running peak at each equity step.
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            (value - peak) / peak
        })
        .collect()
}

/// Annualized Sharpe ratio. Zero for fewer than 2 returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], annualization_days: usize) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std == 0.0 {
        return 0.0;
    }
    mean(returns) / std * (annualization_days as f64).sqrt()
}

/// Annualized Sortino ratio, penalizing only downside deviation.
///
/// With fewer than 2 negative returns, or zero downside deviation, there is
/// no downside risk to measure: the result is +∞ for a positive mean return
/// and 0 otherwise.
pub fn sortino_ratio(returns: &[f64], annualization_days: usize) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let negatives: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if negatives.len() < 2 {
        return if mean(returns) > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
    }

    let downside_std = std_dev(&negatives);
    if downside_std == 0.0 {
        return if mean(returns) > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
    }

    mean(returns) / downside_std * (annualization_days as f64).sqrt()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equity_and_drawdown_fixture() {
        let returns = vec![0.05, -0.02];
        let equity = equity_curve(&returns);

        assert_eq!(equity.len(), 3);
        assert!((equity[0] - 1.0).abs() < 1e-12);
        assert!((equity[1] - 1.05).abs() < 1e-12);
        assert!((equity[2] - 1.029).abs() < 1e-12);

        let drawdowns = drawdown_series(&equity);
        assert_eq!(drawdowns[0], 0.0);
        assert_eq!(drawdowns[1], 0.0);
        assert!((drawdowns[2] - (1.029 - 1.05) / 1.05).abs() < 1e-12);
    }

    #[test]
    fn sharpe_degenerate_cases_are_zero() {
        assert_eq!(sharpe_ratio(&[0.01], 252), 0.0);
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01], 252), 0.0);
    }

    #[test]
    fn sortino_without_losses_is_infinite() {
        assert_eq!(sortino_ratio(&[0.01, 0.02, 0.03], 252), f64::INFINITY);
    }

    #[test]
    fn sortino_with_non_positive_mean_is_zero() {
        assert_eq!(sortino_ratio(&[-0.01, 0.01], 252), 0.0);
        assert_eq!(sortino_ratio(&[0.0, 0.0, 0.0], 252), 0.0);
    }

    #[test]
    fn sortino_with_downside_is_finite() {
        let returns = vec![0.05, -0.02, 0.03, -0.04];
        let sortino = sortino_ratio(&returns, 252);
        assert!(sortino.is_finite());
        assert!(sortino > 0.0);
    }

    #[test]
    fn from_returns_fills_every_field() {
        let metrics = RiskMetrics::from_returns(vec![0.05, -0.02], 252);

        assert_eq!(metrics.trades, 2);
        assert!((metrics.total_return - 0.029).abs() < 1e-12);
        assert!((metrics.win_rate - 0.5).abs() < 1e-12);
        assert!((metrics.profit_factor - 2.5).abs() < 1e-12);
        assert!((metrics.payoff_ratio - 2.5).abs() < 1e-12);
        assert!((metrics.max_drawdown - (1.029 - 1.05) / 1.05).abs() < 1e-12);
    }

    #[test]
    fn one_sided_wins_hit_sentinels() {
        let metrics = RiskMetrics::from_returns(vec![0.01, 0.02], 252);
        assert_eq!(metrics.profit_factor, f64::INFINITY);
        assert_eq!(metrics.payoff_ratio, f64::INFINITY);
        assert_eq!(metrics.win_rate, 1.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }
}
