use crate::config::LabelingConfig;
use crate::data::MarketData;
use crate::error::{Result, TradegateError};
use crate::indicators::atr_series;
use crate::types::Label;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// Labeled events for every eligible entry time: all rows except the last
/// `lookahead_days`, which cannot resolve inside the data.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledEvents {
    /// Entry time of each event (t0).
    pub timestamps: Vec<DateTime<Utc>>,
    /// Outcome of each event.
    pub labels: Vec<Label>,
    /// Resolution time of each event (t1), never later than t0 plus the
    /// lookahead window.
    pub end_times: Vec<DateTime<Utc>>,
}

impl LabeledEvents {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels as the integer values a model consumes.
    pub fn label_values(&self) -> Vec<i64> {
        self.labels.iter().map(|l| l.value()).collect()
    }

    pub fn distribution(&self) -> LabelDistribution {
        let mut dist = LabelDistribution::default();
        for label in &self.labels {
            match label {
                Label::Profit => dist.profit_count += 1,
                Label::Loss => dist.loss_count += 1,
                Label::Timeout => dist.timeout_count += 1,
            }
        }
        dist.total_count = self.labels.len();
        if dist.total_count > 0 {
            let total = dist.total_count as f64;
            dist.profit_share = dist.profit_count as f64 / total;
            dist.loss_share = dist.loss_count as f64 / total;
            dist.timeout_share = dist.timeout_count as f64 / total;
        }
        dist
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelDistribution {
    pub total_count: usize,
    pub profit_count: usize,
    pub loss_count: usize,
    pub timeout_count: usize,
    pub profit_share: f64,
    pub loss_share: f64,
    pub timeout_share: f64,
}

/// Converts a price series into {+1, 0, −1} outcome labels with an upper
/// (profit), lower (loss) and time barrier. Barrier widths scale with the
/// ATR at entry, so labels adapt to the prevailing volatility.
pub struct TripleBarrierLabeler {
    config: LabelingConfig,
}

impl TripleBarrierLabeler {
    pub fn new(config: LabelingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabelingConfig {
        &self.config
    }

    /// Label every eligible entry in `market`.
    ///
    /// Requires at least twice the lookahead window of data. Each event ends
    /// at the earliest barrier touch strictly after entry, or at the window
    /// end when no barrier is touched within `lookahead_days` bars.
    pub fn label(&self, market: &MarketData) -> Result<LabeledEvents> {
        let lookahead = self.config.lookahead_days;
        let n = market.len();

        if n < 2 * lookahead {
            return Err(TradegateError::InsufficientData(format!(
                "Triple-barrier labeling needs at least {} rows, got {}",
                2 * lookahead,
                n
            )));
        }

        let close = market.close_values()?;
        let timestamps = market.timestamps()?;
        let volatility = atr_series(market, self.config.atr_period)?;

        let eligible = n - lookahead;
        let mut labels = Vec::with_capacity(eligible);
        let mut end_times = Vec::with_capacity(eligible);

        for i in 0..eligible {
            let upper = close[i] + self.config.profit_take_mult * volatility[i];
            let lower = close[i] - self.config.stop_loss_mult * volatility[i];

            let end_pos = Self::event_end_position(&close, i, upper, lower, lookahead);

            // Re-scan the closed interval [t0, t1]. This repeats the forward
            // scan except at same-bar ties, where the upper barrier wins.
            let event_prices = &close[i..=end_pos];
            let label = if event_prices.iter().any(|&p| p >= upper) {
                Label::Profit
            } else if event_prices.iter().any(|&p| p <= lower) {
                Label::Loss
            } else {
                Label::Timeout
            };

            labels.push(label);
            end_times.push(timestamps[end_pos]);
        }

        let events = LabeledEvents {
            timestamps: timestamps[..eligible].to_vec(),
            labels,
            end_times,
        };

        let dist = events.distribution();
        info!(
            "Labeled {} events: {:.1}% profit, {:.1}% loss, {:.1}% timeout",
            dist.total_count,
            dist.profit_share * 100.0,
            dist.loss_share * 100.0,
            dist.timeout_share * 100.0
        );

        Ok(events)
    }

    /// Position of the first barrier touch in the `lookahead` bars strictly
    /// after `entry`, or the window end when neither barrier is touched.
    fn event_end_position(
        close: &[f64],
        entry: usize,
        upper: f64,
        lower: f64,
        lookahead: usize,
    ) -> usize {
        let window_end = (entry + lookahead).min(close.len() - 1);

        let mut upper_touch = None;
        let mut lower_touch = None;
        for pos in entry + 1..=window_end {
            if upper_touch.is_none() && close[pos] >= upper {
                upper_touch = Some(pos);
            }
            if lower_touch.is_none() && close[pos] <= lower {
                lower_touch = Some(pos);
            }
            if upper_touch.is_some() && lower_touch.is_some() {
                break;
            }
        }

        match (upper_touch, lower_touch) {
            (Some(u), Some(l)) => u.min(l),
            (Some(u), None) => u,
            (None, Some(l)) => l,
            (None, None) => window_end,
        }
    }
}
