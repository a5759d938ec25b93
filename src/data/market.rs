use crate::error::{Result, TradegateError};
use chrono::{DateTime, Utc};
use polars::prelude::*;

/// Canonical OHLCV column names.
pub const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Immutable OHLCV series, validated once at construction and borrowed by
/// every core component afterwards.
#[derive(Debug, Clone)]
pub struct MarketData {
    data: DataFrame,
}

impl MarketData {
    /// Wrap a frame with `timestamp` (datetime), `open`, `high`, `low`,
    /// `close`, `volume` (f64) columns. Timestamps must be strictly
    /// increasing and closes positive.
    pub fn new(data: DataFrame) -> Result<Self> {
        for name in REQUIRED_COLUMNS {
            if data.column(name).is_err() {
                return Err(TradegateError::Validation(format!(
                    "Market data is missing required column '{}'",
                    name
                )));
            }
        }

        let market = Self { data };

        let timestamps = market.timestamps()?;
        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TradegateError::Validation(
                    "Timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        let close = market.close()?;
        for i in 0..close.len() {
            match close.get(i) {
                Some(price) if price > 0.0 => {}
                _ => {
                    return Err(TradegateError::Validation(format!(
                        "Close price at row {} is missing or non-positive",
                        i
                    )))
                }
            }
        }

        Ok(market)
    }

    /// Build the frame from plain bar vectors. Used by callers that load
    /// data elsewhere and by tests.
    pub fn from_bars(
        timestamps: &[DateTime<Utc>],
        open: &[f64],
        high: &[f64],
        low: &[f64],
        close: &[f64],
        volume: &[f64],
    ) -> Result<Self> {
        let millis: Vec<i64> = timestamps.iter().map(|t| t.timestamp_millis()).collect();
        let ts = Series::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

        let data = DataFrame::new(vec![
            ts.into(),
            Series::new("open".into(), open).into(),
            Series::new("high".into(), high).into(),
            Series::new("low".into(), low).into(),
            Series::new("close".into(), close).into(),
            Series::new("volume".into(), volume).into(),
        ])?;

        Self::new(data)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    pub fn open(&self) -> Result<&Float64Chunked> {
        Ok(self.data.column("open")?.f64()?)
    }

    pub fn high(&self) -> Result<&Float64Chunked> {
        Ok(self.data.column("high")?.f64()?)
    }

    pub fn low(&self) -> Result<&Float64Chunked> {
        Ok(self.data.column("low")?.f64()?)
    }

    pub fn close(&self) -> Result<&Float64Chunked> {
        Ok(self.data.column("close")?.f64()?)
    }

    pub fn volume(&self) -> Result<&Float64Chunked> {
        Ok(self.data.column("volume")?.f64()?)
    }

    /// Close prices as a plain vector.
    pub fn close_values(&self) -> Result<Vec<f64>> {
        let close = self.close()?;
        (0..close.len())
            .map(|i| {
                close.get(i).ok_or_else(|| {
                    TradegateError::Validation(format!("Missing close price at row {}", i))
                })
            })
            .collect()
    }

    /// All timestamps converted to `DateTime<Utc>`.
    pub fn timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        let series = self.data.column("timestamp")?.datetime()?;
        (0..series.len())
            .map(|i| get_datetime_at_index(series, i))
            .collect()
    }

    pub fn timestamp_at(&self, idx: usize) -> Result<DateTime<Utc>> {
        let series = self.data.column("timestamp")?.datetime()?;
        get_datetime_at_index(series, idx)
    }
}

pub fn get_datetime_at_index(series: &DatetimeChunked, idx: usize) -> Result<DateTime<Utc>> {
    let timestamp_ms = series.phys.get(idx).ok_or_else(|| {
        TradegateError::Validation(format!("Cannot get timestamp at index {}", idx))
    })?;

    let timestamp_s = timestamp_ms / 1000;
    let datetime = DateTime::<Utc>::from_timestamp(timestamp_s, 0).ok_or_else(|| {
        TradegateError::Validation(format!("Invalid timestamp: {}", timestamp_ms))
    })?;

    Ok(datetime)
}
