pub mod volatility;

pub use volatility::atr_series;
