pub mod engine;
pub mod metrics;

pub use engine::SignalBacktester;
pub use metrics::RiskMetrics;
