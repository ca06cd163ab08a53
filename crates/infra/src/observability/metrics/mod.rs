//! Metrics collection

pub mod sync;

pub use sync::{SyncMetrics, SyncMetricsSnapshot};
