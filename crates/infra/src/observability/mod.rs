//! Observability: tracing initialisation and sync metrics
//!
//! Metrics are in-process atomic counters. Record methods never fail; the
//! fallible surface is limited to derived values (percentiles over an empty
//! sample set).

pub mod metrics;

use careline_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

pub use metrics::{SyncMetrics, SyncMetricsSnapshot};

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "P95", "P50")
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.filter`. Returns `false` when a subscriber
/// was already installed (tests, embedding binaries).
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(json = config.json, "tracing initialised");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_is_reported_not_fatal() {
        let config = LoggingConfig { filter: "careline=debug".into(), json: false };

        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
