//! Health check command for monitoring

use careline_infra::SyncMetricsSnapshot;
use serde::Serialize;

use crate::context::AppContext;
use crate::utils::health::HealthStatus;

/// Component health plus calendar sync counters
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    #[serde(flatten)]
    pub status: HealthStatus,
    pub sync: SyncMetricsSnapshot,
}

/// Get service health
///
/// # Example Response
/// ```json
/// {
///   "is_healthy": true,
///   "score": 1.0,
///   "message": null,
///   "components": [
///     { "name": "database", "is_healthy": true, "message": null },
///     { "name": "calendar", "is_healthy": true, "message": "disabled" },
///     { "name": "sync_worker", "is_healthy": true, "message": "0 pending, 0 lanes" }
///   ],
///   "timestamp": 1705309200,
///   "sync": { "dispatched": 0, "created": 0, "failed": 0, "...": 0 }
/// }
/// ```
pub async fn get_health(ctx: &AppContext) -> HealthReport {
    HealthReport { status: ctx.health_check().await, sync: ctx.sync_metrics.snapshot() }
}
