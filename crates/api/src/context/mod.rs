//! Application context - dependency injection container

use std::sync::Arc;

use careline_core::{AppointmentService, CalendarSyncOrchestrator, NameResolver};
use careline_domain::{CarelineError, Config, Result};
use careline_infra::{
    build_calendar_adapter, CalendarSyncWorker, CalendarSyncWorkerConfig, DbManager,
    SqliteAppointmentStore, SqlitePartyDirectory, SyncMetrics,
};
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub appointments: Arc<AppointmentService>,
    pub directory: Arc<SqlitePartyDirectory>,
    pub sync_worker: Arc<CalendarSyncWorker>,
    pub sync_metrics: Arc<SyncMetrics>,
}

impl AppContext {
    /// Wire the store, calendar adapter, sync worker and lifecycle service.
    ///
    /// Must be called from within a Tokio runtime; the sync worker binds to
    /// it.
    ///
    /// # Errors
    /// Fails when the database cannot be opened or migrated, the calendar
    /// gateway settings are invalid, or no runtime is available.
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        let store = Arc::new(SqliteAppointmentStore::new(Arc::clone(&db)));
        let directory = Arc::new(SqlitePartyDirectory::new(Arc::clone(&db)));

        let calendar = build_calendar_adapter(&config.calendar)?;
        let orchestrator = CalendarSyncOrchestrator::new(
            store.clone(),
            calendar,
            NameResolver::new(directory.clone()),
        )
        .with_adapter_timeout(config.sync.adapter_timeout());

        let sync_metrics = Arc::new(SyncMetrics::new());
        let sync_worker = Arc::new(CalendarSyncWorker::new(
            Arc::new(orchestrator),
            CalendarSyncWorkerConfig::from(&config.sync),
            Arc::clone(&sync_metrics),
        )?);

        let appointments = Arc::new(AppointmentService::new(store, sync_worker.clone()));

        info!(
            db_path = %db.path().display(),
            calendar_enabled = config.calendar.enabled,
            "application context initialised"
        );

        Ok(Self { config, db, appointments, directory, sync_worker, sync_metrics })
    }

    /// Check all components and calculate an overall health score.
    pub async fn health_check(&self) -> HealthStatus {
        let mut status = HealthStatus::new().add_component(self.check_database_health().await);

        status = status.add_component(if self.config.calendar.enabled {
            ComponentHealth::healthy_with("calendar", "gateway")
        } else {
            ComponentHealth::healthy_with("calendar", "disabled")
        });

        let pending = self.sync_worker.pending();
        status = status.add_component(ComponentHealth::healthy_with(
            "sync_worker",
            format!("{pending} pending, {} lanes", self.sync_worker.active_lanes()),
        ));

        status.calculate_score();
        status
    }

    /// Run `SELECT 1` off the async runtime.
    async fn check_database_health(&self) -> ComponentHealth {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || db.health_check())
            .await
            .map_err(|err| CarelineError::Internal(format!("health check task failed: {err}")))
            .and_then(|inner| inner);

        match result {
            Ok(()) => ComponentHealth::healthy("database"),
            Err(err) => {
                warn!(error = %err, "database health check failed");
                ComponentHealth::unhealthy("database", err.to_string())
            }
        }
    }

    /// Stop the sync worker, giving queued jobs one job timeout to finish.
    ///
    /// Returns `true` when every queued job completed.
    pub async fn shutdown(&self) -> bool {
        info!(pending = self.sync_worker.pending(), "shutdown called on AppContext");
        let drained = self.sync_worker.shutdown(self.config.sync.job_timeout()).await;

        let snapshot = self.sync_metrics.snapshot();
        info!(
            dispatched = snapshot.dispatched,
            failed = snapshot.failed,
            timed_out = snapshot.timed_out,
            drained,
            "calendar sync totals at shutdown"
        );
        drained
    }
}
