//! Calendar sync worker
//!
//! Runs [`SyncJob`]s dispatched by the appointment service on detached
//! tasks. Jobs for the same appointment go through one lane (an unbounded
//! channel drained by a single task), so they execute in dispatch order;
//! different appointments run concurrently. Lanes are created on demand and
//! retire after `lane_idle` without work.
//!
//! Every job is bounded by `job_timeout`. Outcomes are recorded in
//! [`SyncMetrics`]; failures never reach the caller that dispatched them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use careline_core::CalendarSyncOrchestrator;
//! use careline_infra::observability::SyncMetrics;
//! use careline_infra::sync::{CalendarSyncWorker, CalendarSyncWorkerConfig};
//!
//! # async fn example(orchestrator: CalendarSyncOrchestrator) -> careline_domain::Result<()> {
//! let worker = Arc::new(CalendarSyncWorker::new(
//!     Arc::new(orchestrator),
//!     CalendarSyncWorkerConfig::default(),
//!     Arc::new(SyncMetrics::new()),
//! )?);
//! // ... hand `worker` to AppointmentService as its SyncDispatcher ...
//! worker.shutdown(Duration::from_secs(5)).await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use careline_core::{CalendarSyncOrchestrator, SyncDispatcher};
use careline_domain::constants::{DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_LANE_IDLE_SECS};
use careline_domain::{CarelineError, Result, SyncConfig, SyncJob};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::observability::SyncMetrics;

/// Configuration for the calendar sync worker.
#[derive(Debug, Clone)]
pub struct CalendarSyncWorkerConfig {
    /// Upper bound for one job, all adapter calls included
    pub job_timeout: Duration,
    /// Idle time after which a lane task exits
    pub lane_idle: Duration,
}

impl Default for CalendarSyncWorkerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
            lane_idle: Duration::from_secs(DEFAULT_LANE_IDLE_SECS),
        }
    }
}

impl From<&SyncConfig> for CalendarSyncWorkerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self { job_timeout: config.job_timeout(), lane_idle: config.lane_idle() }
    }
}

/// Sender side of a lane, tagged so a retiring task only removes itself.
struct Lane {
    generation: u64,
    sender: mpsc::UnboundedSender<SyncJob>,
}

struct Shared {
    orchestrator: Arc<CalendarSyncOrchestrator>,
    config: CalendarSyncWorkerConfig,
    metrics: Arc<SyncMetrics>,
    lanes: Mutex<HashMap<Uuid, Lane>>,
    next_generation: AtomicU64,
    pending: AtomicUsize,
    idle: Notify,
    closed: AtomicBool,
    cancellation: CancellationToken,
}

impl Shared {
    fn job_finished(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Detached, per-appointment-ordered executor for calendar sync jobs.
pub struct CalendarSyncWorker {
    shared: Arc<Shared>,
    tracker: TaskTracker,
    runtime: Handle,
}

impl CalendarSyncWorker {
    /// Create a worker bound to the current Tokio runtime.
    pub fn new(
        orchestrator: Arc<CalendarSyncOrchestrator>,
        config: CalendarSyncWorkerConfig,
        metrics: Arc<SyncMetrics>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| {
            CarelineError::Internal(format!("calendar sync worker needs a tokio runtime: {err}"))
        })?;

        Ok(Self {
            shared: Arc::new(Shared {
                orchestrator,
                config,
                metrics,
                lanes: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
                closed: AtomicBool::new(false),
                cancellation: CancellationToken::new(),
            }),
            tracker: TaskTracker::new(),
            runtime,
        })
    }

    pub fn metrics(&self) -> Arc<SyncMetrics> {
        Arc::clone(&self.shared.metrics)
    }

    /// Jobs dispatched but not yet finished.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Lanes currently alive.
    pub fn active_lanes(&self) -> usize {
        self.shared.lanes.lock().len()
    }

    /// Wait until every dispatched job has finished. Returns `false` when
    /// `timeout` elapsed first.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.shared.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.pending() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Stop accepting jobs, let queued jobs finish within `grace`, then
    /// cancel whatever is still running. Returns `true` on a clean drain.
    #[instrument(skip(self))]
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            debug!("calendar sync worker already shut down");
            return true;
        }

        info!(pending = self.pending(), "stopping calendar sync worker");
        // Dropping the senders lets each lane drain its queue and exit.
        self.shared.lanes.lock().clear();
        self.tracker.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            info!("calendar sync worker drained");
            return true;
        }

        warn!(pending = self.pending(), "calendar sync worker did not drain in time; cancelling");
        self.shared.cancellation.cancel();
        self.tracker.wait().await;
        false
    }

    fn spawn_lane(&self, appointment_id: Uuid, receiver: mpsc::UnboundedReceiver<SyncJob>, generation: u64) {
        let shared = Arc::clone(&self.shared);
        self.tracker.spawn_on(run_lane(shared, appointment_id, receiver, generation), &self.runtime);
    }
}

impl SyncDispatcher for CalendarSyncWorker {
    fn dispatch(&self, job: SyncJob) {
        let appointment_id = job.appointment_id();
        let operation = job.operation();

        if self.shared.closed.load(Ordering::Acquire) {
            warn!(%appointment_id, %operation, "calendar sync worker stopped; job dropped");
            return;
        }

        self.shared.metrics.record_dispatched();
        self.shared.pending.fetch_add(1, Ordering::AcqRel);

        let mut lanes = self.shared.lanes.lock();
        let job = match lanes.get(&appointment_id) {
            Some(lane) => match lane.sender.send(job) {
                Ok(()) => {
                    debug!(%appointment_id, %operation, "sync job queued on existing lane");
                    return;
                }
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        if sender.send(job).is_err() {
            drop(lanes);
            self.shared.job_finished();
            return;
        }
        lanes.insert(appointment_id, Lane { generation, sender });
        drop(lanes);

        debug!(%appointment_id, %operation, "sync lane opened");
        self.spawn_lane(appointment_id, receiver, generation);
    }
}

async fn run_lane(
    shared: Arc<Shared>,
    appointment_id: Uuid,
    mut receiver: mpsc::UnboundedReceiver<SyncJob>,
    generation: u64,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = shared.cancellation.cancelled() => break,
            next = tokio::time::timeout(shared.config.lane_idle, receiver.recv()) => next,
        };

        let job = match next {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => {
                let mut lanes = shared.lanes.lock();
                match receiver.try_recv() {
                    Ok(job) => {
                        drop(lanes);
                        job
                    }
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                        if lanes.get(&appointment_id).is_some_and(|lane| lane.generation == generation) {
                            lanes.remove(&appointment_id);
                        }
                        debug!(%appointment_id, "sync lane retired after idling");
                        return;
                    }
                }
            }
        };

        tokio::select! {
            biased;
            () = shared.cancellation.cancelled() => {
                shared.job_finished();
                break;
            }
            () = execute(&shared, job) => {}
        }
    }

    {
        let mut lanes = shared.lanes.lock();
        if lanes.get(&appointment_id).is_some_and(|lane| lane.generation == generation) {
            lanes.remove(&appointment_id);
        }
    }

    receiver.close();
    let mut dropped = 0usize;
    while receiver.try_recv().is_ok() {
        dropped += 1;
        shared.job_finished();
    }
    if dropped > 0 {
        warn!(%appointment_id, dropped, "sync lane cancelled with queued jobs");
    }
}

async fn execute(shared: &Shared, job: SyncJob) {
    let appointment_id = job.appointment_id();
    let operation = job.operation();
    let started = Instant::now();

    match tokio::time::timeout(shared.config.job_timeout, shared.orchestrator.run(job)).await {
        Ok(outcome) => {
            shared.metrics.record_outcome(&outcome, started.elapsed());
            if outcome.is_failure() {
                debug!(%appointment_id, %operation, outcome = outcome.label(), "sync job failed");
            }
        }
        Err(_) => {
            shared.metrics.record_timeout(started.elapsed());
            warn!(
                %appointment_id,
                %operation,
                timeout_ms = shared.config.job_timeout.as_millis() as u64,
                "sync job exceeded its timeout and was abandoned"
            );
        }
    }

    shared.job_finished();
}
