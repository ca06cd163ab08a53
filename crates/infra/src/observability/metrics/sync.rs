//! Calendar sync metrics
//!
//! Counts dispatched jobs and their outcomes, and keeps a ring buffer of job
//! durations for P50/P95 reporting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use careline_domain::SyncOutcome;
use parking_lot::Mutex;
use serde::Serialize;

use crate::observability::{MetricsError, MetricsResult};

const MAX_DURATION_SAMPLES: usize = 1000;

/// Counters for the calendar sync worker
#[derive(Debug, Default)]
pub struct SyncMetrics {
    dispatched: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    moved: AtomicU64,
    deleted: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    durations_ms: Mutex<VecDeque<u64>>,
}

/// Point-in-time copy of [`SyncMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncMetricsSnapshot {
    pub dispatched: u64,
    pub created: u64,
    pub updated: u64,
    pub moved: u64,
    pub deleted: u64,
    pub skipped: u64,
    pub failed: u64,
    pub timed_out: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_ms: Option<u64>,
}

impl SyncMetricsSnapshot {
    /// Jobs that reached an outcome (including timeouts).
    pub fn finished(&self) -> u64 {
        self.created
            + self.updated
            + self.moved
            + self.deleted
            + self.skipped
            + self.failed
            + self.timed_out
    }
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished job by outcome and remember how long it took.
    pub fn record_outcome(&self, outcome: &SyncOutcome, elapsed: Duration) {
        let counter = match outcome {
            SyncOutcome::Created { .. } => &self.created,
            SyncOutcome::Updated { .. } => &self.updated,
            SyncOutcome::Moved { .. } => &self.moved,
            SyncOutcome::Deleted { .. } => &self.deleted,
            SyncOutcome::Skipped(_) => &self.skipped,
            SyncOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.record_duration(elapsed);
    }

    /// A job abandoned after exceeding the job timeout.
    pub fn record_timeout(&self, elapsed: Duration) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
        self.record_duration(elapsed);
    }

    /// Percentile (0-100) over recorded job durations.
    pub fn percentile_ms(&self, percentile: u8) -> MetricsResult<u64> {
        let mut samples: Vec<u64> = self.durations_ms.lock().iter().copied().collect();
        if samples.is_empty() {
            return Err(MetricsError::EmptyData { metric: percentile_name(percentile) });
        }

        samples.sort_unstable();
        let rank = (usize::from(percentile.min(100)) * (samples.len() - 1) + 50) / 100;
        Ok(samples[rank])
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            moved: self.moved.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            p50_ms: self.percentile_ms(50).ok(),
            p95_ms: self.percentile_ms(95).ok(),
        }
    }

    fn record_duration(&self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut samples = self.durations_ms.lock();
        samples.push_back(ms);
        if samples.len() > MAX_DURATION_SAMPLES {
            samples.pop_front();
        }
    }
}

fn percentile_name(percentile: u8) -> &'static str {
    match percentile {
        50 => "P50",
        95 => "P95",
        99 => "P99",
        _ => "percentile",
    }
}
