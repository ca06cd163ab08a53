//! # Careline Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite appointment store and party directory (r2d2 pool)
//! - HTTP client and the calendar gateway adapter
//! - The detached calendar sync worker
//! - Configuration loading, tracing initialisation and sync metrics
//!
//! ## Architecture
//! - Implements traits defined in `careline-core`
//! - Depends on `careline-domain` and `careline-core`
//! - Contains all "impure" code (I/O, network, background tasks)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;
pub mod sync;

// Re-export commonly used items
pub use database::{DbManager, SqliteAppointmentStore, SqlitePartyDirectory};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::calendar::{
    build_calendar_adapter, DisconnectedCalendarAdapter, HttpCalendarAdapter,
};
pub use observability::{init_tracing, SyncMetrics, SyncMetricsSnapshot};
pub use sync::{CalendarSyncWorker, CalendarSyncWorkerConfig};
