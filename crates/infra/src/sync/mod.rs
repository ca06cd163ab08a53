//! Background calendar synchronisation
//!
//! `CalendarSyncWorker` is the production `SyncDispatcher`: it runs jobs on
//! tracked tasks with per-appointment ordering, job timeouts and an explicit
//! shutdown.

pub mod calendar_worker;

pub use calendar_worker::{CalendarSyncWorker, CalendarSyncWorkerConfig};
