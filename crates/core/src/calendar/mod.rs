//! Best-effort mirroring of appointments into external calendars

pub mod names;
pub mod orchestrator;
pub mod ports;

pub use names::NameResolver;
pub use orchestrator::CalendarSyncOrchestrator;
