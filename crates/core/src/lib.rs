//! # Careline Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the appointment store, the external
//!   calendar, the party directory and the sync dispatcher
//! - The appointment lifecycle service and its status state machine
//! - The calendar sync orchestrator and name resolver
//!
//! ## Architecture Principles
//! - Only depends on `careline-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod appointments;
pub mod calendar;
pub mod clock;

pub use appointments::ports::AppointmentStore;
pub use appointments::AppointmentService;
pub use calendar::ports::{CalendarAdapter, PartyDirectory, SyncDispatcher};
pub use calendar::{CalendarSyncOrchestrator, NameResolver};
pub use clock::{Clock, FixedClock, SystemClock};
