//! Domain types and models

pub mod appointment;
pub mod calendar;
pub mod directory;
pub mod status;

pub use appointment::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentUpdate, CalendarFields,
    NewAppointment,
};
pub use calendar::{CalendarEventPayload, SkipReason, SyncJob, SyncOperation, SyncOutcome};
pub use directory::{PersonName, ResolvedNames};
pub use status::{AppointmentStatus, StatusChange, TransitionMode};
