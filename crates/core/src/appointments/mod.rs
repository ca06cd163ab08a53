//! Appointment lifecycle: booking, edits, status transitions and deletion

pub mod ports;
pub mod service;
pub mod transitions;

pub use service::AppointmentService;
pub use transitions::{plan_transition, validate_transition};
