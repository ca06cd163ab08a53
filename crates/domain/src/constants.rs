//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Appointment validation
pub const MAX_DURATION_MINUTES: i32 = 24 * 60;
pub const MAX_BUFFER_MINUTES: i32 = 8 * 60;
pub const MAX_CANCELLATION_REASON_LENGTH: usize = 500;

// Store queries
pub const DEFAULT_LIST_LIMIT: u32 = 500;

// Name resolution fallbacks
pub const FALLBACK_PATIENT_NAME: &str = "Patient";
pub const FALLBACK_PROFESSIONAL_NAME: &str = "Professional";
pub const FALLBACK_SERVICE_NAME: &str = "Appointment";

// Calendar sync defaults
pub const DEFAULT_ADAPTER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LANE_IDLE_SECS: u64 = 60;
pub const DEFAULT_CALENDAR_REQUEST_TIMEOUT_SECS: u64 = 15;
