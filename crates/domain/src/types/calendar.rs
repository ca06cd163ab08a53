//! Calendar sync jobs and their outcomes

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::appointment::Appointment;

/// Event body sent to a professional's external calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventPayload {
    pub service_name: String,
    pub patient_name: String,
    pub professional_name: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CalendarEventPayload {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Event title as shown in the calendar: `"<service> - <patient>"`.
    pub fn title(&self) -> String {
        format!("{} - {}", self.service_name, self.patient_name)
    }
}

/// Unit of calendar work emitted after a committed lifecycle write
///
/// Jobs carry snapshots; the orchestrator re-reads the store where it needs
/// current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJob {
    /// Mirror a newly created (or reinstated) appointment.
    Create { appointment: Appointment },
    /// Reconcile the event after an edit. `previous` is the pre-commit row.
    Update { previous: Appointment, current: Appointment },
    /// Remove the event from `professional_id`'s calendar, the one that holds
    /// it. `clear_link` is false when the record is gone.
    Delete { appointment_id: Uuid, professional_id: Uuid, event_id: String, clear_link: bool },
}

impl SyncJob {
    pub fn appointment_id(&self) -> Uuid {
        match self {
            Self::Create { appointment } => appointment.id,
            Self::Update { current, .. } => current.id,
            Self::Delete { appointment_id, .. } => *appointment_id,
        }
    }

    pub fn operation(&self) -> SyncOperation {
        match self {
            Self::Create { .. } => SyncOperation::Create,
            Self::Update { .. } => SyncOperation::Update,
            Self::Delete { .. } => SyncOperation::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

crate::impl_domain_status_conversions!(SyncOperation {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// Why a sync job did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The professional has no connected calendar.
    NotConnected,
    /// The appointment already has an event.
    AlreadyLinked,
    /// The appointment has no event to touch.
    NotLinked,
    /// No calendar-significant field changed.
    NoRelevantChange,
    /// The appointment was deleted before the job ran.
    AppointmentGone,
    /// The appointment was cancelled before the event was created.
    Cancelled,
}

crate::impl_domain_status_conversions!(SkipReason {
    NotConnected => "not_connected",
    AlreadyLinked => "already_linked",
    NotLinked => "not_linked",
    NoRelevantChange => "no_relevant_change",
    AppointmentGone => "appointment_gone",
    Cancelled => "cancelled",
});

/// Result of running one sync job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SyncOutcome {
    Created { event_id: String },
    Updated { event_id: String },
    /// Event removed from the old professional's calendar and recreated
    /// in the new one (`event_id` is `None` when the new calendar is not
    /// connected).
    Moved { event_id: Option<String> },
    Deleted { event_id: String },
    Skipped(SkipReason),
    /// Adapter failure or timeout; logged and swallowed.
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Moved { .. } => "moved",
            Self::Deleted { .. } => "deleted",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }
}
