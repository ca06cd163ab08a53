//! Appointment status and the transition table

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Waiting,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

crate::impl_domain_status_conversions!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    Waiting => "waiting",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

impl AppointmentStatus {
    pub const ALL: [Self; 7] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::Waiting,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    /// Statuses reachable from `self` without an administrative override.
    pub fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::Scheduled => {
                &[Self::Confirmed, Self::Waiting, Self::InProgress, Self::Cancelled, Self::NoShow]
            }
            Self::Confirmed => {
                &[Self::Scheduled, Self::Waiting, Self::InProgress, Self::Cancelled, Self::NoShow]
            }
            Self::Waiting => &[Self::Confirmed, Self::InProgress, Self::Cancelled, Self::NoShow],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled | Self::NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Terminal statuses end the appointment logically.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

/// How strictly a status change follows the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Reject changes outside [`AppointmentStatus::allowed_transitions`].
    #[default]
    Enforced,
    /// Administrative correction: any status may follow any other.
    Override,
}

/// Requested status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<Uuid>,
    #[serde(default)]
    pub mode: TransitionMode,
}

impl StatusChange {
    pub fn new(status: AppointmentStatus) -> Self {
        Self { status, reason: None, changed_by: None, mode: TransitionMode::Enforced }
    }

    pub fn cancel(reason: Option<String>) -> Self {
        Self { reason, ..Self::new(AppointmentStatus::Cancelled) }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn by(mut self, actor: Uuid) -> Self {
        self.changed_by = Some(actor);
        self
    }

    pub fn overriding(mut self) -> Self {
        self.mode = TransitionMode::Override;
        self
    }
}
