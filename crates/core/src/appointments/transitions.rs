//! Status transition rules
//!
//! Turns a requested [`StatusChange`] into the [`AppointmentPatch`] that
//! records it: the new status, `status_changed_at`/`status_changed_by` and
//! the per-status stamp. The patch is guarded on the status it was planned
//! from, so a concurrent change makes the write fail instead of overwriting.

use careline_domain::constants::MAX_CANCELLATION_REASON_LENGTH;
use careline_domain::{
    Appointment, AppointmentPatch, AppointmentStatus, CarelineError, Result, StatusChange,
    TransitionMode,
};
use chrono::{DateTime, Utc};

/// Check `from -> to` against the transition table.
///
/// A status never transitions to itself, not even under
/// [`TransitionMode::Override`].
pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
    mode: TransitionMode,
) -> Result<()> {
    let allowed = match mode {
        TransitionMode::Enforced => from.can_transition_to(to),
        TransitionMode::Override => from != to,
    };

    if allowed {
        Ok(())
    } else {
        Err(CarelineError::InvalidTransition { from, to })
    }
}

/// Build the patch recording `change` on `current` at `now`.
pub fn plan_transition(
    current: &Appointment,
    change: &StatusChange,
    now: DateTime<Utc>,
) -> Result<AppointmentPatch> {
    validate_transition(current.status, change.status, change.mode)?;

    let mut patch = AppointmentPatch {
        expected_status: Some(current.status),
        status: Some(change.status),
        status_changed_at: Some(now),
        // Always written so the actor never outlives the change it made.
        status_changed_by: Some(change.changed_by),
        updated_at: Some(now),
        ..AppointmentPatch::default()
    };

    match change.status {
        AppointmentStatus::Confirmed => patch.confirmed_at = Some(now),
        AppointmentStatus::InProgress => patch.started_at = Some(now),
        AppointmentStatus::Completed => patch.completed_at = Some(now),
        AppointmentStatus::Cancelled => {
            patch.cancellation_reason = Some(cancellation_reason(change.reason.as_deref())?);
        }
        AppointmentStatus::Scheduled | AppointmentStatus::Waiting | AppointmentStatus::NoShow => {}
    }

    // Leaving `cancelled` drops the reason with it.
    if current.status == AppointmentStatus::Cancelled {
        patch.cancellation_reason = Some(None);
    }

    Ok(patch)
}

fn cancellation_reason(reason: Option<&str>) -> Result<Option<String>> {
    let Some(reason) = reason.map(str::trim).filter(|reason| !reason.is_empty()) else {
        return Ok(None);
    };

    if reason.chars().count() > MAX_CANCELLATION_REASON_LENGTH {
        return Err(CarelineError::InvalidInput(format!(
            "cancellation reason exceeds {MAX_CANCELLATION_REASON_LENGTH} characters"
        )));
    }
    Ok(Some(reason.to_string()))
}
