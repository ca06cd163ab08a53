//! Appointment records, inputs and partial updates
//!
//! [`Appointment`] is the authoritative row. Callers create it from a
//! [`NewAppointment`], edit it through an [`AppointmentUpdate`] (which has no
//! identity fields, so identity cannot change) and the lifecycle layer turns
//! both edits and status transitions into an [`AppointmentPatch`] for the
//! store. Fields that may be cleared use `Option<Option<T>>`: `None` leaves
//! the column untouched, `Some(None)` clears it.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::AppointmentStatus;
use crate::constants::{DEFAULT_LIST_LIMIT, MAX_BUFFER_MINUTES, MAX_DURATION_MINUTES};
use crate::errors::{CarelineError, Result};

/// A scheduled service encounter between a patient and a professional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub branch_id: Option<Uuid>,

    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub room_id: Option<Uuid>,

    pub treatment_id: Option<Uuid>,
    /// Denormalized service name, used for custom services without a catalog
    /// treatment.
    pub treatment_name: Option<String>,
    pub package_session_id: Option<Uuid>,

    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    /// Non-bookable padding after the appointment; not part of the visible end.
    pub buffer_minutes: i32,

    pub status: AppointmentStatus,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub status_changed_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,
    pub patient_notes: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,

    pub is_recurring: bool,
    /// Opaque recurrence rule; carried, never interpreted.
    pub recurrence_rule: Option<String>,
    pub parent_appointment_id: Option<Uuid>,

    /// Join key to the mirrored event in the professional's calendar.
    pub external_calendar_event_id: Option<String>,
    /// Professional whose calendar holds the linked event. Differs from
    /// `professional_id` until a reassignment has been synced.
    pub external_calendar_owner_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

impl Appointment {
    /// Visible end of the appointment (`scheduled_at + duration`).
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// End of the bookable block, buffer included.
    pub fn blocked_until(&self) -> DateTime<Utc> {
        self.ends_at() + Duration::minutes(i64::from(self.buffer_minutes))
    }

    pub fn is_linked(&self) -> bool {
        self.external_calendar_event_id.is_some()
    }

    /// The linked event as `(owner, event_id)`.
    pub fn linked_event(&self) -> Option<(Uuid, &str)> {
        let event_id = self.external_calendar_event_id.as_deref()?;
        Some((self.external_calendar_owner_id.unwrap_or(self.professional_id), event_id))
    }

    /// The subset of fields mirrored into the external calendar event.
    pub fn calendar_fields(&self) -> CalendarFields<'_> {
        CalendarFields {
            patient_id: self.patient_id,
            professional_id: self.professional_id,
            treatment_id: self.treatment_id,
            treatment_name: self.treatment_name.as_deref(),
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            notes: self.notes.as_deref(),
        }
    }
}

/// Calendar-significant view of an appointment
///
/// Two appointments with equal `CalendarFields` produce the same external
/// event; any other field change is local-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields<'a> {
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub treatment_name: Option<&'a str>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub notes: Option<&'a str>,
}

/// Booking input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub clinic_id: Uuid,
    #[serde(default)]
    pub branch_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    #[serde(default)]
    pub room_id: Option<Uuid>,
    #[serde(default)]
    pub treatment_id: Option<Uuid>,
    #[serde(default)]
    pub treatment_name: Option<String>,
    #[serde(default)]
    pub package_session_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(default)]
    pub buffer_minutes: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub patient_notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub parent_appointment_id: Option<Uuid>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl NewAppointment {
    /// Minimal booking; optional fields can be filled with the `with_*`
    /// helpers.
    pub fn new(
        clinic_id: Uuid,
        patient_id: Uuid,
        professional_id: Uuid,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Self {
        Self {
            clinic_id,
            branch_id: None,
            patient_id,
            professional_id,
            room_id: None,
            treatment_id: None,
            treatment_name: None,
            package_session_id: None,
            scheduled_at,
            duration_minutes,
            buffer_minutes: 0,
            notes: None,
            patient_notes: None,
            is_recurring: false,
            recurrence_rule: None,
            parent_appointment_id: None,
            created_by: None,
        }
    }

    pub fn with_treatment(mut self, treatment_id: Uuid) -> Self {
        self.treatment_id = Some(treatment_id);
        self
    }

    pub fn with_treatment_name(mut self, name: impl Into<String>) -> Self {
        self.treatment_name = Some(name.into());
        self
    }

    pub fn with_room(mut self, room_id: Uuid) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_buffer(mut self, minutes: i32) -> Self {
        self.buffer_minutes = minutes;
        self
    }

    pub fn created_by(mut self, actor: Uuid) -> Self {
        self.created_by = Some(actor);
        self
    }

    /// Check the invariants the store cannot enforce on its own.
    pub fn validate(&self) -> Result<()> {
        validate_duration(self.duration_minutes)?;
        validate_buffer(self.buffer_minutes)?;
        validate_recurrence(self.is_recurring, self.recurrence_rule.as_deref())
    }

    /// Build the initial record: `scheduled`, unlinked, timestamps at `now`.
    ///
    /// Timestamps are truncated to milliseconds, the precision the store keeps.
    pub fn into_appointment(self, id: Uuid, now: DateTime<Utc>) -> Appointment {
        let now = now.trunc_subsecs(3);
        Appointment {
            id,
            clinic_id: self.clinic_id,
            branch_id: self.branch_id,
            patient_id: self.patient_id,
            professional_id: self.professional_id,
            room_id: self.room_id,
            treatment_id: self.treatment_id,
            treatment_name: normalize_text(self.treatment_name),
            package_session_id: self.package_session_id,
            scheduled_at: self.scheduled_at.trunc_subsecs(3),
            duration_minutes: self.duration_minutes,
            buffer_minutes: self.buffer_minutes,
            status: AppointmentStatus::Scheduled,
            status_changed_at: None,
            status_changed_by: None,
            cancellation_reason: None,
            confirmed_at: None,
            started_at: None,
            completed_at: None,
            notes: normalize_text(self.notes),
            patient_notes: normalize_text(self.patient_notes),
            reminder_sent_at: None,
            confirmation_sent_at: None,
            is_recurring: self.is_recurring,
            recurrence_rule: normalize_text(self.recurrence_rule),
            parent_appointment_id: self.parent_appointment_id,
            external_calendar_event_id: None,
            external_calendar_owner_id: None,
            created_at: now,
            updated_at: now,
            created_by: self.created_by,
        }
    }
}

/// User-editable partial update (reschedule, reassignment, notes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub branch_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_id: Option<Uuid>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub room_id: Option<Option<Uuid>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub treatment_id: Option<Option<Uuid>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub treatment_name: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub package_session_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_minutes: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub notes: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub patient_notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub recurrence_rule: Option<Option<String>>,
}

impl AppointmentUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validate the supplied fields against the record they will land on.
    pub fn validate_against(&self, current: &Appointment) -> Result<()> {
        if let Some(duration) = self.duration_minutes {
            validate_duration(duration)?;
        }
        if let Some(buffer) = self.buffer_minutes {
            validate_buffer(buffer)?;
        }

        let is_recurring = self.is_recurring.unwrap_or(current.is_recurring);
        let rule = match &self.recurrence_rule {
            Some(rule) => rule.as_deref(),
            None => current.recurrence_rule.as_deref(),
        };
        validate_recurrence(is_recurring, rule)
    }

    /// Convert into a store patch stamped with `updated_at`.
    pub fn into_patch(self, updated_at: DateTime<Utc>) -> AppointmentPatch {
        AppointmentPatch {
            branch_id: self.branch_id,
            patient_id: self.patient_id,
            professional_id: self.professional_id,
            room_id: self.room_id,
            treatment_id: self.treatment_id,
            treatment_name: self.treatment_name.map(normalize_text),
            package_session_id: self.package_session_id,
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            buffer_minutes: self.buffer_minutes,
            notes: self.notes.map(normalize_text),
            patient_notes: self.patient_notes.map(normalize_text),
            is_recurring: self.is_recurring,
            recurrence_rule: self.recurrence_rule.map(normalize_text),
            updated_at: Some(updated_at),
            ..AppointmentPatch::default()
        }
    }
}

/// Store-level partial write
///
/// Every `None` leaves the stored column untouched. Status stamps are
/// set-only: once written they are never cleared by a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentPatch {
    /// Write guard: the patch only lands while the stored status still
    /// equals this value.
    pub expected_status: Option<AppointmentStatus>,
    pub branch_id: Option<Option<Uuid>>,
    pub patient_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub room_id: Option<Option<Uuid>>,
    pub treatment_id: Option<Option<Uuid>>,
    pub treatment_name: Option<Option<String>>,
    pub package_session_id: Option<Option<Uuid>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub buffer_minutes: Option<i32>,
    pub status: Option<AppointmentStatus>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub status_changed_by: Option<Option<Uuid>>,
    pub cancellation_reason: Option<Option<String>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<Option<String>>,
    pub patient_notes: Option<Option<String>>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    pub is_recurring: Option<bool>,
    pub recurrence_rule: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AppointmentPatch {
    /// Whether the write guard accepts `appointment`.
    pub fn guard_holds(&self, appointment: &Appointment) -> bool {
        self.expected_status.map_or(true, |expected| appointment.status == expected)
    }

    /// Merge the patch over `appointment` in place. The write guard is not
    /// consulted; see [`Self::guard_holds`].
    pub fn apply_to(&self, appointment: &mut Appointment) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        fn set_some<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if let Some(value) = value {
                *target = Some(value.clone());
            }
        }

        set(&mut appointment.branch_id, &self.branch_id);
        set(&mut appointment.patient_id, &self.patient_id);
        set(&mut appointment.professional_id, &self.professional_id);
        set(&mut appointment.room_id, &self.room_id);
        set(&mut appointment.treatment_id, &self.treatment_id);
        set(&mut appointment.treatment_name, &self.treatment_name);
        set(&mut appointment.package_session_id, &self.package_session_id);
        set(&mut appointment.scheduled_at, &self.scheduled_at);
        set(&mut appointment.duration_minutes, &self.duration_minutes);
        set(&mut appointment.buffer_minutes, &self.buffer_minutes);
        set(&mut appointment.status, &self.status);
        set_some(&mut appointment.status_changed_at, &self.status_changed_at);
        set(&mut appointment.status_changed_by, &self.status_changed_by);
        set(&mut appointment.cancellation_reason, &self.cancellation_reason);
        set_some(&mut appointment.confirmed_at, &self.confirmed_at);
        set_some(&mut appointment.started_at, &self.started_at);
        set_some(&mut appointment.completed_at, &self.completed_at);
        set(&mut appointment.notes, &self.notes);
        set(&mut appointment.patient_notes, &self.patient_notes);
        set_some(&mut appointment.reminder_sent_at, &self.reminder_sent_at);
        set_some(&mut appointment.confirmation_sent_at, &self.confirmation_sent_at);
        set(&mut appointment.is_recurring, &self.is_recurring);
        set(&mut appointment.recurrence_rule, &self.recurrence_rule);
        set(&mut appointment.updated_at, &self.updated_at);
    }

    /// Return a merged copy, leaving `appointment` untouched.
    pub fn merged(&self, appointment: &Appointment) -> Appointment {
        let mut merged = appointment.clone();
        self.apply_to(&mut merged);
        merged
    }
}

/// Store query filter
///
/// Every absent field means "no restriction". `from`/`to` are inclusive
/// bounds on `scheduled_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub professional_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl AppointmentFilter {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from: Some(from), to: Some(to), ..Self::default() }
    }

    pub fn for_professional(mut self, professional_id: Uuid) -> Self {
        self.professional_id = Some(professional_id);
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Requested limit capped at [`DEFAULT_LIST_LIMIT`].
    pub fn effective_limit(&self) -> u32 {
        self.limit.map_or(DEFAULT_LIST_LIMIT, |limit| limit.min(DEFAULT_LIST_LIMIT))
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.from.map_or(true, |from| appointment.scheduled_at >= from)
            && self.to.map_or(true, |to| appointment.scheduled_at <= to)
            && self.professional_id.map_or(true, |id| appointment.professional_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

fn validate_duration(duration_minutes: i32) -> Result<()> {
    if duration_minutes <= 0 {
        return Err(CarelineError::InvalidInput(format!(
            "duration_minutes must be positive (got {duration_minutes})"
        )));
    }
    if duration_minutes > MAX_DURATION_MINUTES {
        return Err(CarelineError::InvalidInput(format!(
            "duration_minutes must not exceed {MAX_DURATION_MINUTES} (got {duration_minutes})"
        )));
    }
    Ok(())
}

fn validate_buffer(buffer_minutes: i32) -> Result<()> {
    if !(0..=MAX_BUFFER_MINUTES).contains(&buffer_minutes) {
        return Err(CarelineError::InvalidInput(format!(
            "buffer_minutes must be between 0 and {MAX_BUFFER_MINUTES} (got {buffer_minutes})"
        )));
    }
    Ok(())
}

fn validate_recurrence(is_recurring: bool, rule: Option<&str>) -> Result<()> {
    if is_recurring && rule.map_or(true, |rule| rule.trim().is_empty()) {
        return Err(CarelineError::InvalidInput(
            "recurring appointments require a recurrence_rule".into(),
        ));
    }
    Ok(())
}

/// Trim free text and collapse blank strings to `None`.
fn normalize_text(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}
