//! Appointment lifecycle service - core business logic
//!
//! Every operation commits to the [`AppointmentStore`] first. Calendar work
//! is only handed to the [`SyncDispatcher`] after a successful commit and its
//! outcome never reaches the caller.

use std::sync::Arc;

use careline_domain::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentStatus, AppointmentUpdate,
    CarelineError, NewAppointment, Result, StatusChange, SyncJob, TransitionMode,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::ports::AppointmentStore;
use super::transitions::plan_transition;
use crate::calendar::ports::SyncDispatcher;
use crate::clock::{Clock, SystemClock};

/// Appointment lifecycle manager
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    dispatcher: Arc<dyn SyncDispatcher>,
    clock: Arc<dyn Clock>,
}

impl AppointmentService {
    /// Create a new lifecycle service using the system clock
    pub fn new(store: Arc<dyn AppointmentStore>, dispatcher: Arc<dyn SyncDispatcher>) -> Self {
        Self { store, dispatcher, clock: Arc::new(SystemClock) }
    }

    /// Replace the clock used for timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Book a new appointment in `scheduled` status.
    ///
    /// No availability or double-booking check is made. Patient and
    /// professional existence is left to the store's constraints.
    #[instrument(skip(self, input), fields(professional_id = %input.professional_id))]
    pub async fn create(&self, input: NewAppointment) -> Result<Appointment> {
        input.validate()?;

        let appointment = input.into_appointment(Uuid::now_v7(), self.clock.now());
        self.store.insert(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            scheduled_at = %appointment.scheduled_at,
            "appointment created"
        );
        self.dispatcher.dispatch(SyncJob::Create { appointment: appointment.clone() });

        Ok(appointment)
    }

    /// Apply a partial update; only supplied fields change.
    ///
    /// An update job is queued whenever a calendar-significant field changed,
    /// linked or not: a create still in flight may link the event after this
    /// read, and the job behind it in the lane pushes the edit. Unlinked
    /// appointments are skipped by the orchestrator.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: Uuid, update: AppointmentUpdate) -> Result<Appointment> {
        let current = self.require(id).await?;
        if update.is_empty() {
            return Ok(current);
        }
        update.validate_against(&current)?;

        let patch = update.into_patch(self.clock.now());
        let updated = self.store.update_fields(id, &patch).await?;
        info!(appointment_id = %id, "appointment updated");

        if current.calendar_fields() == updated.calendar_fields() {
            debug!(appointment_id = %id, "no calendar-relevant change");
        } else {
            self.dispatcher.dispatch(SyncJob::Update { previous: current, current: updated.clone() });
        }

        Ok(updated)
    }

    /// Move the appointment to another status.
    ///
    /// Enforced changes follow the transition table; an override accepts
    /// any target other than the current status. The write is conditional on
    /// the status read here; losing a race yields `InvalidTransition`.
    #[instrument(skip(self, change), fields(to = %change.status, mode = ?change.mode))]
    pub async fn change_status(&self, id: Uuid, change: StatusChange) -> Result<Appointment> {
        let current = self.require(id).await?;
        let patch = plan_transition(&current, &change, self.clock.now())?;

        if change.mode == TransitionMode::Override && !current.status.can_transition_to(change.status)
        {
            warn!(
                appointment_id = %id,
                from = %current.status,
                to = %change.status,
                changed_by = ?change.changed_by,
                "administrative status override"
            );
        }

        let updated = self.store.update_fields(id, &patch).await?;
        info!(appointment_id = %id, from = %current.status, to = %updated.status, "status changed");

        if updated.status == AppointmentStatus::Cancelled {
            if let Some((owner, event_id)) = updated.linked_event() {
                self.dispatcher.dispatch(SyncJob::Delete {
                    appointment_id: id,
                    professional_id: owner,
                    event_id: event_id.to_string(),
                    clear_link: true,
                });
            }
        } else if current.status == AppointmentStatus::Cancelled
            && !updated.status.is_terminal()
            && !updated.is_linked()
        {
            self.dispatcher.dispatch(SyncJob::Create { appointment: updated.clone() });
        }

        Ok(updated)
    }

    /// Cancel with an optional reason.
    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> Result<Appointment> {
        self.change_status(id, StatusChange::cancel(reason)).await
    }

    /// Physically remove the appointment.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let current = self.require(id).await?;
        if !self.store.delete(id).await? {
            return Err(CarelineError::appointment_not_found(id));
        }
        info!(appointment_id = %id, "appointment deleted");

        if let Some((owner, event_id)) = current.linked_event() {
            self.dispatcher.dispatch(SyncJob::Delete {
                appointment_id: id,
                professional_id: owner,
                event_id: event_id.to_string(),
                clear_link: false,
            });
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Appointment> {
        self.require(id).await
    }

    pub async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        self.store.list(filter).await
    }

    /// Stamp `reminder_sent_at`; local only.
    pub async fn mark_reminder_sent(&self, id: Uuid) -> Result<Appointment> {
        let now = self.clock.now();
        let patch =
            AppointmentPatch { reminder_sent_at: Some(now), updated_at: Some(now), ..Default::default() };
        self.store.update_fields(id, &patch).await
    }

    /// Stamp `confirmation_sent_at`; local only.
    pub async fn mark_confirmation_sent(&self, id: Uuid) -> Result<Appointment> {
        let now = self.clock.now();
        let patch = AppointmentPatch {
            confirmation_sent_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };
        self.store.update_fields(id, &patch).await
    }

    async fn require(&self, id: Uuid) -> Result<Appointment> {
        self.store.get(id).await?.ok_or_else(|| CarelineError::appointment_not_found(id))
    }
}
