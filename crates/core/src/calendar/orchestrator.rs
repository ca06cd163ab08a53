//! Calendar sync orchestrator
//!
//! Runs one [`SyncJob`] against the professional's external calendar and
//! keeps `external_calendar_event_id` consistent with what the provider
//! holds. It never returns an error: failures are logged and reported as
//! [`SyncOutcome::Failed`], leaving the appointment record untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use careline_domain::constants::DEFAULT_ADAPTER_TIMEOUT_SECS;
use careline_domain::{
    Appointment, AppointmentStatus, CalendarEventPayload, CarelineError, Result, SkipReason,
    SyncJob, SyncOutcome,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::names::NameResolver;
use super::ports::CalendarAdapter;
use crate::appointments::ports::AppointmentStore;

/// Upper bound on professional reassignments chased during one create.
const MAX_CREATE_ATTEMPTS: usize = 3;

/// Reconciles appointments with external calendar events
pub struct CalendarSyncOrchestrator {
    store: Arc<dyn AppointmentStore>,
    calendar: Arc<dyn CalendarAdapter>,
    names: NameResolver,
    adapter_timeout: Duration,
}

/// Result of one create attempt
enum CreateStep {
    Done(SyncOutcome),
    /// The professional changed while the event was being created; the event
    /// lives in `professional_id`'s calendar and is linked.
    Reassigned { professional_id: Uuid, event_id: String },
}

impl CalendarSyncOrchestrator {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        calendar: Arc<dyn CalendarAdapter>,
        names: NameResolver,
    ) -> Self {
        Self {
            store,
            calendar,
            names,
            adapter_timeout: Duration::from_secs(DEFAULT_ADAPTER_TIMEOUT_SECS),
        }
    }

    /// Bound applied to every individual adapter call
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    /// Run one job to completion.
    pub async fn run(&self, job: SyncJob) -> SyncOutcome {
        let appointment_id = job.appointment_id();
        let operation = job.operation();

        let result = match job {
            SyncJob::Create { appointment } => self.create(appointment.id).await,
            SyncJob::Update { previous, .. } => self.update(&previous).await,
            SyncJob::Delete { appointment_id, professional_id, event_id, clear_link } => {
                self.delete(appointment_id, professional_id, &event_id, clear_link).await
            }
        };

        match result {
            Ok(outcome) => {
                debug!(%appointment_id, %operation, outcome = outcome.label(), "calendar sync finished");
                outcome
            }
            Err(err) => {
                warn!(
                    %appointment_id,
                    %operation,
                    error = %err,
                    kind = err.label(),
                    "calendar sync failed"
                );
                SyncOutcome::Failed(err.to_string())
            }
        }
    }

    async fn create(&self, appointment_id: Uuid) -> Result<SyncOutcome> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            match self.create_once(appointment_id).await? {
                CreateStep::Done(outcome) => return Ok(outcome),
                CreateStep::Reassigned { professional_id, event_id } => {
                    self.remove_and_unlink(appointment_id, professional_id, &event_id).await?;
                }
            }
        }

        Err(CarelineError::Internal(format!(
            "professional of appointment {appointment_id} kept changing during event creation"
        )))
    }

    async fn create_once(&self, appointment_id: Uuid) -> Result<CreateStep> {
        let Some(snapshot) = self.store.get(appointment_id).await? else {
            return Ok(CreateStep::Done(SyncOutcome::Skipped(SkipReason::AppointmentGone)));
        };
        if snapshot.status == AppointmentStatus::Cancelled {
            return Ok(CreateStep::Done(SyncOutcome::Skipped(SkipReason::Cancelled)));
        }
        if snapshot.is_linked() {
            return Ok(CreateStep::Done(SyncOutcome::Skipped(SkipReason::AlreadyLinked)));
        }

        let professional_id = snapshot.professional_id;
        if !self.is_connected(professional_id).await? {
            debug!(%appointment_id, %professional_id, "calendar not connected");
            return Ok(CreateStep::Done(SyncOutcome::Skipped(SkipReason::NotConnected)));
        }

        let payload = self.payload_for(&snapshot).await;
        let event_id =
            self.call("create_event", self.calendar.create_event(professional_id, &payload)).await?;

        let link = Some((event_id.as_str(), professional_id));
        if !self.store.swap_external_event_id(appointment_id, None, link).await? {
            self.compensate(professional_id, &event_id).await;
            let reason = match self.store.get(appointment_id).await? {
                Some(_) => SkipReason::AlreadyLinked,
                None => SkipReason::AppointmentGone,
            };
            return Ok(CreateStep::Done(SyncOutcome::Skipped(reason)));
        }
        info!(%appointment_id, %event_id, "calendar event created and linked");

        self.reconcile_after_link(&snapshot, event_id).await
    }

    /// Catch edits that landed between reading the snapshot and linking.
    async fn reconcile_after_link(
        &self,
        snapshot: &Appointment,
        event_id: String,
    ) -> Result<CreateStep> {
        let owner = snapshot.professional_id;
        let Some(latest) = self.store.get(snapshot.id).await? else {
            self.compensate(owner, &event_id).await;
            return Ok(CreateStep::Done(SyncOutcome::Skipped(SkipReason::AppointmentGone)));
        };

        if latest.status == AppointmentStatus::Cancelled {
            self.remove_and_unlink(latest.id, owner, &event_id).await?;
            info!(appointment_id = %latest.id, "appointment cancelled during event creation");
            return Ok(CreateStep::Done(SyncOutcome::Deleted { event_id }));
        }

        if latest.calendar_fields() == snapshot.calendar_fields() {
            return Ok(CreateStep::Done(SyncOutcome::Created { event_id }));
        }

        if latest.professional_id != owner {
            return Ok(CreateStep::Reassigned { professional_id: owner, event_id });
        }

        let payload = self.payload_for(&latest).await;
        self.call("update_event", self.calendar.update_event(owner, &event_id, &payload)).await?;
        info!(appointment_id = %latest.id, %event_id, "calendar event refreshed after concurrent edit");
        Ok(CreateStep::Done(SyncOutcome::Created { event_id }))
    }

    /// `previous` is the record as it was before the edit; the payload is
    /// built from the current stored row. The event is addressed through the
    /// recorded owner, not the professional on either snapshot.
    async fn update(&self, previous: &Appointment) -> Result<SyncOutcome> {
        let Some(latest) = self.store.get(previous.id).await? else {
            return Ok(SyncOutcome::Skipped(SkipReason::AppointmentGone));
        };
        let Some((owner, event_id)) = latest.linked_event() else {
            return Ok(SyncOutcome::Skipped(SkipReason::NotLinked));
        };
        let event_id = event_id.to_string();
        if latest.status == AppointmentStatus::Cancelled {
            return Ok(SyncOutcome::Skipped(SkipReason::Cancelled));
        }

        if latest.professional_id != owner {
            return self.relocate(&latest, owner, &event_id).await;
        }

        if latest.calendar_fields() == previous.calendar_fields() {
            return Ok(SyncOutcome::Skipped(SkipReason::NoRelevantChange));
        }

        let payload = self.payload_for(&latest).await;
        self.call("update_event", self.calendar.update_event(owner, &event_id, &payload)).await?;
        info!(appointment_id = %latest.id, %event_id, "calendar event updated");
        Ok(SyncOutcome::Updated { event_id })
    }

    /// Move the event from `owner`'s calendar to the current professional's.
    async fn relocate(
        &self,
        latest: &Appointment,
        owner: Uuid,
        event_id: &str,
    ) -> Result<SyncOutcome> {
        self.remove_and_unlink(latest.id, owner, event_id).await?;
        info!(
            appointment_id = %latest.id,
            from = %owner,
            to = %latest.professional_id,
            "moving calendar event to new professional"
        );

        match self.create(latest.id).await? {
            SyncOutcome::Created { event_id } => Ok(SyncOutcome::Moved { event_id: Some(event_id) }),
            SyncOutcome::Skipped(_) => Ok(SyncOutcome::Moved { event_id: None }),
            other => Ok(other),
        }
    }

    async fn delete(
        &self,
        appointment_id: Uuid,
        professional_id: Uuid,
        event_id: &str,
        clear_link: bool,
    ) -> Result<SyncOutcome> {
        if !self.is_connected(professional_id).await? {
            debug!(%appointment_id, %event_id, "calendar disconnected; leaving link in place");
            return Ok(SyncOutcome::Skipped(SkipReason::NotConnected));
        }

        self.call("delete_event", self.calendar.delete_event(professional_id, event_id)).await?;
        info!(%appointment_id, %event_id, "calendar event deleted");

        if clear_link && !self.store.swap_external_event_id(appointment_id, Some(event_id), None).await?
        {
            debug!(%appointment_id, %event_id, "link already changed; nothing to clear");
        }
        Ok(SyncOutcome::Deleted { event_id: event_id.to_string() })
    }

    /// Delete the event when the calendar is still connected, then clear the
    /// link. A failed delete keeps the link.
    async fn remove_and_unlink(
        &self,
        appointment_id: Uuid,
        professional_id: Uuid,
        event_id: &str,
    ) -> Result<()> {
        if self.is_connected(professional_id).await? {
            self.call("delete_event", self.calendar.delete_event(professional_id, event_id))
                .await?;
        } else {
            debug!(%appointment_id, %event_id, "previous calendar disconnected; dropping link only");
        }
        self.store.swap_external_event_id(appointment_id, Some(event_id), None).await?;
        Ok(())
    }

    /// Best-effort removal of an event that could not be linked.
    async fn compensate(&self, professional_id: Uuid, event_id: &str) {
        match self.call("delete_event", self.calendar.delete_event(professional_id, event_id)).await {
            Ok(()) => info!(%professional_id, %event_id, "removed unlinked calendar event"),
            Err(err) => warn!(
                %professional_id,
                %event_id,
                error = %err,
                "failed to remove unlinked calendar event; it is now orphaned"
            ),
        }
    }

    async fn is_connected(&self, professional_id: Uuid) -> Result<bool> {
        self.call("is_connected", self.calendar.is_connected(professional_id)).await
    }

    async fn payload_for(&self, appointment: &Appointment) -> CalendarEventPayload {
        let names = self.names.resolve(appointment).await;
        CalendarEventPayload {
            service_name: names.service,
            patient_name: names.patient,
            professional_name: names.professional,
            start_time: appointment.scheduled_at,
            duration_minutes: appointment.duration_minutes,
            notes: appointment.notes.clone(),
        }
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.adapter_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CarelineError::Timeout(format!(
                "calendar {operation} exceeded {}ms",
                self.adapter_timeout.as_millis()
            ))),
        }
    }
}
