//! Port interfaces for appointment persistence
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use careline_domain::{Appointment, AppointmentFilter, AppointmentPatch, Result};
use uuid::Uuid;

/// Durable storage for appointment records
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Fetch one appointment, `None` when it does not exist
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// Appointments matching `filter`, ordered by `scheduled_at` ascending
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;

    /// Insert a new record. Fails with `Database` on constraint violations
    /// (unknown patient or professional, duplicate id).
    async fn insert(&self, appointment: &Appointment) -> Result<()>;

    /// Apply a partial write in one statement and return the stored row.
    /// Fails with `NotFound` when the appointment does not exist and with
    /// `InvalidTransition` when the patch's status guard no longer holds.
    async fn update_fields(&self, id: Uuid, patch: &AppointmentPatch) -> Result<Appointment>;

    /// Remove the record; `false` when nothing was deleted
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Atomically replace the external event link when it currently equals
    /// `expected`. `new` is the event id with the professional whose calendar
    /// holds it; `None` clears both. Returns `false` when the row is gone or
    /// the link moved on.
    async fn swap_external_event_id(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new: Option<(&str, Uuid)>,
    ) -> Result<bool>;
}
