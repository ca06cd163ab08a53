//! Port interfaces for calendar synchronization

use async_trait::async_trait;
use careline_domain::{CalendarEventPayload, PersonName, Result, SyncJob};
use uuid::Uuid;

/// Narrow adapter over one provider's calendar API
///
/// Every call is scoped to a single professional's calendar. Implementations
/// are network-bound and may fail or hang; callers bound each call with a
/// timeout.
#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    /// Whether the professional has a connected calendar
    async fn is_connected(&self, professional_id: Uuid) -> Result<bool>;

    /// Create an event and return its provider id
    async fn create_event(
        &self,
        professional_id: Uuid,
        payload: &CalendarEventPayload,
    ) -> Result<String>;

    /// Overwrite an existing event
    async fn update_event(
        &self,
        professional_id: Uuid,
        event_id: &str,
        payload: &CalendarEventPayload,
    ) -> Result<()>;

    /// Remove an event
    async fn delete_event(&self, professional_id: Uuid, event_id: &str) -> Result<()>;
}

/// Read-only lookups for event display names
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn patient(&self, id: Uuid) -> Result<Option<PersonName>>;

    async fn professional(&self, id: Uuid) -> Result<Option<PersonName>>;

    /// Catalog name of a treatment
    async fn treatment_name(&self, id: Uuid) -> Result<Option<String>>;
}

/// Hands sync jobs to a detached executor
///
/// `dispatch` must not block and must not fail the caller; jobs for the same
/// appointment are expected to run in dispatch order.
pub trait SyncDispatcher: Send + Sync {
    fn dispatch(&self, job: SyncJob);
}
