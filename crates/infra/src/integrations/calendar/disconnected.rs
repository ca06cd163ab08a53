use async_trait::async_trait;
use careline_core::CalendarAdapter;
use careline_domain::{CalendarEventPayload, CarelineError, Result};
use uuid::Uuid;

/// Adapter used when calendar sync is disabled.
///
/// Reports every professional as not connected, so the orchestrator skips
/// creates and deletes without touching the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedCalendarAdapter;

#[async_trait]
impl CalendarAdapter for DisconnectedCalendarAdapter {
    async fn is_connected(&self, _professional_id: Uuid) -> Result<bool> {
        Ok(false)
    }

    async fn create_event(
        &self,
        _professional_id: Uuid,
        _payload: &CalendarEventPayload,
    ) -> Result<String> {
        Err(disabled())
    }

    async fn update_event(
        &self,
        _professional_id: Uuid,
        _event_id: &str,
        _payload: &CalendarEventPayload,
    ) -> Result<()> {
        Err(disabled())
    }

    async fn delete_event(&self, _professional_id: Uuid, _event_id: &str) -> Result<()> {
        Err(disabled())
    }
}

fn disabled() -> CarelineError {
    CarelineError::Config("calendar sync is disabled".into())
}
