//! External calendar adapters
//!
//! `HttpCalendarAdapter` talks to the calendar gateway;
//! `DisconnectedCalendarAdapter` stands in when sync is disabled.

pub mod disconnected;
pub mod http_adapter;

use std::sync::Arc;

use careline_core::CalendarAdapter;
use careline_domain::{CalendarConfig, Result};
pub use disconnected::DisconnectedCalendarAdapter;
pub use http_adapter::HttpCalendarAdapter;
use tracing::info;

/// Pick the adapter matching the configuration.
pub fn build_calendar_adapter(config: &CalendarConfig) -> Result<Arc<dyn CalendarAdapter>> {
    if !config.enabled {
        info!("calendar sync disabled; events will not be mirrored");
        return Ok(Arc::new(DisconnectedCalendarAdapter));
    }

    info!(base_url = %config.base_url, "calendar gateway adapter enabled");
    Ok(Arc::new(HttpCalendarAdapter::from_config(config)?))
}
