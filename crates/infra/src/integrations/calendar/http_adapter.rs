//! Calendar gateway adapter
//!
//! Talks to the calendar gateway that fronts each professional's external
//! calendar (provider OAuth lives behind the gateway):
//!
//! - `GET    /professionals/{id}/calendar` → `{ "connected": bool }`
//! - `POST   /professionals/{id}/calendar/events` → `{ "id": "..." }`
//! - `PATCH  /professionals/{id}/calendar/events/{event_id}`
//! - `DELETE /professionals/{id}/calendar/events/{event_id}`
//!
//! Every path part is pushed as a single percent-encoded segment, so an event
//! id can never address another resource.

use async_trait::async_trait;
use careline_core::CalendarAdapter;
use careline_domain::{CalendarConfig, CalendarEventPayload, CarelineError, Result};
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::http::client::map_http_error;
use crate::http::HttpClient;

const USER_AGENT: &str = concat!("careline/", env!("CARGO_PKG_VERSION"));

/// [`CalendarAdapter`] backed by the calendar gateway's REST API.
pub struct HttpCalendarAdapter {
    client: HttpClient,
    base_url: Url,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionStatus {
    connected: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

/// Wire body for create and update.
#[derive(Debug, Serialize)]
struct EventBody<'a> {
    title: String,
    description: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    patient_name: &'a str,
    professional_name: &'a str,
    service_name: &'a str,
}

impl<'a> From<&'a CalendarEventPayload> for EventBody<'a> {
    fn from(payload: &'a CalendarEventPayload) -> Self {
        let mut description = format!("Professional: {}", payload.professional_name);
        if let Some(notes) = payload.notes.as_deref() {
            description.push_str("\n\n");
            description.push_str(notes);
        }

        Self {
            title: payload.title(),
            description,
            start: payload.start_time,
            end: payload.end_time(),
            patient_name: &payload.patient_name,
            professional_name: &payload.professional_name,
            service_name: &payload.service_name,
        }
    }
}

impl HttpCalendarAdapter {
    pub fn new(client: HttpClient, base_url: &str, api_key: Option<String>) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|err| {
            CarelineError::Config(format!("invalid calendar base_url {base_url:?}: {err}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(CarelineError::Config(format!(
                "calendar base_url {base_url:?} cannot carry a path"
            )));
        }

        Ok(Self { client, base_url: parsed, api_key })
    }

    /// Build the adapter and its HTTP client from configuration.
    pub fn from_config(config: &CalendarConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Self::new(client, &config.base_url, config.api_key.clone())
    }

    /// Base URL extended with `segments`, each percent-encoded (`/` included).
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CarelineError::Internal(format!("calendar base_url {} has no path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn calendar_url(&self, professional_id: Uuid, rest: &[&str]) -> Result<Url> {
        let professional_id = professional_id.to_string();
        let mut segments = vec!["professionals", professional_id.as_str(), "calendar"];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn event_url(&self, professional_id: Uuid, event_id: &str) -> Result<Url> {
        // Dot segments are dropped by the URL encoder rather than escaped.
        if matches!(event_id.trim(), "" | "." | "..") {
            return Err(CarelineError::InvalidInput(format!(
                "calendar event id {event_id:?} cannot be addressed"
            )));
        }
        self.calendar_url(professional_id, &["events", event_id])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl CalendarAdapter for HttpCalendarAdapter {
    #[instrument(skip(self))]
    async fn is_connected(&self, professional_id: Uuid) -> Result<bool> {
        let builder = self.request(Method::GET, self.calendar_url(professional_id, &[])?);
        let response = self.client.send(builder).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%professional_id, "no calendar registered for professional");
            return Ok(false);
        }

        let status: ConnectionStatus =
            ensure_success(response).await?.json().await.map_err(map_http_error)?;
        Ok(status.connected)
    }

    #[instrument(skip(self, payload), fields(start = %payload.start_time))]
    async fn create_event(
        &self,
        professional_id: Uuid,
        payload: &CalendarEventPayload,
    ) -> Result<String> {
        let url = self.calendar_url(professional_id, &["events"])?;
        let builder = self.request(Method::POST, url).json(&EventBody::from(payload));
        let response = ensure_success(self.client.send(builder).await?).await?;

        let created: CreatedEvent = response.json().await.map_err(map_http_error)?;
        if created.id.trim().is_empty() {
            return Err(CarelineError::Network("calendar gateway returned an empty event id".into()));
        }
        Ok(created.id)
    }

    #[instrument(skip(self, payload))]
    async fn update_event(
        &self,
        professional_id: Uuid,
        event_id: &str,
        payload: &CalendarEventPayload,
    ) -> Result<()> {
        let builder = self
            .request(Method::PATCH, self.event_url(professional_id, event_id)?)
            .json(&EventBody::from(payload));
        ensure_success(self.client.send(builder).await?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, professional_id: Uuid, event_id: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, self.event_url(professional_id, event_id)?);
        let response = self.client.send(builder).await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            warn!(%professional_id, %event_id, "calendar event already absent");
            return Ok(());
        }

        ensure_success(response).await?;
        Ok(())
    }
}

/// Turn non-2xx responses into errors, keeping the gateway's message.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = body.trim();
    let message = if detail.is_empty() {
        format!("calendar gateway returned {status}")
    } else {
        format!("calendar gateway returned {status}: {detail}")
    };

    Err(match status {
        StatusCode::NOT_FOUND => CarelineError::NotFound(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CarelineError::Timeout(message),
        status if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS => {
            CarelineError::InvalidInput(message)
        }
        _ => CarelineError::Network(message),
    })
}
