//! Shared fixtures for `careline-api` integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use careline_api::http::router;
use careline_api::AppContext;
use careline_domain::{CalendarConfig, Config, DatabaseConfig, SyncConfig};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Application context on a temporary database plus its router.
pub struct TestApp {
    pub ctx: Arc<AppContext>,
    pub router: Router,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Calendar sync disabled.
    pub fn new() -> Self {
        Self::with_calendar(CalendarConfig::default())
    }

    /// Calendar sync against `base_url` (usually a WireMock server).
    pub fn with_gateway(base_url: &str) -> Self {
        Self::with_calendar(CalendarConfig {
            enabled: true,
            base_url: base_url.to_string(),
            api_key: Some("test-key".into()),
            request_timeout_secs: 2,
        })
    }

    fn with_calendar(calendar: CalendarConfig) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let config = Config {
            database: DatabaseConfig {
                path: temp_dir.path().join("careline.db").to_string_lossy().into_owned(),
                pool_size: 4,
            },
            calendar,
            sync: SyncConfig { adapter_timeout_secs: 2, job_timeout_secs: 5, lane_idle_secs: 1 },
            ..Config::default()
        };

        let ctx = Arc::new(AppContext::new(config).expect("context should build"));
        let router = router(Arc::clone(&ctx));
        Self { ctx, router, _temp_dir: temp_dir }
    }

    /// Send a request through the router and decode the JSON body.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).expect("request should build"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
