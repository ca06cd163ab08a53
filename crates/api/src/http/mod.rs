//! JSON HTTP surface over the command layer
//!
//! Handlers delegate to [`crate::commands`] and translate the envelope's
//! error kind into an HTTP status. The body is always the envelope.

pub mod appointments;
pub mod directory;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::commands::{self, ActionResponse, CommandResponse};
use crate::context::AppContext;

/// Shared handler state
pub type AppState = Arc<AppContext>;

/// Build the full router.
pub fn router(ctx: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(appointments::router())
        .merge(directory::router())
        .with_state(ctx)
}

/// GET /health - 200 when healthy, 503 otherwise
async fn health(State(ctx): State<AppState>) -> Response {
    let report = commands::get_health(&ctx).await;
    let status =
        if report.status.is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report)).into_response()
}

/// HTTP status for a `CarelineError` label.
fn status_for(error_kind: Option<&str>) -> StatusCode {
    match error_kind {
        Some("not_found") => StatusCode::NOT_FOUND,
        Some("invalid_input") => StatusCode::BAD_REQUEST,
        Some("invalid_transition") => StatusCode::CONFLICT,
        Some("network") => StatusCode::BAD_GATEWAY,
        Some("timeout") => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Envelope paired with the status used on success.
pub(crate) struct Reply<B> {
    success: StatusCode,
    body: B,
}

impl<T> Reply<CommandResponse<T>> {
    pub(crate) fn data(body: CommandResponse<T>) -> Self {
        Self { success: StatusCode::OK, body }
    }

    pub(crate) fn created(body: CommandResponse<T>) -> Self {
        Self { success: StatusCode::CREATED, body }
    }
}

impl Reply<ActionResponse> {
    pub(crate) fn action(body: ActionResponse) -> Self {
        Self { success: StatusCode::OK, body }
    }
}

impl<T: Serialize> IntoResponse for Reply<CommandResponse<T>> {
    fn into_response(self) -> Response {
        let status = if self.body.is_ok() { self.success } else { status_for(self.body.error_kind()) };
        (status, Json(self.body)).into_response()
    }
}

impl IntoResponse for Reply<ActionResponse> {
    fn into_response(self) -> Response {
        let status = if self.body.success { self.success } else { status_for(self.body.error_kind()) };
        (status, Json(self.body)).into_response()
    }
}
