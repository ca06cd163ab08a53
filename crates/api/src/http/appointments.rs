//! Appointment endpoints

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use careline_domain::{Appointment, AppointmentFilter, AppointmentUpdate, NewAppointment};
use uuid::Uuid;

use super::{AppState, Reply};
use crate::commands::{self, ActionResponse, CancelRequest, CommandResponse, StatusChangeRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route(
            "/appointments/{id}",
            get(get_appointment).patch(update_appointment).delete(delete_appointment),
        )
        .route("/appointments/{id}/status", post(change_status))
        .route("/appointments/{id}/cancel", post(cancel_appointment))
        .route("/appointments/{id}/reminder-sent", post(mark_reminder_sent))
        .route("/appointments/{id}/confirmation-sent", post(mark_confirmation_sent))
}

/// GET /appointments?from=&to=&professional_id=&status=&limit=
async fn list_appointments(
    State(ctx): State<AppState>,
    Query(filter): Query<AppointmentFilter>,
) -> Reply<CommandResponse<Vec<Appointment>>> {
    Reply::data(commands::list_appointments(&ctx, filter).await)
}

/// POST /appointments - 201 with the stored record
async fn create_appointment(
    State(ctx): State<AppState>,
    Json(input): Json<NewAppointment>,
) -> Reply<CommandResponse<Appointment>> {
    Reply::created(commands::create_appointment(&ctx, input).await)
}

async fn get_appointment(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
) -> Reply<CommandResponse<Appointment>> {
    Reply::data(commands::get_appointment(&ctx, id).await)
}

/// PATCH /appointments/{id} - absent fields stay, `null` clears
async fn update_appointment(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<AppointmentUpdate>,
) -> Reply<CommandResponse<Appointment>> {
    Reply::data(commands::update_appointment(&ctx, id, update).await)
}

async fn delete_appointment(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
) -> Reply<ActionResponse> {
    Reply::action(commands::delete_appointment(&ctx, id).await)
}

async fn change_status(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> Reply<ActionResponse> {
    Reply::action(commands::change_appointment_status(&ctx, id, request.into()).await)
}

/// POST /appointments/{id}/cancel - body is optional
async fn cancel_appointment(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelRequest>>,
) -> Reply<ActionResponse> {
    let reason = request.and_then(|Json(body)| body.reason);
    Reply::action(commands::cancel_appointment(&ctx, id, reason).await)
}

async fn mark_reminder_sent(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
) -> Reply<CommandResponse<Appointment>> {
    Reply::data(commands::mark_reminder_sent(&ctx, id).await)
}

async fn mark_confirmation_sent(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
) -> Reply<CommandResponse<Appointment>> {
    Reply::data(commands::mark_confirmation_sent(&ctx, id).await)
}
