//! Appointment lifecycle commands
//!
//! Thin wrappers over `AppointmentService`. Calendar sync runs in the
//! background, so a successful response never waits on the gateway.

use careline_domain::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentUpdate, NewAppointment,
    StatusChange,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ActionResponse, CommandResponse};
use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

/// Status change request as received from clients
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeRequest {
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub changed_by: Option<Uuid>,
    /// Administrative override of the transition table.
    #[serde(default, rename = "override")]
    pub force: bool,
}

impl From<StatusChangeRequest> for StatusChange {
    fn from(request: StatusChangeRequest) -> Self {
        let mut change = StatusChange::new(request.status);
        change.reason = request.reason;
        change.changed_by = request.changed_by;
        if request.force {
            change = change.overriding();
        }
        change
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn create_appointment(
    ctx: &AppContext,
    input: NewAppointment,
) -> CommandResponse<Appointment> {
    execute_command("appointments::create_appointment", ctx.appointments.create(input))
        .await
        .into()
}

pub async fn update_appointment(
    ctx: &AppContext,
    id: Uuid,
    update: AppointmentUpdate,
) -> CommandResponse<Appointment> {
    execute_command("appointments::update_appointment", ctx.appointments.update(id, update))
        .await
        .into()
}

pub async fn change_appointment_status(
    ctx: &AppContext,
    id: Uuid,
    change: StatusChange,
) -> ActionResponse {
    execute_command(
        "appointments::change_appointment_status",
        ctx.appointments.change_status(id, change),
    )
    .await
    .into()
}

pub async fn cancel_appointment(
    ctx: &AppContext,
    id: Uuid,
    reason: Option<String>,
) -> ActionResponse {
    execute_command("appointments::cancel_appointment", ctx.appointments.cancel(id, reason))
        .await
        .into()
}

pub async fn delete_appointment(ctx: &AppContext, id: Uuid) -> ActionResponse {
    execute_command("appointments::delete_appointment", ctx.appointments.delete(id)).await.into()
}

pub async fn get_appointment(ctx: &AppContext, id: Uuid) -> CommandResponse<Appointment> {
    execute_command("appointments::get_appointment", ctx.appointments.get(id)).await.into()
}

/// List in `scheduled_at` order; at most 500 rows.
pub async fn list_appointments(
    ctx: &AppContext,
    filter: AppointmentFilter,
) -> CommandResponse<Vec<Appointment>> {
    execute_command("appointments::list_appointments", ctx.appointments.list(&filter))
        .await
        .into()
}

pub async fn mark_reminder_sent(ctx: &AppContext, id: Uuid) -> CommandResponse<Appointment> {
    execute_command("appointments::mark_reminder_sent", ctx.appointments.mark_reminder_sent(id))
        .await
        .into()
}

pub async fn mark_confirmation_sent(ctx: &AppContext, id: Uuid) -> CommandResponse<Appointment> {
    execute_command(
        "appointments::mark_confirmation_sent",
        ctx.appointments.mark_confirmation_sent(id),
    )
    .await
    .into()
}

#[cfg(test)]
mod tests {
    use careline_domain::TransitionMode;
    use serde_json::json;

    use super::*;

    #[test]
    fn status_request_maps_override_flag() {
        let request: StatusChangeRequest = serde_json::from_value(json!({
            "status": "completed",
            "reason": "entered late",
            "override": true,
        }))
        .unwrap();

        let change = StatusChange::from(request);

        assert_eq!(change.status, AppointmentStatus::Completed);
        assert_eq!(change.reason.as_deref(), Some("entered late"));
        assert_eq!(change.mode, TransitionMode::Override);
    }

    #[test]
    fn status_request_defaults_to_enforced() {
        let request: StatusChangeRequest =
            serde_json::from_value(json!({ "status": "confirmed" })).unwrap();

        assert_eq!(StatusChange::from(request).mode, TransitionMode::Enforced);
    }
}
