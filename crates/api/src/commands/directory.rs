//! Patient, professional and treatment registration
//!
//! Appointments reference these rows by id, and calendar events take their
//! names from here.

use careline_domain::PersonName;
use serde::Deserialize;
use uuid::Uuid;

use super::ActionResponse;
use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

#[derive(Debug, Clone, Deserialize)]
pub struct PersonRequest {
    pub clinic_id: Uuid,
    #[serde(flatten)]
    pub name: PersonName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentRequest {
    pub clinic_id: Uuid,
    pub name: String,
}

pub async fn upsert_patient(ctx: &AppContext, id: Uuid, request: PersonRequest) -> ActionResponse {
    execute_command(
        "directory::upsert_patient",
        ctx.directory.upsert_patient(id, request.clinic_id, &request.name),
    )
    .await
    .into()
}

pub async fn upsert_professional(
    ctx: &AppContext,
    id: Uuid,
    request: PersonRequest,
) -> ActionResponse {
    execute_command(
        "directory::upsert_professional",
        ctx.directory.upsert_professional(id, request.clinic_id, &request.name),
    )
    .await
    .into()
}

pub async fn upsert_treatment(
    ctx: &AppContext,
    id: Uuid,
    request: TreatmentRequest,
) -> ActionResponse {
    execute_command(
        "directory::upsert_treatment",
        ctx.directory.upsert_treatment(id, request.clinic_id, &request.name),
    )
    .await
    .into()
}
