//! Directory endpoints (idempotent upserts by id)

use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};
use uuid::Uuid;

use super::{AppState, Reply};
use crate::commands::{self, ActionResponse, PersonRequest, TreatmentRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients/{id}", put(upsert_patient))
        .route("/professionals/{id}", put(upsert_professional))
        .route("/treatments/{id}", put(upsert_treatment))
}

async fn upsert_patient(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PersonRequest>,
) -> Reply<ActionResponse> {
    Reply::action(commands::upsert_patient(&ctx, id, request).await)
}

async fn upsert_professional(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PersonRequest>,
) -> Reply<ActionResponse> {
    Reply::action(commands::upsert_professional(&ctx, id, request).await)
}

async fn upsert_treatment(
    State(ctx): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TreatmentRequest>,
) -> Reply<ActionResponse> {
    Reply::action(commands::upsert_treatment(&ctx, id, request).await)
}
