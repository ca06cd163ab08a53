//! Display names for calendar events

use std::sync::Arc;

use careline_domain::constants::{
    FALLBACK_PATIENT_NAME, FALLBACK_PROFESSIONAL_NAME, FALLBACK_SERVICE_NAME,
};
use careline_domain::{Appointment, PersonName, ResolvedNames, Result};
use tracing::warn;

use super::ports::PartyDirectory;

/// Resolves patient, professional and service names, falling back to
/// generic labels. Never fails.
#[derive(Clone)]
pub struct NameResolver {
    directory: Arc<dyn PartyDirectory>,
}

impl NameResolver {
    pub fn new(directory: Arc<dyn PartyDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, appointment: &Appointment) -> ResolvedNames {
        let patient = person_or(
            "patient",
            self.directory.patient(appointment.patient_id).await,
            FALLBACK_PATIENT_NAME,
        );
        let professional = person_or(
            "professional",
            self.directory.professional(appointment.professional_id).await,
            FALLBACK_PROFESSIONAL_NAME,
        );

        ResolvedNames { patient, professional, service: self.service_name(appointment).await }
    }

    /// Denormalized name first, then the catalog, then the generic label.
    async fn service_name(&self, appointment: &Appointment) -> String {
        if let Some(name) = non_blank(appointment.treatment_name.as_deref()) {
            return name.to_string();
        }

        let Some(treatment_id) = appointment.treatment_id else {
            return FALLBACK_SERVICE_NAME.to_string();
        };

        match self.directory.treatment_name(treatment_id).await {
            Ok(name) => non_blank(name.as_deref()).unwrap_or(FALLBACK_SERVICE_NAME).to_string(),
            Err(err) => {
                warn!(%treatment_id, error = %err, "treatment lookup failed; using fallback name");
                FALLBACK_SERVICE_NAME.to_string()
            }
        }
    }
}

fn person_or(role: &'static str, lookup: Result<Option<PersonName>>, fallback: &str) -> String {
    match lookup {
        Ok(person) => person.and_then(|person| person.display()).unwrap_or_else(|| fallback.into()),
        Err(err) => {
            warn!(role, error = %err, "name lookup failed; using fallback name");
            fallback.to_string()
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
