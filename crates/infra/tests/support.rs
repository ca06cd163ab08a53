//! Shared fixtures for `careline-infra` integration tests.

use std::sync::Arc;

use careline_domain::{NewAppointment, PersonName};
use careline_infra::database::{DbManager, SqliteAppointmentStore, SqlitePartyDirectory};
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

/// Temporary database with the schema applied. The directory lives as long
/// as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::new(temp_dir.path().join("careline.db"), 4)
            .expect("db manager should be created");
        manager.run_migrations().expect("schema should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn store(&self) -> Arc<SqliteAppointmentStore> {
        Arc::new(SqliteAppointmentStore::new(Arc::clone(&self.manager)))
    }

    pub fn directory(&self) -> Arc<SqlitePartyDirectory> {
        Arc::new(SqlitePartyDirectory::new(Arc::clone(&self.manager)))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Ids of one clinic's patient, professional and treatment.
#[derive(Debug, Clone, Copy)]
pub struct Parties {
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub treatment_id: Uuid,
}

impl Parties {
    /// Register "Maria Silva", "Dr. Ana" and a "Cleaning" treatment.
    pub async fn seed(directory: &SqlitePartyDirectory) -> Self {
        let parties = Self {
            clinic_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            treatment_id: Uuid::new_v4(),
        };

        directory
            .upsert_patient(parties.patient_id, parties.clinic_id, &PersonName::new("Maria", "Silva"))
            .await
            .expect("patient seeded");
        directory
            .upsert_professional(
                parties.professional_id,
                parties.clinic_id,
                &PersonName::new("Ana", "Lima").with_display_name("Dr. Ana"),
            )
            .await
            .expect("professional seeded");
        directory
            .upsert_treatment(parties.treatment_id, parties.clinic_id, "Cleaning")
            .await
            .expect("treatment seeded");

        parties
    }

    /// Another professional in the same clinic.
    pub async fn add_professional(&self, directory: &SqlitePartyDirectory, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        directory
            .upsert_professional(id, self.clinic_id, &PersonName::default().with_display_name(name))
            .await
            .expect("professional seeded");
        id
    }

    /// A one-hour "Cleaning" booking at `start`.
    pub fn booking(&self, start: DateTime<Utc>) -> NewAppointment {
        NewAppointment::new(self.clinic_id, self.patient_id, self.professional_id, start, 60)
            .with_treatment(self.treatment_id)
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}
