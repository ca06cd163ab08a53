//! SQLite-backed party directory.
//!
//! Read side implements the `PartyDirectory` port used for calendar event
//! names. The upsert helpers keep the patient, professional and treatment
//! tables populated so appointment foreign keys resolve.

use std::sync::Arc;

use async_trait::async_trait;
use careline_core::PartyDirectory;
use careline_domain::{CarelineError, PersonName, Result};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::instrument;
use uuid::Uuid;

use super::appointment_repository::map_join_error;
use super::manager::{map_sql_error, DbManager};

/// Which person table a lookup or upsert targets.
#[derive(Debug, Clone, Copy)]
enum PersonTable {
    Patients,
    Professionals,
}

impl PersonTable {
    fn name(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Professionals => "professionals",
        }
    }
}

/// Patient, professional and treatment lookups backed by SQLite.
pub struct SqlitePartyDirectory {
    db: Arc<DbManager>,
}

impl SqlitePartyDirectory {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or replace a patient's name record.
    pub async fn upsert_patient(&self, id: Uuid, clinic_id: Uuid, name: &PersonName) -> Result<()> {
        self.upsert_person(PersonTable::Patients, id, clinic_id, name.clone()).await
    }

    /// Insert or replace a professional's name record.
    pub async fn upsert_professional(
        &self,
        id: Uuid,
        clinic_id: Uuid,
        name: &PersonName,
    ) -> Result<()> {
        self.upsert_person(PersonTable::Professionals, id, clinic_id, name.clone()).await
    }

    /// Insert or rename a treatment.
    #[instrument(skip(self))]
    pub async fn upsert_treatment(&self, id: Uuid, clinic_id: Uuid, name: &str) -> Result<()> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CarelineError::InvalidInput("treatment name must not be empty".into()));
        }

        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO treatments (id, clinic_id, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET clinic_id = excluded.clinic_id, name = excluded.name",
                params![id.to_string(), clinic_id.to_string(), name],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, name))]
    async fn upsert_person(
        &self,
        table: PersonTable,
        id: Uuid,
        clinic_id: Uuid,
        name: PersonName,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, clinic_id, first_name, last_name, display_name)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                clinic_id = excluded.clinic_id,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                display_name = excluded.display_name",
            table.name()
        );

        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                &sql,
                params![
                    id.to_string(),
                    clinic_id.to_string(),
                    name.first_name,
                    name.last_name,
                    name.display_name
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_person(&self, table: PersonTable, id: Uuid) -> Result<Option<PersonName>> {
        let sql = format!(
            "SELECT first_name, last_name, display_name FROM {} WHERE id = ?1",
            table.name()
        );

        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<PersonName>> {
            let conn = db.get_connection()?;
            conn.query_row(&sql, params![id.to_string()], map_person_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl PartyDirectory for SqlitePartyDirectory {
    #[instrument(skip(self))]
    async fn patient(&self, id: Uuid) -> Result<Option<PersonName>> {
        self.find_person(PersonTable::Patients, id).await
    }

    #[instrument(skip(self))]
    async fn professional(&self, id: Uuid) -> Result<Option<PersonName>> {
        self.find_person(PersonTable::Professionals, id).await
    }

    #[instrument(skip(self))]
    async fn treatment_name(&self, id: Uuid) -> Result<Option<String>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<String>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT name FROM treatments WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_person_row(row: &Row<'_>) -> rusqlite::Result<PersonName> {
    Ok(PersonName {
        first_name: row.get(0)?,
        last_name: row.get(1)?,
        display_name: row.get(2)?,
    })
}
