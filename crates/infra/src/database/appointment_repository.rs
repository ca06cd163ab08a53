//! SQLite-backed appointment store.
//!
//! Implements the async `AppointmentStore` port on top of the shared r2d2
//! pool provided by `DbManager`. Every query runs on the blocking thread
//! pool; identifiers are stored as UUID strings and timestamps as epoch
//! milliseconds.

use std::sync::Arc;

use async_trait::async_trait;
use careline_core::AppointmentStore;
use careline_domain::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentStatus, CarelineError, Result,
};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};

const APPOINTMENT_COLUMNS: &str = "id, clinic_id, branch_id, patient_id, professional_id,
        room_id, treatment_id, treatment_name, package_session_id, scheduled_at,
        duration_minutes, buffer_minutes, status, status_changed_at, status_changed_by,
        cancellation_reason, confirmed_at, started_at, completed_at, notes,
        patient_notes, reminder_sent_at, confirmation_sent_at, is_recurring, recurrence_rule,
        parent_appointment_id, external_calendar_event_id, external_calendar_owner_id,
        created_at, updated_at, created_by";

const INSERT_APPOINTMENT_SQL: &str = "INSERT INTO appointments (
        id, clinic_id, branch_id, patient_id, professional_id,
        room_id, treatment_id, treatment_name, package_session_id, scheduled_at,
        duration_minutes, buffer_minutes, status, status_changed_at, status_changed_by,
        cancellation_reason, confirmed_at, started_at, completed_at, notes,
        patient_notes, reminder_sent_at, confirmation_sent_at, is_recurring, recurrence_rule,
        parent_appointment_id, external_calendar_event_id, external_calendar_owner_id,
        created_at, updated_at, created_by
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
        ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31)";

const DELETE_APPOINTMENT_SQL: &str = "DELETE FROM appointments WHERE id = ?1";

const SWAP_EVENT_ID_SQL: &str = "UPDATE appointments
    SET external_calendar_event_id = ?1, external_calendar_owner_id = ?2
    WHERE id = ?3 AND external_calendar_event_id IS ?4";

/// Appointment store backed by SQLite.
pub struct SqliteAppointmentStore {
    db: Arc<DbManager>,
}

impl SqliteAppointmentStore {
    /// Construct a store backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AppointmentStore for SqliteAppointmentStore {
    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Option<Appointment>> {
            let conn = db.get_connection()?;
            select_appointment(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let filter = filter.clone();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Vec<Appointment>> {
            let conn = db.get_connection()?;
            query_appointments(&conn, &filter)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn insert(&self, appointment: &Appointment) -> Result<()> {
        let appointment = appointment.clone();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(INSERT_APPOINTMENT_SQL, params_from_iter(insert_values(&appointment)))
                .map_err(map_sql_error)?;
            debug!(appointment_id = %appointment.id, "appointment inserted");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, patch))]
    async fn update_fields(&self, id: Uuid, patch: &AppointmentPatch) -> Result<Appointment> {
        let patch = patch.clone();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Appointment> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;

            let assignments = patch_assignments(&patch);
            if assignments.is_empty() {
                let current = select_appointment(&tx, id)?;
                return current.ok_or_else(|| CarelineError::appointment_not_found(id));
            }

            let (columns, mut values): (Vec<&str>, Vec<Value>) = assignments.into_iter().unzip();
            let set_clause = columns
                .iter()
                .enumerate()
                .map(|(index, column)| format!("{column} = ?{}", index + 1))
                .collect::<Vec<_>>()
                .join(", ");
            values.push(uuid_value(id));
            let mut sql =
                format!("UPDATE appointments SET {set_clause} WHERE id = ?{}", values.len());
            if let Some(expected) = patch.expected_status {
                values.push(Value::Text(expected.to_string()));
                sql.push_str(&format!(" AND status = ?{}", values.len()));
            }

            let changed = tx.execute(&sql, params_from_iter(values)).map_err(map_sql_error)?;
            if changed == 0 {
                return Err(rejected_write(&tx, id, &patch));
            }

            let updated = select_appointment(&tx, id)?
                .ok_or_else(|| CarelineError::appointment_not_found(id))?;
            tx.commit().map_err(map_sql_error)?;
            Ok(updated)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute(DELETE_APPOINTMENT_SQL, params![id.to_string()])
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn swap_external_event_id(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new: Option<(&str, Uuid)>,
    ) -> Result<bool> {
        let expected = expected.map(str::to_string);
        let event_id = new.map(|(event_id, _)| event_id.to_string());
        let owner_id = new.map(|(_, owner)| owner.to_string());
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(SWAP_EVENT_ID_SQL, params![event_id, owner_id, id.to_string(), expected])
                .map_err(map_sql_error)?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Why an update touched no row: the appointment is gone or its status moved
/// past the patch's guard.
fn rejected_write(conn: &Connection, id: Uuid, patch: &AppointmentPatch) -> CarelineError {
    match select_appointment(conn, id) {
        Ok(Some(current)) => CarelineError::InvalidTransition {
            from: current.status,
            to: patch.status.unwrap_or(current.status),
        },
        Ok(None) => CarelineError::appointment_not_found(id),
        Err(err) => err,
    }
}

fn select_appointment(conn: &Connection, id: Uuid) -> Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], map_appointment_row)
        .optional()
        .map_err(map_sql_error)
}

fn query_appointments(conn: &Connection, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(from) = filter.from {
        values.push(ts_value(from));
        conditions.push(format!("scheduled_at >= ?{}", values.len()));
    }
    if let Some(to) = filter.to {
        values.push(ts_value(to));
        conditions.push(format!("scheduled_at <= ?{}", values.len()));
    }
    if let Some(professional_id) = filter.professional_id {
        values.push(uuid_value(professional_id));
        conditions.push(format!("professional_id = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(Value::Text(status.to_string()));
        conditions.push(format!("status = ?{}", values.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    values.push(Value::Integer(i64::from(filter.effective_limit())));
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments {where_clause}
         ORDER BY scheduled_at ASC, id ASC LIMIT ?{}",
        values.len()
    );

    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params_from_iter(values), map_appointment_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;
    Ok(rows)
}

fn insert_values(appointment: &Appointment) -> Vec<Value> {
    vec![
        uuid_value(appointment.id),
        uuid_value(appointment.clinic_id),
        opt_uuid_value(appointment.branch_id),
        uuid_value(appointment.patient_id),
        uuid_value(appointment.professional_id),
        opt_uuid_value(appointment.room_id),
        opt_uuid_value(appointment.treatment_id),
        opt_text_value(appointment.treatment_name.clone()),
        opt_uuid_value(appointment.package_session_id),
        ts_value(appointment.scheduled_at),
        Value::Integer(i64::from(appointment.duration_minutes)),
        Value::Integer(i64::from(appointment.buffer_minutes)),
        Value::Text(appointment.status.to_string()),
        opt_ts_value(appointment.status_changed_at),
        opt_uuid_value(appointment.status_changed_by),
        opt_text_value(appointment.cancellation_reason.clone()),
        opt_ts_value(appointment.confirmed_at),
        opt_ts_value(appointment.started_at),
        opt_ts_value(appointment.completed_at),
        opt_text_value(appointment.notes.clone()),
        opt_text_value(appointment.patient_notes.clone()),
        opt_ts_value(appointment.reminder_sent_at),
        opt_ts_value(appointment.confirmation_sent_at),
        Value::Integer(i64::from(appointment.is_recurring)),
        opt_text_value(appointment.recurrence_rule.clone()),
        opt_uuid_value(appointment.parent_appointment_id),
        opt_text_value(appointment.external_calendar_event_id.clone()),
        opt_uuid_value(appointment.external_calendar_owner_id),
        ts_value(appointment.created_at),
        ts_value(appointment.updated_at),
        opt_uuid_value(appointment.created_by),
    ]
}

/// Column/value pairs for every field the patch sets.
fn patch_assignments(patch: &AppointmentPatch) -> Vec<(&'static str, Value)> {
    let mut set = Vec::new();

    if let Some(value) = patch.branch_id {
        set.push(("branch_id", opt_uuid_value(value)));
    }
    if let Some(value) = patch.patient_id {
        set.push(("patient_id", uuid_value(value)));
    }
    if let Some(value) = patch.professional_id {
        set.push(("professional_id", uuid_value(value)));
    }
    if let Some(value) = patch.room_id {
        set.push(("room_id", opt_uuid_value(value)));
    }
    if let Some(value) = patch.treatment_id {
        set.push(("treatment_id", opt_uuid_value(value)));
    }
    if let Some(value) = &patch.treatment_name {
        set.push(("treatment_name", opt_text_value(value.clone())));
    }
    if let Some(value) = patch.package_session_id {
        set.push(("package_session_id", opt_uuid_value(value)));
    }
    if let Some(value) = patch.scheduled_at {
        set.push(("scheduled_at", ts_value(value)));
    }
    if let Some(value) = patch.duration_minutes {
        set.push(("duration_minutes", Value::Integer(i64::from(value))));
    }
    if let Some(value) = patch.buffer_minutes {
        set.push(("buffer_minutes", Value::Integer(i64::from(value))));
    }
    if let Some(value) = patch.status {
        set.push(("status", Value::Text(value.to_string())));
    }
    if let Some(value) = patch.status_changed_at {
        set.push(("status_changed_at", ts_value(value)));
    }
    if let Some(value) = patch.status_changed_by {
        set.push(("status_changed_by", opt_uuid_value(value)));
    }
    if let Some(value) = &patch.cancellation_reason {
        set.push(("cancellation_reason", opt_text_value(value.clone())));
    }
    if let Some(value) = patch.confirmed_at {
        set.push(("confirmed_at", ts_value(value)));
    }
    if let Some(value) = patch.started_at {
        set.push(("started_at", ts_value(value)));
    }
    if let Some(value) = patch.completed_at {
        set.push(("completed_at", ts_value(value)));
    }
    if let Some(value) = &patch.notes {
        set.push(("notes", opt_text_value(value.clone())));
    }
    if let Some(value) = &patch.patient_notes {
        set.push(("patient_notes", opt_text_value(value.clone())));
    }
    if let Some(value) = patch.reminder_sent_at {
        set.push(("reminder_sent_at", ts_value(value)));
    }
    if let Some(value) = patch.confirmation_sent_at {
        set.push(("confirmation_sent_at", ts_value(value)));
    }
    if let Some(value) = patch.is_recurring {
        set.push(("is_recurring", Value::Integer(i64::from(value))));
    }
    if let Some(value) = &patch.recurrence_rule {
        set.push(("recurrence_rule", opt_text_value(value.clone())));
    }
    if let Some(value) = patch.updated_at {
        set.push(("updated_at", ts_value(value)));
    }

    set
}

fn map_appointment_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: read_uuid(row, 0)?,
        clinic_id: read_uuid(row, 1)?,
        branch_id: read_opt_uuid(row, 2)?,
        patient_id: read_uuid(row, 3)?,
        professional_id: read_uuid(row, 4)?,
        room_id: read_opt_uuid(row, 5)?,
        treatment_id: read_opt_uuid(row, 6)?,
        treatment_name: row.get(7)?,
        package_session_id: read_opt_uuid(row, 8)?,
        scheduled_at: read_ts(row, 9)?,
        duration_minutes: row.get(10)?,
        buffer_minutes: row.get(11)?,
        status: read_status(row, 12)?,
        status_changed_at: read_opt_ts(row, 13)?,
        status_changed_by: read_opt_uuid(row, 14)?,
        cancellation_reason: row.get(15)?,
        confirmed_at: read_opt_ts(row, 16)?,
        started_at: read_opt_ts(row, 17)?,
        completed_at: read_opt_ts(row, 18)?,
        notes: row.get(19)?,
        patient_notes: row.get(20)?,
        reminder_sent_at: read_opt_ts(row, 21)?,
        confirmation_sent_at: read_opt_ts(row, 22)?,
        is_recurring: row.get::<_, i64>(23)? != 0,
        recurrence_rule: row.get(24)?,
        parent_appointment_id: read_opt_uuid(row, 25)?,
        external_calendar_event_id: row.get(26)?,
        external_calendar_owner_id: read_opt_uuid(row, 27)?,
        created_at: read_ts(row, 28)?,
        updated_at: read_ts(row, 29)?,
        created_by: read_opt_uuid(row, 30)?,
    })
}

/* -------------------------------------------------------------------------- */
/* Value conversions */
/* -------------------------------------------------------------------------- */

pub(crate) fn uuid_value(id: Uuid) -> Value {
    Value::Text(id.to_string())
}

fn opt_uuid_value(id: Option<Uuid>) -> Value {
    id.map_or(Value::Null, uuid_value)
}

fn opt_text_value(text: Option<String>) -> Value {
    text.map_or(Value::Null, Value::Text)
}

fn ts_value(ts: DateTime<Utc>) -> Value {
    Value::Integer(ts.timestamp_millis())
}

fn opt_ts_value(ts: Option<DateTime<Utc>>) -> Value {
    ts.map_or(Value::Null, ts_value)
}

pub(crate) fn read_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn read_opt_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        Uuid::parse_str(&raw).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
        })
    })
    .transpose()
}

fn read_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    millis_to_datetime(idx, millis)
}

fn read_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = row.get(idx)?;
    millis.map(|millis| millis_to_datetime(idx, millis)).transpose()
}

fn millis_to_datetime(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn read_status(row: &Row<'_>, idx: usize) -> rusqlite::Result<AppointmentStatus> {
    let raw: String = row.get(idx)?;
    raw.parse::<AppointmentStatus>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

pub(crate) fn map_join_error(err: task::JoinError) -> CarelineError {
    if err.is_cancelled() {
        CarelineError::Internal("blocking database task cancelled".into())
    } else {
        CarelineError::Internal(format!("blocking database task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use careline_domain::NewAppointment;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (SqliteAppointmentStore, Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager =
            Arc::new(DbManager::new(temp_dir.path().join("store.db"), 2).expect("manager created"));
        manager.run_migrations().expect("migrations run");
        (SqliteAppointmentStore::new(manager.clone()), manager, temp_dir)
    }

    fn seeded(manager: &DbManager) -> Appointment {
        let conn = manager.get_connection().expect("connection");
        let clinic = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let professional = Uuid::new_v4();
        conn.execute(
            "INSERT INTO patients (id, clinic_id) VALUES (?1, ?2)",
            params![patient.to_string(), clinic.to_string()],
        )
        .expect("patient inserted");
        conn.execute(
            "INSERT INTO professionals (id, clinic_id) VALUES (?1, ?2)",
            params![professional.to_string(), clinic.to_string()],
        )
        .expect("professional inserted");

        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        NewAppointment::new(clinic, patient, professional, start, 45)
            .with_notes("bring x-rays")
            .into_appointment(Uuid::now_v7(), Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_then_get_preserves_every_column() {
        let (store, manager, _temp_dir) = setup();
        let appointment = seeded(&manager);

        store.insert(&appointment).await.expect("insert succeeds");
        let loaded = store.get(appointment.id).await.expect("get succeeds");

        assert_eq!(loaded, Some(appointment));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn swap_only_applies_when_expected_matches() {
        let (store, manager, _temp_dir) = setup();
        let appointment = seeded(&manager);
        store.insert(&appointment).await.unwrap();

        let owner = appointment.professional_id;

        let link = |event_id| Some((event_id, owner));

        assert!(store.swap_external_event_id(appointment.id, None, link("ev_1")).await.unwrap());
        assert!(!store.swap_external_event_id(appointment.id, None, link("ev_2")).await.unwrap());
        let linked = store.get(appointment.id).await.unwrap().unwrap();
        assert_eq!(linked.linked_event(), Some((owner, "ev_1")));
        assert_eq!(linked.external_calendar_owner_id, Some(owner));

        assert!(!store.swap_external_event_id(appointment.id, Some("ev_9"), None).await.unwrap());
        assert!(store.swap_external_event_id(appointment.id, Some("ev_1"), None).await.unwrap());

        let loaded = store.get(appointment.id).await.unwrap().unwrap();
        assert_eq!(loaded.external_calendar_event_id, None);
        assert_eq!(loaded.external_calendar_owner_id, None);
        assert_eq!(loaded.updated_at, appointment.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn guarded_status_write_fails_once_status_moved() {
        let (store, manager, _temp_dir) = setup();
        let appointment = seeded(&manager);
        store.insert(&appointment).await.unwrap();
        let guarded = |from, to| AppointmentPatch {
            expected_status: Some(from),
            status: Some(to),
            ..Default::default()
        };

        let confirmed = store
            .update_fields(
                appointment.id,
                &guarded(AppointmentStatus::Scheduled, AppointmentStatus::Confirmed),
            )
            .await
            .unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let err = store
            .update_fields(
                appointment.id,
                &guarded(AppointmentStatus::Scheduled, AppointmentStatus::Cancelled),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CarelineError::InvalidTransition {
                from: AppointmentStatus::Confirmed,
                to: AppointmentStatus::Cancelled,
            }
        );
        let stored = store.get(appointment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);

        let missing = store
            .update_fields(
                Uuid::new_v4(),
                &guarded(AppointmentStatus::Scheduled, AppointmentStatus::Confirmed),
            )
            .await;
        assert!(matches!(missing, Err(CarelineError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sub_millisecond_creation_time_reads_back_unchanged() {
        let (store, manager, _temp_dir) = setup();
        let template = seeded(&manager);
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let appointment = NewAppointment::new(
            template.clinic_id,
            template.patient_id,
            template.professional_id,
            template.scheduled_at + chrono::Duration::nanoseconds(999),
            45,
        )
        .into_appointment(Uuid::now_v7(), now);

        store.insert(&appointment).await.unwrap();

        assert_eq!(store.get(appointment.id).await.unwrap(), Some(appointment));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_patch_on_missing_row_is_not_found() {
        let (store, _manager, _temp_dir) = setup();

        let err = store.update_fields(Uuid::new_v4(), &AppointmentPatch::default()).await;

        assert!(matches!(err, Err(CarelineError::NotFound(_))));
    }

    #[test]
    fn patch_assignments_cover_only_set_fields() {
        let patch = AppointmentPatch {
            notes: Some(None),
            duration_minutes: Some(30),
            ..Default::default()
        };

        let columns: Vec<_> = patch_assignments(&patch).into_iter().map(|(col, _)| col).collect();
        assert_eq!(columns, vec!["duration_minutes", "notes"]);
    }
}
