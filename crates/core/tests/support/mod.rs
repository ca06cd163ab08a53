//! Shared test helpers for `careline-core` integration tests.
//!
//! In-memory implementations of every core port so lifecycle and sync tests
//! can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use careline_core::{
    AppointmentService, AppointmentStore, CalendarAdapter, CalendarSyncOrchestrator, FixedClock,
    NameResolver, PartyDirectory, SyncDispatcher,
};
use careline_domain::{
    Appointment, AppointmentFilter, AppointmentPatch, CalendarEventPayload, CarelineError,
    NewAppointment, PersonName, Result, SyncJob, SyncOutcome,
};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

// ============================================================================
// Appointment store
// ============================================================================

/// In-memory `AppointmentStore` with optional failure injection.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    rows: Mutex<HashMap<Uuid, Appointment>>,
    fail_writes: Mutex<bool>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn row(&self, id: Uuid) -> Option<Appointment> {
        self.rows.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Make every subsequent write fail with a database error.
    pub fn fail_writes(&self) {
        *self.fail_writes.lock() = true;
    }

    pub fn apply(&self, id: Uuid, patch: &AppointmentPatch) {
        if let Some(row) = self.rows.lock().get_mut(&id) {
            patch.apply_to(row);
        }
    }

    /// Set the external link directly, as a completed create would.
    pub fn link(&self, id: Uuid, event_id: &str) {
        if let Some(row) = self.rows.lock().get_mut(&id) {
            row.external_calendar_event_id = Some(event_id.to_string());
        }
    }

    pub fn remove(&self, id: Uuid) {
        self.rows.lock().remove(&id);
    }

    fn check_writable(&self) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(CarelineError::Database("disk I/O error".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.row(id))
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut rows: Vec<_> =
            self.rows.lock().values().filter(|row| filter.matches(row)).cloned().collect();
        rows.sort_by_key(|row| row.scheduled_at);
        rows.truncate(filter.effective_limit() as usize);
        Ok(rows)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<()> {
        self.check_writable()?;
        let mut rows = self.rows.lock();
        if rows.contains_key(&appointment.id) {
            return Err(CarelineError::Database("UNIQUE constraint violation".into()));
        }
        rows.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update_fields(&self, id: Uuid, patch: &AppointmentPatch) -> Result<Appointment> {
        self.check_writable()?;
        let mut rows = self.rows.lock();
        let row = rows.get_mut(&id).ok_or_else(|| CarelineError::appointment_not_found(id))?;
        if !patch.guard_holds(row) {
            return Err(CarelineError::InvalidTransition {
                from: row.status,
                to: patch.status.unwrap_or(row.status),
            });
        }
        patch.apply_to(row);
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.check_writable()?;
        Ok(self.rows.lock().remove(&id).is_some())
    }

    async fn swap_external_event_id(
        &self,
        id: Uuid,
        expected: Option<&str>,
        new: Option<(&str, Uuid)>,
    ) -> Result<bool> {
        let mut rows = self.rows.lock();
        match rows.get_mut(&id) {
            Some(row) if row.external_calendar_event_id.as_deref() == expected => {
                row.external_calendar_event_id = new.map(|(event_id, _)| event_id.to_string());
                row.external_calendar_owner_id = new.map(|(_, owner)| owner);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ============================================================================
// Calendar adapter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCall {
    IsConnected(Uuid),
    Create(Uuid, CalendarEventPayload),
    Update(Uuid, String, CalendarEventPayload),
    Delete(Uuid, String),
}

/// Store mutation performed while `create_event` is in flight.
pub enum Interference {
    Patch(Uuid, AppointmentPatch),
    Remove(Uuid),
}

/// Scripted `CalendarAdapter` that records every call.
#[derive(Default)]
pub struct ScriptedCalendar {
    connected: Mutex<HashSet<Uuid>>,
    event_ids: Mutex<VecDeque<String>>,
    failing: Mutex<HashSet<&'static str>>,
    hang: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<CalendarCall>>,
    counter: Mutex<u32>,
    interference: Mutex<Option<(Arc<InMemoryAppointmentStore>, Interference)>>,
}

impl ScriptedCalendar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect(&self, professional_id: Uuid) {
        self.connected.lock().insert(professional_id);
    }

    pub fn disconnect(&self, professional_id: Uuid) {
        self.connected.lock().remove(&professional_id);
    }

    /// Ids returned by upcoming `create_event` calls, in order.
    pub fn next_event_ids(&self, ids: &[&str]) {
        self.event_ids.lock().extend(ids.iter().map(|id| (*id).to_string()));
    }

    /// Make `operation` (`"is_connected"`, `"create_event"`, ...) fail.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    pub fn heal(&self, operation: &'static str) {
        self.failing.lock().remove(operation);
    }

    /// Make `operation` hang far beyond any test timeout.
    pub fn hang(&self, operation: &'static str) {
        self.hang.lock().insert(operation);
    }

    pub fn interfere_during_create(
        &self,
        store: Arc<InMemoryAppointmentStore>,
        interference: Interference,
    ) {
        *self.interference.lock() = Some((store, interference));
    }

    pub fn calls(&self) -> Vec<CalendarCall> {
        self.calls.lock().clone()
    }

    /// Calls other than `is_connected`.
    pub fn mutations(&self) -> Vec<CalendarCall> {
        self.calls().into_iter().filter(|call| !matches!(call, CalendarCall::IsConnected(_))).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn enter(&self, operation: &'static str, call: CalendarCall) -> Result<()> {
        self.calls.lock().push(call);
        let hangs = self.hang.lock().contains(operation);
        if hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let fails = self.failing.lock().contains(operation);
        if fails {
            return Err(CarelineError::Network(format!("{operation}: connection refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarAdapter for ScriptedCalendar {
    async fn is_connected(&self, professional_id: Uuid) -> Result<bool> {
        self.enter("is_connected", CalendarCall::IsConnected(professional_id)).await?;
        Ok(self.connected.lock().contains(&professional_id))
    }

    async fn create_event(
        &self,
        professional_id: Uuid,
        payload: &CalendarEventPayload,
    ) -> Result<String> {
        self.enter("create_event", CalendarCall::Create(professional_id, payload.clone())).await?;

        let pending = self.interference.lock().take();
        if let Some((store, interference)) = pending {
            match interference {
                Interference::Patch(id, patch) => store.apply(id, &patch),
                Interference::Remove(id) => store.remove(id),
            }
        }

        let scripted = self.event_ids.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| {
            let mut counter = self.counter.lock();
            *counter += 1;
            format!("ev_auto_{counter}")
        }))
    }

    async fn update_event(
        &self,
        professional_id: Uuid,
        event_id: &str,
        payload: &CalendarEventPayload,
    ) -> Result<()> {
        self.enter(
            "update_event",
            CalendarCall::Update(professional_id, event_id.to_string(), payload.clone()),
        )
        .await
    }

    async fn delete_event(&self, professional_id: Uuid, event_id: &str) -> Result<()> {
        self.enter("delete_event", CalendarCall::Delete(professional_id, event_id.to_string()))
            .await
    }
}

// ============================================================================
// Party directory
// ============================================================================

#[derive(Default)]
pub struct StaticDirectory {
    patients: Mutex<HashMap<Uuid, PersonName>>,
    professionals: Mutex<HashMap<Uuid, PersonName>>,
    treatments: Mutex<HashMap<Uuid, String>>,
    broken: Mutex<bool>,
}

impl StaticDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_patient(&self, id: Uuid, name: PersonName) {
        self.patients.lock().insert(id, name);
    }

    pub fn add_professional(&self, id: Uuid, name: PersonName) {
        self.professionals.lock().insert(id, name);
    }

    pub fn add_treatment(&self, id: Uuid, name: &str) {
        self.treatments.lock().insert(id, name.to_string());
    }

    /// Make every lookup fail.
    pub fn break_lookups(&self) {
        *self.broken.lock() = true;
    }

    fn check(&self) -> Result<()> {
        if *self.broken.lock() {
            return Err(CarelineError::Database("directory unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PartyDirectory for StaticDirectory {
    async fn patient(&self, id: Uuid) -> Result<Option<PersonName>> {
        self.check()?;
        Ok(self.patients.lock().get(&id).cloned())
    }

    async fn professional(&self, id: Uuid) -> Result<Option<PersonName>> {
        self.check()?;
        Ok(self.professionals.lock().get(&id).cloned())
    }

    async fn treatment_name(&self, id: Uuid) -> Result<Option<String>> {
        self.check()?;
        Ok(self.treatments.lock().get(&id).cloned())
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Collects dispatched jobs so tests can run them explicitly.
#[derive(Default)]
pub struct RecordingDispatcher {
    jobs: Mutex<Vec<SyncJob>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn jobs(&self) -> Vec<SyncJob> {
        self.jobs.lock().clone()
    }

    pub fn take(&self) -> Vec<SyncJob> {
        std::mem::take(&mut *self.jobs.lock())
    }
}

impl SyncDispatcher for RecordingDispatcher {
    fn dispatch(&self, job: SyncJob) {
        self.jobs.lock().push(job);
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

/// Service, orchestrator and mocks wired together.
pub struct Harness {
    pub store: Arc<InMemoryAppointmentStore>,
    pub calendar: Arc<ScriptedCalendar>,
    pub directory: Arc<StaticDirectory>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub clock: Arc<FixedClock>,
    pub service: AppointmentService,
    pub orchestrator: CalendarSyncOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryAppointmentStore::new();
        let calendar = ScriptedCalendar::new();
        let directory = StaticDirectory::new();
        let dispatcher = RecordingDispatcher::new();
        let clock = Arc::new(FixedClock::new(at(2024, 1, 10, 8, 0)));

        let service = AppointmentService::new(store.clone(), dispatcher.clone())
            .with_clock(clock.clone());
        let orchestrator = CalendarSyncOrchestrator::new(
            store.clone(),
            calendar.clone(),
            NameResolver::new(directory.clone()),
        )
        .with_adapter_timeout(Duration::from_millis(200));

        Self { store, calendar, directory, dispatcher, clock, service, orchestrator }
    }

    /// A one-hour booking on 2024-01-15 09:00 with fresh party ids.
    pub fn booking(&self) -> NewAppointment {
        NewAppointment::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), at(2024, 1, 15, 9, 0), 60)
    }

    /// Run every pending job, in dispatch order.
    pub async fn drain(&self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        for job in self.dispatcher.take() {
            outcomes.push(self.orchestrator.run(job).await);
        }
        outcomes
    }
}
