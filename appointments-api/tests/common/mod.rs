#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::web;
use appointments_api::config::{GhlConfig, GhlCredentials, SyncConfig};
use appointments_api::database::AsyncDbConnection;
use appointments_api::integrations::ghl::{
    classify_failure, Calendar, CalendarGroup, CalendarRemote, EventWindow, GhlError,
    RemoteAppointmentPayload, RemoteContact, RemoteEvent, RemoteTimestamp,
};
use appointments_api::{AppointmentGateway, Database};
use async_trait::async_trait;

/// In-process stand-in for the GHL calendar API. Records every call it serves.
#[derive(Default)]
pub struct FakeRemote {
    pub groups: Vec<CalendarGroup>,
    /// Calendars per group id; the empty key holds ungrouped calendars.
    pub calendars: HashMap<String, Vec<Calendar>>,
    pub events: HashMap<String, Vec<RemoteEvent>>,
    pub contacts: HashMap<String, RemoteContact>,
    /// Operation name to the HTTP status and body it fails with.
    pub failures: HashMap<&'static str, (u16, String)>,
    /// SQL run against the store while a remote update or delete is in flight.
    after_write: Mutex<Option<(AsyncDbConnection, &'static str)>>,
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<RemoteAppointmentPayload>>,
    updated: Mutex<Vec<(String, RemoteAppointmentPayload)>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn with_group(mut self, group_id: &str, calendar_ids: &[&str]) -> Self {
        self.groups.push(CalendarGroup {
            id: group_id.to_string(),
            name: Some(format!("Group {group_id}")),
        });
        self.with_calendars(group_id, calendar_ids)
    }

    pub fn with_calendars(mut self, group_id: &str, calendar_ids: &[&str]) -> Self {
        let calendars = calendar_ids
            .iter()
            .map(|id| Calendar {
                id: id.to_string(),
                name: None,
                group_id: Some(group_id.to_string()).filter(|g| !g.is_empty()),
            })
            .collect();
        self.calendars.insert(group_id.to_string(), calendars);
        self
    }

    pub fn with_events(mut self, calendar_id: &str, events: Vec<RemoteEvent>) -> Self {
        self.events.insert(calendar_id.to_string(), events);
        self
    }

    pub fn with_contact(mut self, id: &str, first: Option<&str>, last: Option<&str>, email: Option<&str>) -> Self {
        self.contacts.insert(
            id.to_string(),
            RemoteContact {
                id: Some(id.to_string()),
                first_name: first.map(str::to_string),
                last_name: last.map(str::to_string),
                email: email.map(str::to_string),
                phone: None,
            },
        );
        self
    }

    pub fn failing(self, operation: &'static str, status: u16) -> Self {
        self.failing_with(operation, status, r#"{"message":"simulated failure"}"#)
    }

    pub fn failing_with(mut self, operation: &'static str, status: u16, body: &str) -> Self {
        self.failures.insert(operation, (status, body.to_string()));
        self
    }

    /// Run `sql` on the store after the next successful remote update or delete.
    pub fn execute_after_write(&self, conn: AsyncDbConnection, sql: &'static str) {
        *self.after_write.lock().unwrap() = Some((conn, sql));
    }

    async fn run_after_write(&self) {
        let pending = self.after_write.lock().unwrap().take();
        if let Some((conn, sql)) = pending {
            let conn = conn.lock().await.unwrap();
            conn.execute_batch(sql).unwrap();
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<RemoteAppointmentPayload> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(String, RemoteAppointmentPayload)> {
        self.updated.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, detail: &str) -> Result<(), GhlError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{detail}"));
        match self.failures.get(operation) {
            Some((status, body)) => Err(classify_failure(operation, *status, body, "loc-1")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalendarRemote for FakeRemote {
    async fn list_groups(&self, _: &GhlCredentials) -> Result<Vec<CalendarGroup>, GhlError> {
        self.record("list_groups", "")?;
        Ok(self.groups.clone())
    }

    async fn list_calendars(
        &self,
        _: &GhlCredentials,
        group_id: Option<&str>,
    ) -> Result<Vec<Calendar>, GhlError> {
        let group_id = group_id.unwrap_or_default();
        self.record("list_calendars", group_id)?;
        Ok(self.calendars.get(group_id).cloned().unwrap_or_default())
    }

    async fn list_events(
        &self,
        _: &GhlCredentials,
        calendar_id: &str,
        _: EventWindow,
    ) -> Result<Vec<RemoteEvent>, GhlError> {
        self.record("list_events", calendar_id)?;
        Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
    }

    async fn create_appointment(
        &self,
        _: &GhlCredentials,
        payload: &RemoteAppointmentPayload,
    ) -> Result<RemoteEvent, GhlError> {
        self.record("create_appointment", payload.calendar_id.as_deref().unwrap_or_default())?;
        let mut created = self.created.lock().unwrap();
        created.push(payload.clone());

        Ok(RemoteEvent {
            id: Some(format!("evt-{}", created.len())),
            calendar_id: payload.calendar_id.clone(),
            contact_id: payload.contact_id.clone(),
            start_time: payload.start_time.map(RemoteTimestamp::Seconds),
            end_time: payload.end_time.map(RemoteTimestamp::Seconds),
            title: payload.title.clone(),
            appointment_status: payload.appointment_status.clone(),
            ..Default::default()
        })
    }

    async fn update_appointment(
        &self,
        _: &GhlCredentials,
        event_id: &str,
        payload: &RemoteAppointmentPayload,
    ) -> Result<RemoteEvent, GhlError> {
        self.record("update_appointment", event_id)?;
        self.updated
            .lock()
            .unwrap()
            .push((event_id.to_string(), payload.clone()));
        self.run_after_write().await;

        Ok(RemoteEvent {
            id: Some(event_id.to_string()),
            title: payload.title.clone(),
            appointment_status: payload.appointment_status.clone(),
            ..Default::default()
        })
    }

    async fn delete_event(&self, _: &GhlCredentials, event_id: &str) -> Result<(), GhlError> {
        self.record("delete_event", event_id)?;
        self.deleted.lock().unwrap().push(event_id.to_string());
        self.run_after_write().await;
        Ok(())
    }

    async fn get_contact(&self, _: &GhlCredentials, contact_id: &str) -> Result<RemoteContact, GhlError> {
        self.record("get_contact", contact_id)?;
        self.contacts
            .get(contact_id)
            .cloned()
            .ok_or_else(|| classify_failure("get contact", 404, "Contact not found", "loc-1"))
    }
}

pub fn event(id: &str, calendar_id: &str, contact_id: Option<&str>, start: i64, end: i64) -> RemoteEvent {
    RemoteEvent {
        id: Some(id.to_string()),
        calendar_id: Some(calendar_id.to_string()),
        contact_id: contact_id.map(str::to_string),
        start_time: Some(RemoteTimestamp::Seconds(start)),
        end_time: Some(RemoteTimestamp::Seconds(end)),
        title: Some(format!("Event {id}")),
        appointment_status: Some("confirmed".to_string()),
        ..Default::default()
    }
}

pub fn configured() -> GhlConfig {
    GhlConfig {
        api_key: Some("pit-test".to_string()),
        location_id: Some("loc-1".to_string()),
        ..Default::default()
    }
}

/// Gateway wired to an in-memory store and a fake remote.
pub struct Harness {
    pub db: Arc<Database>,
    pub remote: Arc<FakeRemote>,
    pub gateway: web::Data<AppointmentGateway>,
}

impl Harness {
    pub fn new(remote: FakeRemote) -> Self {
        Self::with_config(remote, configured())
    }

    pub fn with_config(remote: FakeRemote, ghl: GhlConfig) -> Self {
        let db = Arc::new(Database::in_memory().unwrap());
        let remote = Arc::new(remote);
        let gateway = web::Data::new(AppointmentGateway::new(
            db.async_connection.clone(),
            remote.clone(),
            ghl,
            SyncConfig::default(),
        ));

        Self { db, remote, gateway }
    }

    pub fn db_data(&self) -> web::Data<Arc<Database>> {
        web::Data::new(self.db.clone())
    }
}

/// Service with the production routes and middleware around a [`Harness`].
#[macro_export]
macro_rules! init_app {
    ($harness:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(appointments_api::handlers::cors())
                .wrap(appointments_api::handlers::cors_headers())
                .app_data($harness.gateway.clone())
                .app_data($harness.db_data())
                .configure(appointments_api::handlers::configure),
        )
        .await
    };
}
