//! GoHighLevel calendar API: wire types, failure classification and the
//! `CalendarRemote` seam the gateway talks through.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

use crate::config::GhlCredentials;

pub use client::GhlClient;
pub use error::{classify_failure, GhlError};
pub use types::{
    Calendar, CalendarGroup, EventWindow, RemoteAppointmentPayload, RemoteContact, RemoteEvent,
    RemoteEventWithContactName, RemoteTimestamp,
};

/// Operations the gateway needs from the remote calendar service.
///
/// Every call takes the resolved credentials, so nothing can reach the remote
/// side before configuration has been checked.
#[async_trait]
pub trait CalendarRemote: Send + Sync {
    async fn list_groups(&self, creds: &GhlCredentials) -> Result<Vec<CalendarGroup>, GhlError>;

    /// Calendars of the location, restricted to one group when `group_id` is given.
    async fn list_calendars(
        &self,
        creds: &GhlCredentials,
        group_id: Option<&str>,
    ) -> Result<Vec<Calendar>, GhlError>;

    async fn list_events(
        &self,
        creds: &GhlCredentials,
        calendar_id: &str,
        window: EventWindow,
    ) -> Result<Vec<RemoteEvent>, GhlError>;

    async fn create_appointment(
        &self,
        creds: &GhlCredentials,
        payload: &RemoteAppointmentPayload,
    ) -> Result<RemoteEvent, GhlError>;

    async fn update_appointment(
        &self,
        creds: &GhlCredentials,
        event_id: &str,
        payload: &RemoteAppointmentPayload,
    ) -> Result<RemoteEvent, GhlError>;

    async fn delete_event(&self, creds: &GhlCredentials, event_id: &str) -> Result<(), GhlError>;

    async fn get_contact(
        &self,
        creds: &GhlCredentials,
        contact_id: &str,
    ) -> Result<RemoteContact, GhlError>;
}
