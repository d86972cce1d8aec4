use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::{classify_failure, GhlError};
use super::types::{
    Calendar, CalendarGroup, CalendarsEnvelope, ContactEnvelope, EventWindow, EventsEnvelope,
    GroupsEnvelope, RemoteAppointmentPayload, RemoteContact, RemoteEvent,
};
use super::CalendarRemote;
use crate::config::{GhlConfig, GhlCredentials};

/// reqwest-backed client for the GHL REST API.
pub struct GhlClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl GhlClient {
    pub fn new(config: &GhlConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    fn request(&self, method: Method, path: &str, creds: &GhlCredentials) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&creds.api_key)
            .header("Version", &self.api_version)
            .header("Accept", "application/json")
    }

    /// Send the request and return the body text of a 2xx response.
    async fn send(
        &self,
        operation: &str,
        creds: &GhlCredentials,
        request: RequestBuilder,
    ) -> Result<String, GhlError> {
        let response = request.send().await.map_err(|source| GhlError::Transport {
            operation: operation.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| GhlError::Transport {
            operation: operation.to_string(),
            source,
        })?;

        if !status.is_success() {
            tracing::warn!("GHL {} failed with status {}", operation, status.as_u16());
            return Err(classify_failure(
                operation,
                status.as_u16(),
                &body,
                &creds.location_id,
            ));
        }

        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        creds: &GhlCredentials,
        request: RequestBuilder,
    ) -> Result<T, GhlError> {
        let body = self.send(operation, creds, request).await?;
        serde_json::from_str(&body).map_err(|e| GhlError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CalendarRemote for GhlClient {
    async fn list_groups(&self, creds: &GhlCredentials) -> Result<Vec<CalendarGroup>, GhlError> {
        let request = self
            .request(Method::GET, "/calendars/groups", creds)
            .query(&[("locationId", creds.location_id.as_str())]);

        let envelope: GroupsEnvelope = self.send_json("list calendar groups", creds, request).await?;
        Ok(envelope.groups)
    }

    async fn list_calendars(
        &self,
        creds: &GhlCredentials,
        group_id: Option<&str>,
    ) -> Result<Vec<Calendar>, GhlError> {
        let mut query = vec![("locationId", creds.location_id.as_str())];
        if let Some(group_id) = group_id {
            query.push(("groupId", group_id));
        }
        let request = self.request(Method::GET, "/calendars/", creds).query(&query);

        let envelope: CalendarsEnvelope = self.send_json("list calendars", creds, request).await?;
        Ok(envelope.calendars)
    }

    async fn list_events(
        &self,
        creds: &GhlCredentials,
        calendar_id: &str,
        window: EventWindow,
    ) -> Result<Vec<RemoteEvent>, GhlError> {
        let start = window.start_millis.to_string();
        let end = window.end_millis.to_string();
        let request = self.request(Method::GET, "/calendars/events", creds).query(&[
            ("locationId", creds.location_id.as_str()),
            ("calendarId", calendar_id),
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
        ]);

        let envelope: EventsEnvelope = self.send_json("list events", creds, request).await?;
        Ok(envelope.events)
    }

    async fn create_appointment(
        &self,
        creds: &GhlCredentials,
        payload: &RemoteAppointmentPayload,
    ) -> Result<RemoteEvent, GhlError> {
        let request = self
            .request(Method::POST, "/calendars/events/appointments", creds)
            .json(payload);

        self.send_json("create appointment", creds, request).await
    }

    async fn update_appointment(
        &self,
        creds: &GhlCredentials,
        event_id: &str,
        payload: &RemoteAppointmentPayload,
    ) -> Result<RemoteEvent, GhlError> {
        let path = format!("/calendars/events/appointments/{}", event_id);
        let request = self.request(Method::PUT, &path, creds).json(payload);

        self.send_json("update appointment", creds, request).await
    }

    async fn delete_event(&self, creds: &GhlCredentials, event_id: &str) -> Result<(), GhlError> {
        let path = format!("/calendars/events/{}", event_id);
        let request = self.request(Method::DELETE, &path, creds);

        self.send("delete appointment", creds, request).await?;
        Ok(())
    }

    async fn get_contact(
        &self,
        creds: &GhlCredentials,
        contact_id: &str,
    ) -> Result<RemoteContact, GhlError> {
        let path = format!("/contacts/{}", contact_id);
        let request = self.request(Method::GET, &path, creds);

        let envelope: ContactEnvelope = self.send_json("get contact", creds, request).await?;
        Ok(envelope.contact)
    }
}
