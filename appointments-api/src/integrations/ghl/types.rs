use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Above this an integer timestamp is taken to be in milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGroup {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Event timestamp as the remote sends it: epoch seconds, usually as an
/// integer, sometimes as a numeric or ISO string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteTimestamp {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

impl RemoteTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RemoteTimestamp::Seconds(value) => from_epoch(*value),
            RemoteTimestamp::Fractional(value) => from_epoch(value.floor() as i64),
            RemoteTimestamp::Text(text) => {
                let text = text.trim();
                if let Ok(value) = text.parse::<i64>() {
                    return from_epoch(value);
                }
                if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                    return Some(parsed.with_timezone(&Utc));
                }
                NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }
        }
    }
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Calendar event as returned by the remote API. Unknown fields are kept so
/// the event can be handed back to callers unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<RemoteTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<RemoteTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RemoteEvent {
    /// Remote identifier; create responses use `id` or `eventId` depending on endpoint version.
    pub fn remote_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.event_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// `getAll` element: the remote event plus the resolved contact display name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventWithContactName {
    #[serde(flatten)]
    pub event: RemoteEvent,
    pub contact_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteContact {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Outbound body for appointment create and update. Timestamps are epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAppointmentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<String>,
}

/// Event listing range, epoch milliseconds as the events endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start_millis: i64,
    pub end_millis: i64,
}

impl EventWindow {
    pub fn around(now: DateTime<Utc>, past_days: i64, future_days: i64) -> Self {
        Self {
            start_millis: (now - chrono::Duration::days(past_days)).timestamp_millis(),
            end_millis: (now + chrono::Duration::days(future_days)).timestamp_millis(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupsEnvelope {
    #[serde(default)]
    pub groups: Vec<CalendarGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarsEnvelope {
    #[serde(default)]
    pub calendars: Vec<Calendar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsEnvelope {
    #[serde(default)]
    pub events: Vec<RemoteEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactEnvelope {
    pub contact: RemoteContact,
}
