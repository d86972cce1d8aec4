use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status given to appointments that arrive without one.
pub const DEFAULT_STATUS: &str = "scheduled";

/// Appointment row as persisted in the local store.
///
/// `start_time`, `end_time` and the bookkeeping timestamps are RFC 3339 UTC
/// strings with millisecond precision, whichever path wrote the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocalAppointment {
    pub id: String,
    pub ghl_appointment_id: Option<String>,
    pub calendar_id: Option<String>,
    pub contact_id: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub appointment_type: Option<String>,
    pub provider_id: Option<String>,
    pub provider_name: Option<String>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub synced_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl LocalAppointment {
    /// A row that has never been acknowledged by the remote calendar.
    pub fn is_unsynced(&self) -> bool {
        self.ghl_appointment_id
            .as_deref()
            .map_or(true, |id| id.trim().is_empty())
    }
}

/// Payload of the `create` action.
///
/// The required fields are optional here so that a missing one surfaces as a
/// validation error naming it rather than a generic decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateAppointmentData {
    pub contact_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type", alias = "appointment_type")]
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub provider_id: Option<String>,
    #[serde(rename = "calendarId", alias = "calendar_id")]
    pub calendar_id: Option<String>,
}

/// Payload of the `update` action. Only the supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateAppointmentData {
    pub contact_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type", alias = "appointment_type")]
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub provider_id: Option<String>,
    #[serde(rename = "calendarId", alias = "calendar_id")]
    pub calendar_id: Option<String>,
}

impl UpdateAppointmentData {
    pub fn is_empty(&self) -> bool {
        self.contact_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.title.is_none()
            && self.status.is_none()
            && self.location.is_none()
            && self.appointment_type.is_none()
            && self.notes.is_none()
            && self.provider_id.is_none()
            && self.calendar_id.is_none()
    }
}

/// Body accepted by the appointment endpoint, discriminated by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AppointmentRequest {
    GetAll,
    Create {
        #[serde(rename = "appointmentData", default)]
        appointment_data: CreateAppointmentData,
        /// Target calendar; may also be given inside `appointmentData`.
        #[serde(rename = "calendarId", default)]
        calendar_id: Option<String>,
    },
    Update {
        #[serde(rename = "appointmentId", default)]
        appointment_id: Option<String>,
        #[serde(rename = "appointmentData", default)]
        appointment_data: UpdateAppointmentData,
    },
    Delete {
        #[serde(rename = "appointmentId", default)]
        appointment_id: Option<String>,
    },
    Sync,
}

impl AppointmentRequest {
    pub const ACTIONS: [&'static str; 5] = ["getAll", "create", "update", "delete", "sync"];

    pub fn action(&self) -> &'static str {
        match self {
            AppointmentRequest::GetAll => "getAll",
            AppointmentRequest::Create { .. } => "create",
            AppointmentRequest::Update { .. } => "update",
            AppointmentRequest::Delete { .. } => "delete",
            AppointmentRequest::Sync => "sync",
        }
    }
}

/// Response of `getAll`. Remote events are passed through with an added
/// `contactName`.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ListAppointmentsResponse {
    #[ts(type = "Array<Record<string, unknown>>")]
    pub appointments: Vec<serde_json::Value>,
    pub local_appointments: Vec<LocalAppointment>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentResponse {
    pub success: bool,
    #[ts(type = "Record<string, unknown>")]
    pub ghl_appointment: serde_json::Value,
    pub local_appointment: Option<LocalAppointment>,
    pub message: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentResponse {
    pub success: bool,
    #[ts(type = "Record<string, unknown>")]
    pub ghl_appointment: serde_json::Value,
    pub local_appointment: Option<LocalAppointment>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeleteAppointmentResponse {
    pub success: bool,
    pub warnings: Vec<String>,
}

/// Aggregate result of a bulk sync. Row-level failures are only counted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SyncAppointmentsResponse {
    pub success: bool,
    pub synced_count: usize,
    pub error_count: usize,
    pub total_events: usize,
}
