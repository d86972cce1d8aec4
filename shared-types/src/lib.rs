use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod appointment;

pub use appointment::{
    AppointmentRequest, CreateAppointmentData, CreateAppointmentResponse,
    DeleteAppointmentResponse, ListAppointmentsResponse, LocalAppointment,
    SyncAppointmentsResponse, UpdateAppointmentData, UpdateAppointmentResponse, DEFAULT_STATUS,
};

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
