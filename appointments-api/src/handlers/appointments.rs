use actix_web::{web, HttpResponse};
use shared_types::{
    AppointmentRequest, CreateAppointmentResponse, DeleteAppointmentResponse,
    ListAppointmentsResponse, SyncAppointmentsResponse, UpdateAppointmentResponse,
};
use tracing::{error, info};

use crate::gateway::{AppointmentGateway, GatewayError};

/// Decode the body and check `action` before looking at the payload, so
/// malformed JSON, unknown actions and bad payloads each get their own error.
pub fn parse_request(body: &[u8]) -> Result<AppointmentRequest, GatewayError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| GatewayError::InvalidJson)?;

    match value.get("action").and_then(|a| a.as_str()) {
        Some(action) if AppointmentRequest::ACTIONS.iter().any(|known| *known == action) => {}
        Some(action) => return Err(GatewayError::InvalidAction(Some(action.to_string()))),
        None => return Err(GatewayError::InvalidAction(None)),
    }

    serde_json::from_value(value)
        .map_err(|e| GatewayError::Validation(format!("Invalid request payload: {}", e)))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(value)
        .map_err(|e| GatewayError::Internal(format!("Failed to encode response: {}", e)))
}

async fn dispatch(
    gateway: &AppointmentGateway,
    request: AppointmentRequest,
) -> Result<HttpResponse, GatewayError> {
    match request {
        AppointmentRequest::GetAll => {
            let listing = gateway.list_all().await?;
            let appointments = listing
                .remote
                .into_iter()
                .map(to_json)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(HttpResponse::Ok().json(ListAppointmentsResponse {
                total: appointments.len(),
                appointments,
                local_appointments: listing.local,
            }))
        }
        AppointmentRequest::Create {
            appointment_data,
            calendar_id,
        } => {
            let outcome = gateway.create(appointment_data, calendar_id).await?;
            let message = if outcome.warnings.is_empty() {
                "Appointment created and synced with GHL".to_string()
            } else {
                "Appointment created in GHL; local copy not saved".to_string()
            };

            Ok(HttpResponse::Ok().json(CreateAppointmentResponse {
                success: true,
                ghl_appointment: to_json(&outcome.value.remote)?,
                local_appointment: outcome.value.local,
                message,
                warnings: outcome.warnings,
            }))
        }
        AppointmentRequest::Update {
            appointment_id,
            appointment_data,
        } => {
            let outcome = gateway.update(appointment_id, appointment_data).await?;

            Ok(HttpResponse::Ok().json(UpdateAppointmentResponse {
                success: true,
                ghl_appointment: to_json(&outcome.value.remote)?,
                local_appointment: outcome.value.local,
                warnings: outcome.warnings,
            }))
        }
        AppointmentRequest::Delete { appointment_id } => {
            let outcome = gateway.delete(appointment_id).await?;

            Ok(HttpResponse::Ok().json(DeleteAppointmentResponse {
                success: true,
                warnings: outcome.warnings,
            }))
        }
        AppointmentRequest::Sync => {
            let report = gateway.sync().await?;

            Ok(HttpResponse::Ok().json(SyncAppointmentsResponse {
                success: true,
                synced_count: report.synced_count,
                error_count: report.error_count,
                total_events: report.total_events,
            }))
        }
    }
}

pub async fn handle_appointments(
    gateway: web::Data<AppointmentGateway>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let request = parse_request(&body)?;
    let action = request.action();
    info!("Appointment action: {}", action);

    dispatch(gateway.get_ref(), request).await.map_err(|e| {
        error!("Appointment action {} failed: {}", action, e);
        e
    })
}

/// Plain `OPTIONS` requests; CORS preflights are answered by the middleware.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}
