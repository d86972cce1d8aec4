//! Appointment synchronization gateway: the five actions of the appointment
//! endpoint, mediating between the local store and the remote calendar.

pub mod resolver;
pub mod sync;
pub mod translator;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use futures::future::join_all;
use shared_types::{CreateAppointmentData, ErrorResponse, LocalAppointment, UpdateAppointmentData};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{GhlConfig, GhlCredentials, SyncConfig};
use crate::database::appointments as db;
use crate::database::AsyncDbConnection;
use crate::integrations::ghl::{CalendarRemote, GhlError, RemoteEvent, RemoteEventWithContactName};
use resolver::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("{}", invalid_action_message(.0.as_deref()))]
    InvalidAction(Option<String>),

    #[error("{0}")]
    Validation(String),

    #[error("Appointment not found or missing GHL appointment ID")]
    NotFound,

    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Remote(#[from] GhlError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    Internal(String),
}

fn invalid_action_message(action: Option<&str>) -> String {
    match action {
        Some(action) => format!(
            "Invalid action: {}. Expected one of getAll, create, update, delete, sync",
            action
        ),
        None => "Missing action. Expected one of getAll, create, update, delete, sync".to_string(),
    }
}

impl From<ResolveError> for GatewayError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Unresolvable => GatewayError::Configuration(err.to_string()),
            ResolveError::Remote(e) => GatewayError::Remote(e),
        }
    }
}

impl actix_web::error::ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidJson
            | GatewayError::InvalidAction(_)
            | GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Configuration(_)
            | GatewayError::Remote(_)
            | GatewayError::Database(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

fn database_error(e: anyhow::Error) -> GatewayError {
    GatewayError::Database(format!("{:#}", e))
}

/// Primary result plus the non-fatal problems met while producing it.
///
/// A remote write that succeeded is never rolled back because the local write
/// after it failed; that failure is reported here instead.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    fn new(value: T, warnings: Vec<String>) -> Self {
        Self { value, warnings }
    }
}

#[derive(Debug)]
pub struct CreatedAppointment {
    pub remote: RemoteEvent,
    pub local: Option<LocalAppointment>,
}

#[derive(Debug)]
pub struct UpdatedAppointment {
    pub remote: RemoteEvent,
    pub local: Option<LocalAppointment>,
}

#[derive(Debug)]
pub struct AppointmentListing {
    pub remote: Vec<RemoteEventWithContactName>,
    pub local: Vec<LocalAppointment>,
}

pub struct AppointmentGateway {
    db: AsyncDbConnection,
    remote: Arc<dyn CalendarRemote>,
    config: GhlConfig,
    sync: SyncConfig,
}

impl AppointmentGateway {
    pub fn new(
        db: AsyncDbConnection,
        remote: Arc<dyn CalendarRemote>,
        config: GhlConfig,
        sync: SyncConfig,
    ) -> Self {
        Self {
            db,
            remote,
            config,
            sync,
        }
    }

    fn credentials(&self) -> Result<GhlCredentials, GatewayError> {
        self.config.credentials().map_err(|missing| {
            error!("GHL credentials missing: {}", missing);
            GatewayError::Configuration(missing)
        })
    }

    /// Remote events with contact names, alongside every local row.
    pub async fn list_all(&self) -> Result<AppointmentListing, GatewayError> {
        let creds = self.credentials()?;

        let events = self.collect_remote_events(&creds).await?;
        let names = join_all(
            events
                .iter()
                .map(|event| self.contact_name(&creds, event.contact_id.as_deref())),
        )
        .await;

        let remote = events
            .into_iter()
            .zip(names)
            .map(|(event, contact_name)| RemoteEventWithContactName {
                event,
                contact_name,
            })
            .collect();

        let local = db::list_appointments(self.db.clone())
            .await
            .map_err(database_error)?;

        Ok(AppointmentListing { remote, local })
    }

    async fn contact_name(&self, creds: &GhlCredentials, contact_id: Option<&str>) -> String {
        let Some(contact_id) = contact_id.filter(|id| !id.is_empty()) else {
            return translator::UNKNOWN_CONTACT.to_string();
        };

        match self.remote.get_contact(creds, contact_id).await {
            Ok(contact) => translator::contact_display_name(&contact),
            Err(e) => {
                warn!("Failed to look up GHL contact {}: {}", contact_id, e);
                translator::UNKNOWN_CONTACT.to_string()
            }
        }
    }

    /// Create the remote appointment, then record it locally.
    pub async fn create(
        &self,
        data: CreateAppointmentData,
        calendar_id: Option<String>,
    ) -> Result<Outcome<CreatedAppointment>, GatewayError> {
        let creds = self.credentials()?;
        let appointment = translator::validate_create(&data).map_err(GatewayError::Validation)?;

        let explicit = calendar_id.or(data.calendar_id);
        let calendar = resolver::resolve_calendar_id(
            self.remote.as_ref(),
            &creds,
            &self.config,
            explicit.as_deref(),
        )
        .await?;
        info!(
            "Creating GHL appointment for contact {} on calendar {} ({:?})",
            appointment.contact_id, calendar.calendar_id, calendar.source
        );

        let payload =
            translator::create_payload(&appointment, &calendar.calendar_id, &creds.location_id);
        let remote = self.remote.create_appointment(&creds, &payload).await?;

        let remote_id = remote
            .remote_id()
            .map(str::to_string)
            .ok_or_else(|| GhlError::Decode {
                operation: "create appointment".to_string(),
                message: "response carries neither id nor eventId".to_string(),
            })?;

        let now = translator::now_iso();
        let mut row = translator::local_from_create(
            uuid::Uuid::new_v4().to_string(),
            &appointment,
            &remote_id,
            &calendar.calendar_id,
            &now,
        );
        translator::enrich_from_remote(&mut row, &remote);

        let mut warnings = Vec::new();
        let local = match db::insert_appointment(self.db.clone(), &row).await {
            Ok(saved) => Some(saved),
            Err(e) => {
                error!(
                    "GHL appointment {} created but local save failed: {:#}",
                    remote_id, e
                );
                warnings.push(format!(
                    "Appointment created in GHL ({}) but could not be saved locally: {:#}",
                    remote_id, e
                ));
                None
            }
        };

        Ok(Outcome::new(CreatedAppointment { remote, local }, warnings))
    }

    /// Look up the local row and its remote id; absent either, nothing remote is touched.
    async fn synced_row(
        &self,
        appointment_id: Option<&str>,
    ) -> Result<(LocalAppointment, String), GatewayError> {
        let appointment_id = appointment_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::Validation("appointmentId is required".to_string()))?;

        let row = db::get_appointment(self.db.clone(), appointment_id)
            .await
            .map_err(database_error)?
            .ok_or(GatewayError::NotFound)?;

        if row.is_unsynced() {
            return Err(GatewayError::NotFound);
        }
        let remote_id = row.ghl_appointment_id.clone().unwrap_or_default();
        Ok((row, remote_id))
    }

    /// Push the changes to the remote appointment, then apply them locally.
    pub async fn update(
        &self,
        appointment_id: Option<String>,
        data: UpdateAppointmentData,
    ) -> Result<Outcome<UpdatedAppointment>, GatewayError> {
        let creds = self.credentials()?;
        if data.is_empty() {
            return Err(GatewayError::Validation(
                "appointmentData must contain at least one field to update".to_string(),
            ));
        }
        let changes = translator::normalize_update(&data).map_err(GatewayError::Validation)?;
        let payload = translator::update_payload(&changes).map_err(GatewayError::Validation)?;

        let (row, remote_id) = self.synced_row(appointment_id.as_deref()).await?;
        info!("Updating GHL appointment {} (local {})", remote_id, row.id);

        let remote = self
            .remote
            .update_appointment(&creds, &remote_id, &payload)
            .await?;

        let mut warnings = Vec::new();
        let now = translator::now_iso();
        let local = match db::update_appointment(self.db.clone(), &row.id, &changes, &now).await {
            Ok(Some(updated)) => Some(updated),
            Ok(None) => {
                warn!("Local appointment {} disappeared during update", row.id);
                warnings.push(format!(
                    "Appointment updated in GHL but local row {} no longer exists",
                    row.id
                ));
                None
            }
            Err(e) => {
                error!("GHL appointment {} updated but local update failed: {:#}", remote_id, e);
                warnings.push(format!(
                    "Appointment updated in GHL but could not be updated locally: {:#}",
                    e
                ));
                None
            }
        };

        Ok(Outcome::new(UpdatedAppointment { remote, local }, warnings))
    }

    /// Delete the remote event, then the local row.
    pub async fn delete(&self, appointment_id: Option<String>) -> Result<Outcome<()>, GatewayError> {
        let creds = self.credentials()?;
        let (row, remote_id) = self.synced_row(appointment_id.as_deref()).await?;
        info!("Deleting GHL appointment {} (local {})", remote_id, row.id);

        self.remote.delete_event(&creds, &remote_id).await?;

        let mut warnings = Vec::new();
        match db::delete_appointment(self.db.clone(), &row.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Local appointment {} was already removed", row.id);
            }
            Err(e) => {
                error!("GHL appointment {} deleted but local delete failed: {:#}", remote_id, e);
                warnings.push(format!(
                    "Appointment deleted in GHL but could not be removed locally: {:#}",
                    e
                ));
            }
        }

        Ok(Outcome::new((), warnings))
    }
}
