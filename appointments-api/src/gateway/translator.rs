//! Field mapping between local appointment rows and remote calendar events.
//!
//! Locally every instant is an RFC 3339 UTC string with millisecond precision;
//! remotely it is whole epoch seconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use shared_types::{CreateAppointmentData, LocalAppointment, UpdateAppointmentData, DEFAULT_STATUS};

use crate::integrations::ghl::{RemoteAppointmentPayload, RemoteContact, RemoteEvent};

pub const UNKNOWN_CONTACT: &str = "Unknown Contact";
pub const DEFAULT_TITLE: &str = "Appointment";

/// Canonical local form of an instant.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso() -> String {
    format_instant(Utc::now())
}

/// Parse an ISO-8601 timestamp. Values without an offset are read as UTC,
/// a bare date as UTC midnight.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("Invalid ISO-8601 timestamp: {}", value))
}

/// `floor(parse(iso) / 1000)`: whole seconds, rounding towards negative infinity.
pub fn iso_to_unix_seconds(value: &str) -> Result<i64, String> {
    parse_instant(value).map(|instant| instant.timestamp())
}

pub fn normalize_iso(value: &str) -> Result<String, String> {
    parse_instant(value).map(format_instant)
}

/// A `create` payload that passed validation, with instants already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCreate {
    pub contact_id: String,
    pub start_time: String,
    pub end_time: String,
    pub start_seconds: i64,
    pub end_seconds: i64,
    pub title: String,
    pub status: String,
    pub location: Option<String>,
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub provider_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn validate_create(data: &CreateAppointmentData) -> Result<ValidatedCreate, String> {
    let contact_id = present(&data.contact_id);
    let start_time = present(&data.start_time);
    let end_time = present(&data.end_time);

    let missing: Vec<&str> = [
        ("contact_id", contact_id.is_none()),
        ("start_time", start_time.is_none()),
        ("end_time", end_time.is_none()),
    ]
    .iter()
    .filter(|(_, absent)| *absent)
    .map(|(name, _)| *name)
    .collect();

    if !missing.is_empty() {
        return Err(format!("Missing required fields: {}", missing.join(", ")));
    }

    let (Some(contact_id), Some(start_raw), Some(end_raw)) = (contact_id, start_time, end_time)
    else {
        return Err("Missing required fields: contact_id, start_time, end_time".to_string());
    };

    let start = parse_instant(&start_raw).map_err(|e| format!("start_time: {}", e))?;
    let end = parse_instant(&end_raw).map_err(|e| format!("end_time: {}", e))?;

    Ok(ValidatedCreate {
        contact_id,
        start_time: format_instant(start),
        end_time: format_instant(end),
        start_seconds: start.timestamp(),
        end_seconds: end.timestamp(),
        title: present(&data.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        status: present(&data.status).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        location: present(&data.location),
        appointment_type: present(&data.appointment_type),
        notes: present(&data.notes),
        provider_id: present(&data.provider_id),
    })
}

pub fn create_payload(
    appointment: &ValidatedCreate,
    calendar_id: &str,
    location_id: &str,
) -> RemoteAppointmentPayload {
    RemoteAppointmentPayload {
        calendar_id: Some(calendar_id.to_string()),
        location_id: Some(location_id.to_string()),
        contact_id: Some(appointment.contact_id.clone()),
        start_time: Some(appointment.start_seconds),
        end_time: Some(appointment.end_seconds),
        title: Some(appointment.title.clone()),
        appointment_status: Some(appointment.status.clone()),
        address: appointment.location.clone(),
        notes: appointment.notes.clone(),
        assigned_user_id: appointment.provider_id.clone(),
    }
}

/// Row stored after a successful remote create.
pub fn local_from_create(
    id: String,
    appointment: &ValidatedCreate,
    remote_id: &str,
    calendar_id: &str,
    now: &str,
) -> LocalAppointment {
    LocalAppointment {
        id,
        ghl_appointment_id: Some(remote_id.to_string()),
        calendar_id: Some(calendar_id.to_string()),
        contact_id: Some(appointment.contact_id.clone()),
        title: Some(appointment.title.clone()),
        notes: appointment.notes.clone(),
        location: appointment.location.clone(),
        start_time: appointment.start_time.clone(),
        end_time: appointment.end_time.clone(),
        status: appointment.status.clone(),
        appointment_type: appointment.appointment_type.clone(),
        provider_id: appointment.provider_id.clone(),
        provider_name: None,
        patient_name: None,
        patient_email: None,
        patient_phone: None,
        synced_at: Some(now.to_string()),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}

/// Copy display fields the remote happened to include in its response.
pub fn enrich_from_remote(local: &mut LocalAppointment, remote: &RemoteEvent) {
    let text = |key: &str| {
        remote
            .extra
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };

    if let Some(contact) = remote.extra.get("contact") {
        let contact: RemoteContact = serde_json::from_value(contact.clone()).unwrap_or_default();
        local.patient_name = local.patient_name.take().or_else(|| contact_full_name(&contact));
        local.patient_email = local.patient_email.take().or(contact.email);
        local.patient_phone = local.patient_phone.take().or(contact.phone);
    }
    local.provider_name = local.provider_name.take().or_else(|| text("assignedUserName"));
}

/// Local changes for `update`, with any supplied instants normalised.
pub fn normalize_update(data: &UpdateAppointmentData) -> Result<UpdateAppointmentData, String> {
    let mut changes = data.clone();
    if let Some(start) = &data.start_time {
        changes.start_time = Some(normalize_iso(start).map_err(|e| format!("start_time: {}", e))?);
    }
    if let Some(end) = &data.end_time {
        changes.end_time = Some(normalize_iso(end).map_err(|e| format!("end_time: {}", e))?);
    }
    Ok(changes)
}

/// Remote body for `update`; expects the output of [`normalize_update`].
pub fn update_payload(changes: &UpdateAppointmentData) -> Result<RemoteAppointmentPayload, String> {
    let seconds = |value: &Option<String>| value.as_deref().map(iso_to_unix_seconds).transpose();

    Ok(RemoteAppointmentPayload {
        calendar_id: changes.calendar_id.clone(),
        location_id: None,
        contact_id: changes.contact_id.clone(),
        start_time: seconds(&changes.start_time)?,
        end_time: seconds(&changes.end_time)?,
        title: changes.title.clone(),
        appointment_status: changes.status.clone(),
        address: changes.location.clone(),
        notes: changes.notes.clone(),
        assigned_user_id: changes.provider_id.clone(),
    })
}

/// Local shape of a remote event, used by `sync`. `id` is only kept when the
/// row is newly inserted.
pub fn remote_to_local(id: String, event: &RemoteEvent, now: &str) -> Result<LocalAppointment, String> {
    let remote_id = event
        .remote_id()
        .ok_or_else(|| "Remote event has no id".to_string())?;

    let instant = |label: &str, value: &Option<crate::integrations::ghl::RemoteTimestamp>| {
        value
            .as_ref()
            .and_then(|ts| ts.to_datetime())
            .map(format_instant)
            .ok_or_else(|| format!("Remote event {} has no usable {}", remote_id, label))
    };

    let mut local = LocalAppointment {
        id,
        ghl_appointment_id: Some(remote_id.to_string()),
        calendar_id: event.calendar_id.clone(),
        contact_id: event.contact_id.clone(),
        title: event.title.clone(),
        notes: event.notes.clone(),
        location: event.address.clone(),
        start_time: instant("startTime", &event.start_time)?,
        end_time: instant("endTime", &event.end_time)?,
        status: event
            .appointment_status
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        appointment_type: None,
        provider_id: event.assigned_user_id.clone(),
        provider_name: None,
        patient_name: None,
        patient_email: None,
        patient_phone: None,
        synced_at: Some(now.to_string()),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };
    enrich_from_remote(&mut local, event);

    Ok(local)
}

fn contact_full_name(contact: &RemoteContact) -> Option<String> {
    let name = format!(
        "{} {}",
        contact.first_name.as_deref().unwrap_or(""),
        contact.last_name.as_deref().unwrap_or("")
    );
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// `firstName lastName`, else the email, else "Unknown Contact".
pub fn contact_display_name(contact: &RemoteContact) -> String {
    contact_full_name(contact)
        .or_else(|| present(&contact.email))
        .unwrap_or_else(|| UNKNOWN_CONTACT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::ghl::RemoteTimestamp;

    fn create_data() -> CreateAppointmentData {
        CreateAppointmentData {
            contact_id: Some("c1".to_string()),
            start_time: Some("2025-01-01T09:00:00Z".to_string()),
            end_time: Some("2025-01-01T09:30:00Z".to_string()),
            title: Some("Checkup".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_iso_to_unix_seconds() {
        assert_eq!(iso_to_unix_seconds("2024-01-15T14:30:00.000Z"), Ok(1705329000));
        assert_eq!(iso_to_unix_seconds("2025-01-01T09:00:00Z"), Ok(1735722000));
        assert_eq!(iso_to_unix_seconds("2025-01-01T09:30:00Z"), Ok(1735723800));
        // Sub-second precision is floored
        assert_eq!(iso_to_unix_seconds("2024-01-15T14:30:00.999Z"), Ok(1705329000));
        assert_eq!(iso_to_unix_seconds("1969-12-31T23:59:59.500Z"), Ok(-1));
        assert!(iso_to_unix_seconds("next tuesday").is_err());
    }

    #[test]
    fn test_normalize_iso() {
        assert_eq!(
            normalize_iso("2025-01-01T10:00:00+01:00").unwrap(),
            "2025-01-01T09:00:00.000Z"
        );
        assert_eq!(
            normalize_iso("2025-01-01T09:00:00").unwrap(),
            "2025-01-01T09:00:00.000Z"
        );
    }

    #[test]
    fn test_date_only_is_utc_midnight() {
        assert_eq!(normalize_iso("2025-01-01").unwrap(), "2025-01-01T00:00:00.000Z");
        assert_eq!(iso_to_unix_seconds("2025-01-01"), Ok(1735689600));
        assert!(parse_instant("2025-13-01").is_err());
    }

    #[test]
    fn test_validate_create_defaults() {
        let validated = validate_create(&CreateAppointmentData {
            title: None,
            ..create_data()
        })
        .unwrap();

        assert_eq!(validated.status, "scheduled");
        assert_eq!(validated.title, DEFAULT_TITLE);
        assert_eq!(validated.start_seconds, 1735722000);
        assert_eq!(validated.end_seconds, 1735723800);
        assert_eq!(validated.start_time, "2025-01-01T09:00:00.000Z");
    }

    #[test]
    fn test_validate_create_names_missing_fields() {
        let err = validate_create(&CreateAppointmentData {
            contact_id: Some("  ".to_string()),
            end_time: None,
            ..create_data()
        })
        .unwrap_err();
        assert_eq!(err, "Missing required fields: contact_id, end_time");

        let err = validate_create(&CreateAppointmentData {
            start_time: Some("tomorrow".to_string()),
            ..create_data()
        })
        .unwrap_err();
        assert!(err.starts_with("start_time: Invalid ISO-8601 timestamp"));
    }

    #[test]
    fn test_create_payload_maps_fields() {
        let validated = validate_create(&CreateAppointmentData {
            location: Some("Suite 4".to_string()),
            status: Some("confirmed".to_string()),
            provider_id: Some("user-7".to_string()),
            ..create_data()
        })
        .unwrap();

        let payload = create_payload(&validated, "cal-1", "loc-1");
        let body = serde_json::to_value(&payload).unwrap();

        assert_eq!(body["calendarId"], "cal-1");
        assert_eq!(body["locationId"], "loc-1");
        assert_eq!(body["contactId"], "c1");
        assert_eq!(body["startTime"], 1735722000);
        assert_eq!(body["endTime"], 1735723800);
        assert_eq!(body["appointmentStatus"], "confirmed");
        assert_eq!(body["address"], "Suite 4");
        assert_eq!(body["assignedUserId"], "user-7");
        assert!(body.get("notes").is_none());
    }

    #[test]
    fn test_update_payload_only_carries_changes() {
        let changes = normalize_update(&UpdateAppointmentData {
            start_time: Some("2024-01-15T14:30:00.000Z".to_string()),
            status: Some("cancelled".to_string()),
            ..Default::default()
        })
        .unwrap();
        let payload = update_payload(&changes).unwrap();

        assert_eq!(payload.start_time, Some(1705329000));
        assert_eq!(payload.end_time, None);
        assert_eq!(payload.appointment_status.as_deref(), Some("cancelled"));
        assert_eq!(payload.title, None);
        assert_eq!(payload.location_id, None);

        assert!(normalize_update(&UpdateAppointmentData {
            end_time: Some("later".to_string()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_remote_to_local_uses_canonical_instants() {
        let event = RemoteEvent {
            id: Some("ev-1".to_string()),
            calendar_id: Some("cal-1".to_string()),
            contact_id: Some("c1".to_string()),
            start_time: Some(RemoteTimestamp::Seconds(1705329000)),
            end_time: Some(RemoteTimestamp::Seconds(1705330800)),
            address: Some("Room 1".to_string()),
            assigned_user_id: Some("user-1".to_string()),
            ..Default::default()
        };

        let local = remote_to_local("local-1".to_string(), &event, "2025-01-01T00:00:00.000Z").unwrap();

        assert_eq!(local.ghl_appointment_id.as_deref(), Some("ev-1"));
        assert_eq!(local.start_time, "2024-01-15T14:30:00.000Z");
        assert_eq!(local.end_time, "2024-01-15T15:00:00.000Z");
        assert_eq!(local.status, "scheduled");
        assert_eq!(local.location.as_deref(), Some("Room 1"));
        assert_eq!(local.provider_id.as_deref(), Some("user-1"));
        assert_eq!(local.synced_at.as_deref(), Some("2025-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_remote_to_local_rejects_incomplete_events() {
        let no_id = RemoteEvent {
            start_time: Some(RemoteTimestamp::Seconds(1)),
            end_time: Some(RemoteTimestamp::Seconds(2)),
            ..Default::default()
        };
        assert!(remote_to_local("x".to_string(), &no_id, "now").is_err());

        let no_end = RemoteEvent {
            id: Some("ev-1".to_string()),
            start_time: Some(RemoteTimestamp::Seconds(1)),
            ..Default::default()
        };
        let err = remote_to_local("x".to_string(), &no_end, "now").unwrap_err();
        assert!(err.contains("endTime"));
    }

    #[test]
    fn test_remote_status_passes_through() {
        let event = RemoteEvent {
            id: Some("ev-1".to_string()),
            start_time: Some(RemoteTimestamp::Seconds(1)),
            end_time: Some(RemoteTimestamp::Seconds(2)),
            appointment_status: Some("showed".to_string()),
            ..Default::default()
        };
        let local = remote_to_local("x".to_string(), &event, "now").unwrap();
        assert_eq!(local.status, "showed");
    }

    #[test]
    fn test_enrich_from_embedded_contact() {
        let mut event = RemoteEvent {
            id: Some("ev-1".to_string()),
            ..Default::default()
        };
        event.extra.insert(
            "contact".to_string(),
            serde_json::json!({"firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com"}),
        );
        event
            .extra
            .insert("assignedUserName".to_string(), serde_json::json!("Dr. Byron"));

        let validated = validate_create(&create_data()).unwrap();
        let mut local = local_from_create("l1".to_string(), &validated, "ev-1", "cal-1", "now");
        enrich_from_remote(&mut local, &event);

        assert_eq!(local.patient_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(local.patient_email.as_deref(), Some("ada@example.com"));
        assert_eq!(local.patient_phone, None);
        assert_eq!(local.provider_name.as_deref(), Some("Dr. Byron"));
    }

    #[test]
    fn test_contact_display_name_fallbacks() {
        let named = RemoteContact {
            first_name: Some("Ada".to_string()),
            last_name: None,
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(contact_display_name(&named), "Ada");

        let email_only = RemoteContact {
            first_name: Some(" ".to_string()),
            email: Some("grace@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(contact_display_name(&email_only), "grace@example.com");

        assert_eq!(contact_display_name(&RemoteContact::default()), UNKNOWN_CONTACT);
    }
}
