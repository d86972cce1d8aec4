use crate::database::AsyncDbConnection;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use shared_types::{LocalAppointment, UpdateAppointmentData};

const COLUMNS: &str = "id, ghl_appointment_id, calendar_id, contact_id, title, notes, location,
                start_time, end_time, status, appointment_type, provider_id, provider_name,
                patient_name, patient_email, patient_phone, synced_at, created_at, updated_at";

fn row_to_appointment(row: &Row<'_>) -> rusqlite::Result<LocalAppointment> {
    Ok(LocalAppointment {
        id: row.get(0)?,
        ghl_appointment_id: row.get(1)?,
        calendar_id: row.get(2)?,
        contact_id: row.get(3)?,
        title: row.get(4)?,
        notes: row.get(5)?,
        location: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        status: row.get(9)?,
        appointment_type: row.get(10)?,
        provider_id: row.get(11)?,
        provider_name: row.get(12)?,
        patient_name: row.get(13)?,
        patient_email: row.get(14)?,
        patient_phone: row.get(15)?,
        synced_at: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

pub async fn insert_appointment(
    conn: AsyncDbConnection,
    appointment: &LocalAppointment,
) -> Result<LocalAppointment> {
    let conn = conn.lock().await?;

    let sql = format!(
        "INSERT INTO appointments ({COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            &appointment.id,
            &appointment.ghl_appointment_id,
            &appointment.calendar_id,
            &appointment.contact_id,
            &appointment.title,
            &appointment.notes,
            &appointment.location,
            &appointment.start_time,
            &appointment.end_time,
            &appointment.status,
            &appointment.appointment_type,
            &appointment.provider_id,
            &appointment.provider_name,
            &appointment.patient_name,
            &appointment.patient_email,
            &appointment.patient_phone,
            &appointment.synced_at,
            &appointment.created_at,
            &appointment.updated_at,
        ],
        row_to_appointment,
    )
    .with_context(|| format!("Failed to insert appointment {}", appointment.id))
}

pub async fn get_appointment(conn: AsyncDbConnection, id: &str) -> Result<Option<LocalAppointment>> {
    let conn = conn.lock().await?;

    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM appointments WHERE id = ?"))?;

    stmt.query_row([id], row_to_appointment)
        .optional()
        .map_err(|e| anyhow::anyhow!("Failed to get appointment: {}", e))
}

pub async fn list_appointments(conn: AsyncDbConnection) -> Result<Vec<LocalAppointment>> {
    let conn = conn.lock().await?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM appointments ORDER BY start_time ASC"
    ))?;

    let appointments = stmt
        .query_map([], row_to_appointment)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(appointments)
}

pub async fn count_appointments(conn: AsyncDbConnection) -> Result<i64> {
    let conn = conn.lock().await?;
    let count = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count)
}

/// Apply the supplied fields of `changes`, leaving the rest untouched.
/// Returns `None` when no row has this id.
pub async fn update_appointment(
    conn: AsyncDbConnection,
    id: &str,
    changes: &UpdateAppointmentData,
    synced_at: &str,
) -> Result<Option<LocalAppointment>> {
    let conn = conn.lock().await?;

    let sql = format!(
        "UPDATE appointments SET
            contact_id = COALESCE(?1, contact_id),
            start_time = COALESCE(?2, start_time),
            end_time = COALESCE(?3, end_time),
            title = COALESCE(?4, title),
            status = COALESCE(?5, status),
            location = COALESCE(?6, location),
            appointment_type = COALESCE(?7, appointment_type),
            notes = COALESCE(?8, notes),
            provider_id = COALESCE(?9, provider_id),
            calendar_id = COALESCE(?10, calendar_id),
            synced_at = ?11,
            updated_at = ?11
         WHERE id = ?12
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            &changes.contact_id,
            &changes.start_time,
            &changes.end_time,
            &changes.title,
            &changes.status,
            &changes.location,
            &changes.appointment_type,
            &changes.notes,
            &changes.provider_id,
            &changes.calendar_id,
            synced_at,
            id,
        ],
        row_to_appointment,
    )
    .optional()
    .with_context(|| format!("Failed to update appointment {}", id))
}

/// Returns whether a row was removed.
pub async fn delete_appointment(conn: AsyncDbConnection, id: &str) -> Result<bool> {
    let conn = conn.lock().await?;
    let removed = conn
        .execute("DELETE FROM appointments WHERE id = ?", [id])
        .with_context(|| format!("Failed to delete appointment {}", id))?;
    Ok(removed > 0)
}

/// Insert-or-update keyed on `ghl_appointment_id`.
///
/// On conflict the existing row keeps its local `id` and `created_at`; schedule
/// and status fields take the incoming values, optional descriptive fields only
/// when the incoming value is present.
pub async fn upsert_by_remote_id(
    conn: AsyncDbConnection,
    appointment: &LocalAppointment,
) -> Result<LocalAppointment> {
    let remote_id = appointment
        .ghl_appointment_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Cannot upsert appointment without a GHL appointment id"))?;

    let conn = conn.lock().await?;

    let sql = format!(
        "INSERT INTO appointments ({COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
         ON CONFLICT(ghl_appointment_id) DO UPDATE SET
            calendar_id = COALESCE(excluded.calendar_id, appointments.calendar_id),
            contact_id = COALESCE(excluded.contact_id, appointments.contact_id),
            title = COALESCE(excluded.title, appointments.title),
            notes = COALESCE(excluded.notes, appointments.notes),
            location = COALESCE(excluded.location, appointments.location),
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            status = excluded.status,
            appointment_type = COALESCE(excluded.appointment_type, appointments.appointment_type),
            provider_id = COALESCE(excluded.provider_id, appointments.provider_id),
            provider_name = COALESCE(excluded.provider_name, appointments.provider_name),
            patient_name = COALESCE(excluded.patient_name, appointments.patient_name),
            patient_email = COALESCE(excluded.patient_email, appointments.patient_email),
            patient_phone = COALESCE(excluded.patient_phone, appointments.patient_phone),
            synced_at = excluded.synced_at,
            updated_at = excluded.updated_at
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            &appointment.id,
            remote_id,
            &appointment.calendar_id,
            &appointment.contact_id,
            &appointment.title,
            &appointment.notes,
            &appointment.location,
            &appointment.start_time,
            &appointment.end_time,
            &appointment.status,
            &appointment.appointment_type,
            &appointment.provider_id,
            &appointment.provider_name,
            &appointment.patient_name,
            &appointment.patient_email,
            &appointment.patient_phone,
            &appointment.synced_at,
            &appointment.created_at,
            &appointment.updated_at,
        ],
        row_to_appointment,
    )
    .with_context(|| format!("Failed to upsert GHL appointment {}", remote_id))
}
