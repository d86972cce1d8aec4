use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    // Create appointments table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            ghl_appointment_id TEXT UNIQUE,
            calendar_id TEXT,
            contact_id TEXT,
            title TEXT,
            notes TEXT,
            location TEXT,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'scheduled',
            appointment_type TEXT,
            provider_id TEXT,
            provider_name TEXT,
            patient_name TEXT,
            patient_email TEXT,
            patient_phone TEXT,
            synced_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Create indexes for performance
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_start_time
            ON appointments(start_time)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_contact
            ON appointments(contact_id)",
        [],
    )?;

    Ok(())
}
