use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for API types
    let mut types = Vec::new();

    // Appointment types
    types.push(clean_type(LocalAppointment::export_to_string()?));
    types.push(clean_type(CreateAppointmentData::export_to_string()?));
    types.push(clean_type(UpdateAppointmentData::export_to_string()?));
    types.push(clean_type(AppointmentRequest::export_to_string()?));

    // Response types
    types.push(clean_type(ListAppointmentsResponse::export_to_string()?));
    types.push(clean_type(CreateAppointmentResponse::export_to_string()?));
    types.push(clean_type(UpdateAppointmentResponse::export_to_string()?));
    types.push(clean_type(DeleteAppointmentResponse::export_to_string()?));
    types.push(clean_type(SyncAppointmentsResponse::export_to_string()?));
    types.push(clean_type(ErrorResponse::export_to_string()?));

    let output_dir = Path::new("../web/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // Every type lands in one file, so cross-type imports are dropped
    let filtered: Vec<&str> = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
