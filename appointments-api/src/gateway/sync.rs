use chrono::Utc;
use std::collections::HashSet;
use tracing::{info, warn};

use super::{translator, AppointmentGateway, GatewayError};
use crate::config::GhlCredentials;
use crate::database::appointments as db;
use crate::integrations::ghl::{Calendar, EventWindow, RemoteEvent};

/// Aggregate counts of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub synced_count: usize,
    pub error_count: usize,
    pub total_events: usize,
}

impl AppointmentGateway {
    /// Upsert every remote event into the local store, keyed on the remote id.
    ///
    /// A row that fails to translate or persist is counted and skipped; the
    /// rest of the batch still runs.
    pub async fn sync(&self) -> Result<SyncReport, GatewayError> {
        let creds = self.credentials()?;
        let events = self.collect_remote_events(&creds).await?;
        let now = translator::now_iso();

        let mut report = SyncReport {
            synced_count: 0,
            error_count: 0,
            total_events: events.len(),
        };

        for event in &events {
            let row = match translator::remote_to_local(uuid::Uuid::new_v4().to_string(), event, &now) {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping GHL event during sync: {}", e);
                    report.error_count += 1;
                    continue;
                }
            };

            match db::upsert_by_remote_id(self.db.clone(), &row).await {
                Ok(_) => report.synced_count += 1,
                Err(e) => {
                    warn!("Failed to sync GHL event {:?}: {:#}", row.ghl_appointment_id, e);
                    report.error_count += 1;
                }
            }
        }

        info!(
            "GHL sync finished: {} synced, {} failed, {} events",
            report.synced_count, report.error_count, report.total_events
        );

        Ok(report)
    }

    /// Walk groups, their calendars and the calendars' events in the order the
    /// remote returns them. Events reachable through several calendars are kept once.
    ///
    /// The group listing and any authorization failure are fatal; other
    /// calendar or event listing failures are logged and skipped.
    pub(crate) async fn collect_remote_events(
        &self,
        creds: &GhlCredentials,
    ) -> Result<Vec<RemoteEvent>, GatewayError> {
        let groups = self.remote.list_groups(creds).await?;

        let mut calendars: Vec<Calendar> = Vec::new();
        if groups.is_empty() {
            // Locations without groups still expose ungrouped calendars
            calendars = self.remote.list_calendars(creds, None).await?;
        }
        for group in &groups {
            match self.remote.list_calendars(creds, Some(&group.id)).await {
                Ok(found) => calendars.extend(found),
                Err(e) if e.is_authorization() => return Err(e.into()),
                Err(e) => warn!("Failed to list calendars of group {}: {}", group.id, e),
            }
        }

        let window = EventWindow::around(
            Utc::now(),
            self.sync.window_past_days,
            self.sync.window_future_days,
        );

        let mut seen_calendars = HashSet::new();
        let mut seen_events = HashSet::new();
        let mut events = Vec::new();

        for calendar in calendars {
            if !seen_calendars.insert(calendar.id.clone()) {
                continue;
            }

            let listed = match self.remote.list_events(creds, &calendar.id, window).await {
                Ok(listed) => listed,
                Err(e) if e.is_authorization() => return Err(e.into()),
                Err(e) => {
                    warn!("Failed to list events of calendar {}: {}", calendar.id, e);
                    continue;
                }
            };

            for event in listed {
                let fresh = match event.remote_id() {
                    Some(id) => seen_events.insert(id.to_string()),
                    None => true,
                };
                if fresh {
                    events.push(event);
                }
            }
        }

        Ok(events)
    }
}
