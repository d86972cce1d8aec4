use crate::config::{GhlConfig, GhlCredentials};
use crate::integrations::ghl::{CalendarRemote, GhlError};

/// Where the target calendar id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSource {
    Explicit,
    DefaultCalendar,
    DefaultGroup,
    FirstGroup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCalendar {
    pub calendar_id: String,
    pub source: CalendarSource,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(
        "No GHL calendar could be resolved: set GHL_DEFAULT_CALENDAR_ID (or GHL_DEFAULT_GROUP_ID) \
         or pass calendarId in the request"
    )]
    Unresolvable,
    #[error(transparent)]
    Remote(#[from] GhlError),
}

/// Pick the calendar a new appointment goes to.
///
/// Tried in order, each only when the previous yields nothing: the explicit id,
/// the configured default calendar, the first calendar of the configured
/// default group, the first calendar of the first group of the location.
/// A failing default-group lookup falls through to the last step.
pub async fn resolve_calendar_id(
    remote: &dyn CalendarRemote,
    creds: &GhlCredentials,
    config: &GhlConfig,
    explicit: Option<&str>,
) -> Result<ResolvedCalendar, ResolveError> {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(resolved(id, CalendarSource::Explicit));
    }

    if let Some(id) = config.default_calendar_id() {
        return Ok(resolved(id, CalendarSource::DefaultCalendar));
    }

    if let Some(group_id) = config.default_group_id() {
        match remote.list_calendars(creds, Some(group_id)).await {
            Ok(calendars) => {
                if let Some(calendar) = calendars.into_iter().find(|c| !c.id.is_empty()) {
                    return Ok(resolved(&calendar.id, CalendarSource::DefaultGroup));
                }
                tracing::warn!("Default calendar group {} has no calendars", group_id);
            }
            Err(e) => {
                tracing::warn!("Failed to list calendars of default group {}: {}", group_id, e);
            }
        }
    }

    let groups = remote.list_groups(creds).await?;
    if let Some(group) = groups.first() {
        let calendars = remote.list_calendars(creds, Some(&group.id)).await?;
        if let Some(calendar) = calendars.into_iter().find(|c| !c.id.is_empty()) {
            return Ok(resolved(&calendar.id, CalendarSource::FirstGroup));
        }
    }

    Err(ResolveError::Unresolvable)
}

fn resolved(id: &str, source: CalendarSource) -> ResolvedCalendar {
    ResolvedCalendar {
        calendar_id: id.to_string(),
        source,
    }
}
