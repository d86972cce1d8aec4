use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum GhlError {
    #[error("Invalid GHL API key (401 Unauthorized). Check that GHL_API_KEY holds a valid Private Integration token")]
    InvalidApiKey,

    #[error(
        "GHL API key is missing permissions for location {location_id}: {detail}. \
         Grant the Private Integration the scopes calendars.readonly, calendars.write, \
         calendars/events.readonly, calendars/events.write and contacts.readonly, make sure it was created \
         for this location, then update GHL_API_KEY with the regenerated token"
    )]
    MissingScopes { location_id: String, detail: String },

    #[error("GHL API key has no access to location {location_id} (403 Forbidden)")]
    NoLocationAccess { location_id: String },

    #[error("GHL rejected {operation} request (400 Bad Request): {body}")]
    BadRequest { operation: String, body: String },

    #[error("GHL {operation} failed: {status}, {body}")]
    RequestFailed {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("GHL {operation} request could not be sent: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode GHL {operation} response: {message}")]
    Decode { operation: String, message: String },
}

impl GhlError {
    /// Credential or permission failures; never skipped by batch listings.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            GhlError::InvalidApiKey
                | GhlError::MissingScopes { .. }
                | GhlError::NoLocationAccess { .. }
        )
    }
}

/// Map a non-2xx remote response onto an actionable error.
pub fn classify_failure(operation: &str, status: u16, body: &str, location_id: &str) -> GhlError {
    match status {
        401 => GhlError::InvalidApiKey,
        403 => {
            let detail = remote_message(body).unwrap_or_else(|| body.trim().to_string());
            if is_permission_problem(&detail) {
                GhlError::MissingScopes {
                    location_id: location_id.to_string(),
                    detail,
                }
            } else {
                GhlError::NoLocationAccess {
                    location_id: location_id.to_string(),
                }
            }
        }
        400 => GhlError::BadRequest {
            operation: operation.to_string(),
            body: body.to_string(),
        },
        _ => GhlError::RequestFailed {
            operation: operation.to_string(),
            status,
            body: body.to_string(),
        },
    }
}

/// Location-access and scope denials both come from an under-provisioned token.
fn is_permission_problem(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("does not have access to this location") || lower.contains("scope")
}

/// GHL error bodies carry `message` as either a string or a list of strings.
fn remote_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        Value::String(msg) => Some(msg.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}
