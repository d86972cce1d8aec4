use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_GHL_BASE_URL: &str = "https://services.leadconnectorhq.com";
pub const DEFAULT_GHL_API_VERSION: &str = "2021-04-15";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiConfig {
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub ghl: GhlConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Remote calendar credentials and calendar defaults.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GhlConfig {
    pub api_key: Option<String>,
    pub location_id: Option<String>,
    pub default_calendar_id: Option<String>,
    pub default_group_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GhlConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            location_id: None,
            default_calendar_id: None,
            default_group_id: None,
            base_url: default_base_url(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Credentials every remote call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhlCredentials {
    pub api_key: String,
    pub location_id: String,
}

impl GhlConfig {
    /// Returns the API key and location id, or the name of the first missing setting.
    pub fn credentials(&self) -> Result<GhlCredentials, String> {
        let api_key = non_empty(&self.api_key)
            .ok_or_else(|| "GHL_API_KEY is not configured".to_string())?;
        let location_id = non_empty(&self.location_id)
            .ok_or_else(|| "GHL_LOCATION_ID is not configured".to_string())?;

        Ok(GhlCredentials {
            api_key: api_key.to_string(),
            location_id: location_id.to_string(),
        })
    }

    pub fn default_calendar_id(&self) -> Option<&str> {
        non_empty(&self.default_calendar_id)
    }

    pub fn default_group_id(&self) -> Option<&str> {
        non_empty(&self.default_group_id)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Run the sync action in the background at this interval. Disabled when unset.
    pub interval_secs: Option<u64>,
    #[serde(default = "default_window_past_days")]
    pub window_past_days: i64,
    #[serde(default = "default_window_future_days")]
    pub window_future_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: None,
            window_past_days: default_window_past_days(),
            window_future_days: default_window_future_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_GHL_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_GHL_API_VERSION.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_window_past_days() -> i64 {
    30
}

fn default_window_future_days() -> i64 {
    90
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

const DEFAULT_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[ghl]
# Credentials may also come from GHL_API_KEY / GHL_LOCATION_ID
# api_key = "pit-..."
# location_id = "your-location-id"
# default_calendar_id = ""
# default_group_id = ""
# base_url = "https://services.leadconnectorhq.com"

[sync]
# interval_secs = 900
window_past_days = 30
window_future_days = 90
"#;

impl ApiConfig {
    /// Load the file at `path` (or the default location), with `GHL_*`
    /// environment variables taking precedence.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        Self::load_with_overrides(path, env_var)
    }

    /// Like [`ApiConfig::load`], reading overrides through `lookup` instead of
    /// the process environment.
    pub fn load_with_overrides(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, PathBuf), ConfigError> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        // Create default config file if it doesn't exist
        if !config_path.exists() {
            std::fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .set_override_option("ghl.api_key", lookup("GHL_API_KEY"))?
            .set_override_option("ghl.location_id", lookup("GHL_LOCATION_ID"))?
            .set_override_option("ghl.default_calendar_id", lookup("GHL_DEFAULT_CALENDAR_ID"))?
            .set_override_option("ghl.default_group_id", lookup("GHL_DEFAULT_GROUP_ID"))?
            .set_override_option("ghl.base_url", lookup("GHL_BASE_URL"))?
            .build()?;

        let config: ApiConfig = builder.try_deserialize()?;

        Ok((config, config_path))
    }

    pub fn server_address(&self) -> (String, u16) {
        match &self.server {
            Some(server) => (server.host.clone(), server.port),
            None => ("127.0.0.1".to_string(), 8080),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("ghl-appointments").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_name_missing_setting() {
        let mut ghl = GhlConfig::default();
        assert_eq!(
            ghl.credentials().unwrap_err(),
            "GHL_API_KEY is not configured"
        );

        ghl.api_key = Some("key".to_string());
        ghl.location_id = Some("   ".to_string());
        assert_eq!(
            ghl.credentials().unwrap_err(),
            "GHL_LOCATION_ID is not configured"
        );

        ghl.location_id = Some("loc-1".to_string());
        let creds = ghl.credentials().unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.location_id, "loc-1");
    }

    #[test]
    fn test_load_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("api.toml");

        let (config, written) = ApiConfig::load_with_overrides(Some(&path), |_| None).unwrap();

        assert_eq!(written, path);
        assert!(path.exists());
        assert_eq!(config.server_address(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(config.ghl.base_url, DEFAULT_GHL_BASE_URL);
        assert_eq!(config.ghl.api_version, DEFAULT_GHL_API_VERSION);
        assert_eq!(config.sync.window_past_days, 30);
        assert!(config.sync.interval_secs.is_none());
    }

    #[test]
    fn test_load_reads_ghl_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.toml");
        std::fs::write(
            &path,
            r#"
[ghl]
default_group_id = "grp-1"
request_timeout_secs = 5

[sync]
interval_secs = 600
"#,
        )
        .unwrap();

        let (config, _) = ApiConfig::load_with_overrides(Some(&path), |_| None).unwrap();

        assert_eq!(config.ghl.default_group_id(), Some("grp-1"));
        assert_eq!(config.ghl.default_calendar_id(), None);
        assert_eq!(config.ghl.request_timeout_secs, 5);
        assert_eq!(config.sync.interval_secs, Some(600));
        assert_eq!(config.sync.window_future_days, 90);
    }

    #[test]
    fn test_overrides_beat_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.toml");
        std::fs::write(
            &path,
            r#"
[ghl]
location_id = "loc-file"
default_group_id = "grp-file"
"#,
        )
        .unwrap();

        let (config, _) = ApiConfig::load_with_overrides(Some(&path), |name| match name {
            "GHL_API_KEY" => Some("pit-env".to_string()),
            "GHL_DEFAULT_GROUP_ID" => Some("grp-env".to_string()),
            "GHL_LOCATION_ID" => Some("  ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.ghl.api_key.as_deref(), Some("pit-env"));
        assert_eq!(config.ghl.default_group_id(), Some("grp-env"));
        // Blank overrides leave the file value alone
        assert_eq!(config.ghl.location_id.as_deref(), Some("loc-file"));
    }
}
