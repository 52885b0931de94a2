use std::{env::var, fmt, time::Duration};

use proctor_core::config::{DEFAULT_SNAPSHOT_INTERVAL, MonitorSettings};
use sentry::types::Dsn;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct EnvVars {
    pub api_base_url: String,
    pub camera_enabled: bool,
    pub environment: Environment,
    pub sentry_dsn: Option<String>,
    pub snapshot_interval: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                warn!(
                    "ENVIRONMENT value '{}' is not valid. Defaulting to 'production'.",
                    other
                );
                Environment::Production
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(s)
    }
}

impl Default for EnvVars {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvVars {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn new() -> Self {
        Self::from_source(|key| var(key).ok())
    }

    pub fn from_source<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = match get("API_BASE_URL") {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => {
                let default_api_base_url = "http://localhost:8000/api".to_string();
                warn!("API_BASE_URL not set. Defaulting to {default_api_base_url}");
                default_api_base_url
            }
        };

        let snapshot_interval = match get("SNAPSHOT_INTERVAL_IN_MS") {
            Some(val) => match val.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                Ok(_) => {
                    warn!("SNAPSHOT_INTERVAL_IN_MS provided but not > 0; using default");
                    DEFAULT_SNAPSHOT_INTERVAL
                }
                Err(e) => {
                    warn!("Failed to parse SNAPSHOT_INTERVAL_IN_MS ('{val}'): {e}; using default");
                    DEFAULT_SNAPSHOT_INTERVAL
                }
            },
            None => DEFAULT_SNAPSHOT_INTERVAL,
        };

        let camera_enabled = match get("CAMERA_ENABLED") {
            Some(val) => match val.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => {
                    warn!("CAMERA_ENABLED value '{other}' is not valid. Defaulting to true.");
                    true
                }
            },
            None => true,
        };

        let environment = match get("ENVIRONMENT") {
            Some(v) => v.into(),
            None => {
                warn!("ENVIRONMENT not set. Defaulting to 'production'.");
                Environment::Production
            }
        };

        let sentry_dsn = match get("SENTRY_DSN") {
            Some(dsn_string) if valid_sentry_dsn(&dsn_string) => Some(dsn_string),
            Some(_) => {
                warn!("SENTRY_DSN is not a valid DSN. Sentry disabled.");
                None
            }
            None => {
                warn!("SENTRY_DSN not set.");
                None
            }
        };

        Self {
            api_base_url,
            camera_enabled,
            environment,
            sentry_dsn,
            snapshot_interval,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            snapshot_interval: self.snapshot_interval,
            camera_enabled: self.camera_enabled,
            ..Default::default()
        }
    }
}

fn valid_sentry_dsn(url: &str) -> bool {
    url.parse::<Dsn>().is_ok()
}
