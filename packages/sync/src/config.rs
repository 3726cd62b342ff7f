//! Client configuration.
//!
//! The defaults in `config/default.toml` are embedded at compile time. A
//! user TOML file may override any subset of keys, and a few environment
//! variables override both.

use std::path::Path;
use std::time::Duration;

use hazard_map_api::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::channel::ChannelOptions;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "HAZARD_MAP_API_URL";
/// Overrides `channel.url`.
pub const ENV_WS_URL: &str = "HAZARD_MAP_WS_URL";
/// Sets `api.token`.
pub const ENV_TOKEN: &str = "HAZARD_MAP_TOKEN";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The user file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A document was not valid TOML or did not match the schema.
    #[error("invalid configuration in {origin}: {message}")]
    Invalid {
        /// `"built-in defaults"` or the file path.
        origin: String,
        /// Parser message.
        message: String,
    },
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub reports: ReportsConfig,
    pub channel: ChannelConfig,
    pub alerts: AlertsConfig,
    pub classifier: ClassifierConfig,
}

/// REST backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root of the REST API, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Retries for transient failures; zero disables retrying.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Bearer token to start the session with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// `limit` of the initial `GET /reports`.
    pub initial_limit: u32,
}

/// Push channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Fixed wait between a disconnect and the next attempt.
    pub reconnect_delay_secs: u64,
    /// Stop after this many consecutive failed attempts. Unset retries
    /// forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reconnect_attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertsConfig {
    pub poll_interval_secs: u64,
    pub feed: FeedConfig,
}

/// Where official alerts come from, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedConfig {
    /// The built-in sample warnings.
    Sample,
    /// Per-category JSON documents under `base_url`.
    Http {
        base_url: String,
    },
}

/// How attached media is classified, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierConfig {
    /// Judge by media type alone.
    Heuristic,
    /// Post to `{base_url}/predict`.
    Http {
        base_url: String,
    },
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                timeout_secs: 30,
                max_retries: 2,
                retry_base_delay_ms: 1000,
                token: None,
            },
            reports: ReportsConfig { initial_limit: 50 },
            channel: ChannelConfig {
                url: "ws://localhost:8000/ws/reports".to_string(),
                reconnect_delay_secs: 5,
                max_reconnect_attempts: None,
            },
            alerts: AlertsConfig {
                poll_interval_secs: 300,
                feed: FeedConfig::Sample,
            },
            classifier: ClassifierConfig::Heuristic,
        }
    }
}

impl ClientConfig {
    /// Loads the defaults, overlays `path` if given, then applies the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or the merged
    /// document does not match the schema.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let origin = path.display().to_string();
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: origin.clone(),
                    source,
                })?;
                Self::from_overlay(&text, &origin)?
            }
            None => Self::from_overlay("", "built-in defaults")?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses `overlay` on top of the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if either document is malformed
    /// or the merge does not match the schema.
    pub fn from_overlay(overlay: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut base = parse_table(DEFAULT_CONFIG, "built-in defaults")?;
        merge(&mut base, parse_table(overlay, origin)?);
        into_config(base, origin)
    }

    /// Applies environment overrides read through `lookup`. Empty values
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var(ENV_API_URL) {
            log::debug!("{ENV_API_URL} overrides api.base_url");
            self.api.base_url = url;
        }
        if let Some(url) = var(ENV_WS_URL) {
            log::debug!("{ENV_WS_URL} overrides channel.url");
            self.channel.url = url;
        }
        if let Some(token) = var(ENV_TOKEN) {
            self.api.token = Some(token);
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.api.max_retries,
            base_delay: Duration::from_millis(self.api.retry_base_delay_ms),
        }
    }

    #[must_use]
    pub const fn channel_options(&self) -> ChannelOptions {
        ChannelOptions {
            reconnect_delay: Duration::from_secs(self.channel.reconnect_delay_secs),
            max_reconnect_attempts: self.channel.max_reconnect_attempts,
        }
    }

    #[must_use]
    pub const fn alert_poll_interval(&self) -> Duration {
        Duration::from_secs(self.alerts.poll_interval_secs)
    }
}

fn parse_table(text: &str, origin: &str) -> Result<toml::Table, ConfigError> {
    text.parse::<toml::Table>()
        .map_err(|e| ConfigError::Invalid {
            origin: origin.to_string(),
            message: e.to_string(),
        })
}

fn into_config(table: toml::Table, origin: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Invalid {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

    let durations = [
        ("api.timeout_secs", config.api.timeout_secs),
        ("channel.reconnect_delay_secs", config.channel.reconnect_delay_secs),
        ("alerts.poll_interval_secs", config.alerts.poll_interval_secs),
    ];
    if let Some((key, _)) = durations.iter().find(|(_, value)| *value == 0) {
        return Err(ConfigError::Invalid {
            origin: origin.to_string(),
            message: format!("{key} must be at least 1"),
        });
    }

    Ok(config)
}

/// Recursively overlays `overlay` onto `base`. Tables merge key by key;
/// every other value replaces. A table carrying a `type` tag replaces the
/// base table wholesale, so switching variants drops the old variant's
/// fields.
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming))
                if !incoming.contains_key("type") =>
            {
                merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = ClientConfig::from_overlay("", "empty").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.channel_options().reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.channel_options().max_reconnect_attempts, None);
        assert_eq!(config.alert_poll_interval(), Duration::from_secs(300));
        assert_eq!(config.reports.initial_limit, 50);
    }

    #[test]
    fn overlay_overrides_single_keys() {
        let config = ClientConfig::from_overlay(
            r#"
            [channel]
            reconnect_delay_secs = 2
            max_reconnect_attempts = 10

            [alerts.feed]
            type = "http"
            base_url = "https://feeds.example.org"
            "#,
            "user.toml",
        )
        .unwrap();

        assert_eq!(config.channel.reconnect_delay_secs, 2);
        assert_eq!(config.channel.max_reconnect_attempts, Some(10));
        assert_eq!(config.channel.url, "ws://localhost:8000/ws/reports");
        assert_eq!(config.alerts.poll_interval_secs, 300);
        assert_eq!(
            config.alerts.feed,
            FeedConfig::Http {
                base_url: "https://feeds.example.org".to_string()
            }
        );
    }

    #[test]
    fn invalid_overlay_names_origin() {
        let err = ClientConfig::from_overlay("[api]\ntimeout_secs = \"soon\"", "user.toml")
            .unwrap_err();
        assert!(err.to_string().contains("user.toml"), "{err}");

        let err = ClientConfig::from_overlay("[[[", "broken.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_durations_are_rejected() {
        for (overlay, key) in [
            ("[alerts]\npoll_interval_secs = 0", "alerts.poll_interval_secs"),
            ("[channel]\nreconnect_delay_secs = 0", "channel.reconnect_delay_secs"),
            ("[api]\ntimeout_secs = 0", "api.timeout_secs"),
        ] {
            let err = ClientConfig::from_overlay(overlay, "user.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{overlay}");
            assert!(err.to_string().contains(key), "{err}");
        }

        let config = ClientConfig::from_overlay("[alerts]\npoll_interval_secs = 1", "user.toml");
        assert_eq!(config.unwrap().alert_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn environment_overrides() {
        let mut config = ClientConfig::default();
        config.apply_env(|key| match key {
            ENV_API_URL => Some("https://hazards.example.org/api".to_string()),
            ENV_WS_URL => Some(String::new()),
            ENV_TOKEN => Some("tok".to_string()),
            _ => None,
        });

        assert_eq!(config.api.base_url, "https://hazards.example.org/api");
        assert_eq!(config.channel.url, "ws://localhost:8000/ws/reports");
        assert_eq!(config.api.token.as_deref(), Some("tok"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ClientConfig::load(Some(Path::new("/nonexistent/hazard-map.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
