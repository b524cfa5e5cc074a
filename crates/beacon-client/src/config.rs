//! Configuration types for the beacon client.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Beacon node to read chain state and head events from.
    pub beacon_node: BeaconEndpoint,
    /// Timeout applied to each HTTP request, in milliseconds. The event stream has none.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Timeout for downloading the validator set, in milliseconds. Replaces `request_timeout_ms`
    /// for that request only.
    #[serde(default = "default_validators_timeout_ms")]
    pub validators_timeout_ms: u64,
    /// Fixed delay before reconnecting the head event stream, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Capacity of the channel head events are delivered through.
    #[serde(default = "default_head_event_buffer")]
    pub head_event_buffer: usize,
}

/// Beacon node endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BeaconEndpoint {
    /// Human-readable name for this endpoint.
    pub name: String,
    /// HTTP API URL.
    pub url: Url,
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_validators_timeout_ms() -> u64 {
    60_000
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_head_event_buffer() -> usize {
    64
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml_edit::de::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.head_event_buffer == 0 {
            return Err(Error::Config(
                "head_event_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validators_timeout(&self) -> Duration {
        Duration::from_millis(self.validators_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use url::Url;

    use super::{BeaconEndpoint, Config};
    use crate::error::Error;

    #[test]
    fn test_from_toml_str_with_defaults() {
        let toml = r#"
            [beacon_node]
            name = "lighthouse"
            url = "http://localhost:5052"
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(
            config,
            Config {
                beacon_node: BeaconEndpoint {
                    name: "lighthouse".to_string(),
                    url: Url::parse("http://localhost:5052").unwrap(),
                },
                request_timeout_ms: 5_000,
                validators_timeout_ms: 60_000,
                reconnect_delay_ms: 1_000,
                head_event_buffer: 64,
            }
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.validators_timeout(), Duration::from_secs(60));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_from_toml_str_overrides() {
        let toml = r#"
            request_timeout_ms = 2500
            validators_timeout_ms = 120000
            reconnect_delay_ms = 250
            head_event_buffer = 8

            [beacon_node]
            name = "teku"
            url = "http://teku:5051/"
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
        assert_eq!(config.validators_timeout(), Duration::from_secs(120));
        assert_eq!(config.reconnect_delay(), Duration::from_millis(250));
        assert_eq!(config.head_event_buffer, 8);
        assert_eq!(config.beacon_node.name, "teku");
    }

    #[test]
    fn test_zero_buffer_is_rejected() {
        let toml = r#"
            head_event_buffer = 0

            [beacon_node]
            name = "lighthouse"
            url = "http://localhost:5052"
        "#;
        assert!(matches!(Config::from_toml_str(toml), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let toml = r#"
            [beacon_node]
            name = "lighthouse"
            url = "not a url"
        "#;
        assert!(matches!(Config::from_toml_str(toml), Err(Error::Toml(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[beacon_node]\nname = \"prysm\"\nurl = \"http://127.0.0.1:3500\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.beacon_node.name, "prysm");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/beacon-client.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
