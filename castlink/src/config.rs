use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CastError, Result};

/// DNS-SD service type advertised by registration-protocol receivers
pub const DEFAULT_SERVICE_TYPE: &str = "_screencast._tcp.local.";
pub const SSDP_MULTICAST_ADDRESS: &str = "239.255.255.250:1900";
pub const MEDIA_RENDERER_TARGET: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";

/// All tunables for discovery and the protocol clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastConfig {
    pub discovery: DiscoveryConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub service_type: String,
    pub multicast_address: String,
    pub search_target: String,
    /// Substring that `ST` or `USN` of a reply must contain (case-insensitive)
    pub device_category: String,
    pub mx: u8,
    pub search_rounds: u32,
    pub search_window_ms: u64,
    pub receive_timeout_ms: u64,
    pub description_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            multicast_address: SSDP_MULTICAST_ADDRESS.to_string(),
            search_target: MEDIA_RENDERER_TARGET.to_string(),
            device_category: "MediaRenderer".to_string(),
            mx: 2,
            search_rounds: 3,
            search_window_ms: 2000,
            receive_timeout_ms: 1000,
            description_timeout_ms: 3000,
        }
    }
}

impl DiscoveryConfig {
    pub fn search_window(&self) -> Duration {
        Duration::from_millis(self.search_window_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn description_timeout(&self) -> Duration {
        Duration::from_millis(self.description_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connect and overall timeout of every `send`/`control` request
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { request_timeout_ms: 5000 }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl CastConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| CastError::Config(format!("failed to parse config: {}", e)))
    }

    /// Loads a TOML config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CastError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CastConfig::default();

        assert_eq!(config.discovery.search_rounds, 3);
        assert_eq!(config.discovery.search_window(), Duration::from_secs(2));
        assert_eq!(config.discovery.receive_timeout(), Duration::from_secs(1));
        assert_eq!(config.discovery.description_timeout(), Duration::from_secs(3));
        assert_eq!(config.client.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.discovery.multicast_address, "239.255.255.250:1900");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CastConfig::from_toml_str(
            r#"
            [discovery]
            search_rounds = 1
            service_type = "_tvcast._tcp.local."

            [client]
            request_timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery.search_rounds, 1);
        assert_eq!(config.discovery.service_type, "_tvcast._tcp.local.");
        assert_eq!(config.discovery.search_window_ms, 2000);
        assert_eq!(config.client.request_timeout_ms, 1500);
    }

    #[test]
    fn test_invalid_toml() {
        let result = CastConfig::from_toml_str("[discovery\nsearch_rounds = ");
        assert!(matches!(result, Err(CastError::Config(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = CastConfig::load("/nonexistent/castlink.toml").unwrap();
        assert_eq!(config, CastConfig::default());
    }
}
