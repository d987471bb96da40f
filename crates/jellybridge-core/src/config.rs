//! Tracker and server configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Playback tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Device id used when a pending descriptor carries none
    pub device_id: String,
    /// Cache directory swept for the item's files at stop
    pub temp_dir: PathBuf,
    /// Offer deleting watched episodes
    pub delete_tv: bool,
    /// Offer deleting watched movies
    pub delete_movies: bool,
    /// Global switch for the delete offer
    pub offer_delete: bool,
    /// Auto-close timeout of the delete dialog (seconds)
    pub delete_prompt_timeout_secs: u64,
    /// Played percentage past which the next-episode prompt is planned
    pub up_next_threshold: f64,
    /// Minimum position delta (seconds) between periodic progress reports
    pub report_interval_secs: i64,
    /// Attempts to resolve the playing file after start
    pub start_retry_attempts: u32,
    pub start_retry_interval_ms: u64,
    /// Polls for a pending playback descriptor
    pub pending_poll_attempts: u32,
    pub pending_poll_interval_ms: u64,
    /// Delay before applying initial audio/subtitle selection
    pub stream_selection_delay_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            temp_dir: std::env::temp_dir().join("jellybridge"),
            delete_tv: false,
            delete_movies: false,
            offer_delete: false,
            delete_prompt_timeout_secs: 120,
            up_next_threshold: 2.0,
            report_interval_secs: 30,
            start_retry_attempts: 5,
            start_retry_interval_ms: 1000,
            pending_poll_attempts: 20,
            pending_poll_interval_ms: 2000,
            stream_selection_delay_ms: 2000,
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: TrackerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(Error::InvalidConfig("device_id must not be empty".into()));
        }
        if !self.up_next_threshold.is_finite() || self.up_next_threshold < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "up_next_threshold must be a non-negative percentage, got {}",
                self.up_next_threshold
            )));
        }
        if self.report_interval_secs < 0 {
            return Err(Error::InvalidConfig(
                "report_interval_secs must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn delete_prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_prompt_timeout_secs)
    }

    pub fn start_retry_interval(&self) -> Duration {
        Duration::from_millis(self.start_retry_interval_ms)
    }

    pub fn pending_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pending_poll_interval_ms)
    }

    pub fn stream_selection_delay(&self) -> Duration {
        Duration::from_millis(self.stream_selection_delay_ms)
    }

    /// Whether a watched item of `item_type` may be offered for deletion
    pub fn offers_delete_for(&self, item_type: Option<&str>) -> bool {
        let enabled = match item_type {
            Some("Episode") => self.delete_tv,
            Some("Movie") => self.delete_movies,
            _ => false,
        };
        enabled && self.offer_delete
    }
}

/// Connection settings for one Jellyfin server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base address, e.g. `http://jellyfin.local:8096`
    pub address: Url,
    /// Access token
    pub token: String,
    pub user_id: String,
    pub device_id: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_client_name() -> String {
    "Jellybridge".to_string()
}

fn default_version() -> String {
    crate::VERSION.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl ServerConfig {
    pub fn new(address: Url, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            address,
            token: token.into(),
            user_id: user_id.into(),
            device_id: Uuid::new_v4().to_string(),
            client_name: default_client_name(),
            version: default_version(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.start_retry_attempts, 5);
        assert_eq!(config.pending_poll_attempts, 20);
        assert_eq!(config.report_interval_secs, 30);
        assert_eq!(config.delete_prompt_timeout(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_delete_gates() {
        let mut config = TrackerConfig {
            delete_tv: true,
            ..Default::default()
        };
        assert!(!config.offers_delete_for(Some("Episode")));

        config.offer_delete = true;
        assert!(config.offers_delete_for(Some("Episode")));
        assert!(!config.offers_delete_for(Some("Movie")));
        assert!(!config.offers_delete_for(None));
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        std::fs::write(&path, r#"{"device_id": "dev-1", "offer_delete": true}"#).unwrap();

        let config = TrackerConfig::from_file(&path).unwrap();
        assert_eq!(config.device_id, "dev-1");
        assert!(config.offer_delete);
        assert_eq!(config.up_next_threshold, 2.0);
    }

    #[test]
    fn test_invalid_threshold() {
        let config = TrackerConfig {
            up_next_threshold: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
