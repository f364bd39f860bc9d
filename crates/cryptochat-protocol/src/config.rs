//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the relay server
    pub relay_url: String,
    /// Network configuration
    pub network: NetworkConfig,
    /// Sync configuration
    pub sync: SyncConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:3000".to_string(),
            network: NetworkConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create with a relay URL
    pub fn with_relay_url(url: impl Into<String>) -> Self {
        Self {
            relay_url: url.into(),
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.relay_url.starts_with("http://") || self.relay_url.starts_with("https://")) {
            return Err("relay_url must be an http(s) URL".to_string());
        }
        if self.network.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        if self.network.connection_timeout_secs == 0 {
            return Err("connection_timeout_secs must be greater than 0".to_string());
        }
        if self.sync.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        if self.sync.batch_channel_capacity == 0 || self.sync.event_channel_capacity == 0 {
            return Err("channel capacities must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Network configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Connection timeout (seconds)
    pub connection_timeout_secs: u64,
    /// Bound on a whole relay call (seconds)
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 10,
            request_timeout_secs: 15,
        }
    }
}

impl NetworkConfig {
    /// Connection timeout
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Message sync configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Poll interval (milliseconds)
    pub poll_interval_ms: u64,
    /// Fetched batches buffered between poller and merger
    pub batch_channel_capacity: usize,
    /// Events buffered per subscriber
    pub event_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            batch_channel_capacity: 16,
            event_channel_capacity: 64,
        }
    }
}

impl SyncConfig {
    /// Poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
