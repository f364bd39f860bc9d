//! CLI configuration

use cryptochat_protocol::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory of the sled database holding local state
    pub storage_path: PathBuf,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Emit logs as JSON
    pub json_logs: bool,
    /// Relay and sync settings
    pub client: ClientConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        let storage_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cryptochat");

        Self {
            storage_path,
            log_level: "warn".to_string(),
            json_logs: false,
            client: ClientConfig::default(),
        }
    }
}

impl CliConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cryptochat")
            .join("config.toml")
    }

    /// Load config from file or create default
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: CliConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_written() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let config = CliConfig::load_or_default(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, CliConfig::default());
        assert_eq!(CliConfig::load_or_default(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\n\n[client]\nrelay_url = \"https://relay.example.com\"\n\n[client.sync]\npoll_interval_ms = 500\n",
        )
        .unwrap();

        let config = CliConfig::load_or_default(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.client.relay_url, "https://relay.example.com");
        assert_eq!(config.client.sync.poll_interval_ms, 500);
        assert_eq!(config.client.network.request_timeout_secs, 15);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "log_level = [").unwrap();
        assert!(CliConfig::load_or_default(&path).is_err());
    }
}
