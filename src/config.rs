//! Application Configuration
//!
//! This module provides configuration management for the application,
//! supporting YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use log::{info, warn};

use crate::storage::config::DiskConfig;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Default log4rs file, also used to start logging before configuration loads
pub const DEFAULT_LOG_CONFIG_PATH: &str = "server_log.yaml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Disk geometry
    pub disk: DiskConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to log configuration file
    pub config_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9720,
            workers: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            config_file: DEFAULT_LOG_CONFIG_PATH.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            disk: DiskConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `DISK_CONFIG` or `config.yaml`, use defaults if not found.
    ///
    /// Disk geometry environment overrides are applied last.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("DISK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_from(&config_path)?;
        config.disk = config.disk.with_env_overrides();
        config.disk.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, use defaults if it does not exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = serde_yaml::from_str(&content)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 9720);
        assert_eq!(config.disk, DiskConfig::default());
        assert_eq!(config.logging.config_file, "server_log.yaml");
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  host: 0.0.0.0\n  port: 9000\ndisk:\n  capacity: 65536\n  block_size: 4096\n"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.workers, 1);
        assert_eq!(config.disk.capacity, 65536);
        assert_eq!(config.disk.block_size, 4096);
        assert_eq!(config.disk.dataport_size, 4096);
        assert_eq!(config.disk.initial_removal_budget, -1);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_from_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "disk: [this is not a mapping").unwrap();
        assert!(AppConfig::load_from(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_load_validates_geometry() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "disk:\n  capacity: 5000\n  block_size: 4096\n").unwrap();

        env::set_var("DISK_CONFIG", file.path());
        let result = AppConfig::load();
        env::remove_var("DISK_CONFIG");

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_applies_env_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "disk:\n  capacity: 65536\n  block_size: 4096\n").unwrap();

        env::set_var("DISK_CONFIG", file.path());
        env::set_var("DISK_CAPACITY", "131072");
        let result = AppConfig::load();
        env::remove_var("DISK_CONFIG");
        env::remove_var("DISK_CAPACITY");

        let config = result.unwrap();
        assert_eq!(config.disk.capacity, 131072);
        assert_eq!(config.disk.block_size, 4096);
    }
}
