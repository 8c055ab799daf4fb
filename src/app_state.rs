//! Application State Management
//!
//! This module provides the application state that contains the storage
//! service and the configuration it was built from.

use std::sync::Arc;
use log::info;

use crate::config::AppConfig;
use crate::service::storage_service::StorageService;
use crate::storage::config::{ConfigError, DiskConfig};
use crate::storage::RemovableDisk;

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub storage_service: Arc<StorageService>,
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with services configured from YAML config
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load()?;
        Ok(Self::from_config(config)?)
    }

    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        info!("Initializing application state with configuration");

        let disk = config.disk.create_disk()?;
        let port = config.disk.create_dataport();
        info!(
            "Using removable disk: capacity {} bytes, block size {}, dataport {} bytes, removal budget {}",
            config.disk.capacity, config.disk.block_size, config.disk.dataport_size, config.disk.initial_removal_budget
        );

        let storage_service = Arc::new(StorageService::new(disk, port));

        info!("Application state initialized successfully");
        Ok(Self {
            storage_service,
            config,
        })
    }

    /// Create application state for testing with the given geometry
    pub fn new_for_testing(capacity: usize, block_size: u64) -> Self {
        let disk = DiskConfig::new(capacity, block_size);
        let port = disk.create_dataport();
        let storage_service = Arc::new(StorageService::new(RemovableDisk::new(capacity, block_size), port));

        Self {
            storage_service,
            config: AppConfig {
                disk,
                ..AppConfig::default()
            },
        }
    }
}
