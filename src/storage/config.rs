//! Configuration for the removable disk geometry

use crate::storage::dataport::{DataPort, DEFAULT_DATAPORT_SIZE};
use crate::storage::engine::RemovableDisk;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Errors raised while validating disk configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroCapacity,
    ZeroBlockSize,
    ZeroDataport,
    Misaligned { capacity: usize, block_size: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroCapacity => write!(f, "disk capacity must be non-zero"),
            ConfigError::ZeroBlockSize => write!(f, "block size must be non-zero"),
            ConfigError::ZeroDataport => write!(f, "dataport size must be non-zero"),
            ConfigError::Misaligned { capacity, block_size } => write!(
                f,
                "disk capacity {} is not a multiple of block size {}",
                capacity, block_size
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Disk geometry, fixed for the lifetime of the process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiskConfig {
    /// Capacity of the storage region in bytes
    pub capacity: usize,
    /// Value reported by block-size queries
    pub block_size: u64,
    /// Size of the bulk-transfer buffer shared with clients
    pub dataport_size: usize,
    /// Removal budget armed at start-up (negative: never removed)
    pub initial_removal_budget: i64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            capacity: 1024 * 1024,
            block_size: 1,
            dataport_size: DEFAULT_DATAPORT_SIZE,
            initial_removal_budget: -1,
        }
    }
}

fn env_override<T: FromStr>(name: &str, current: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => {
                info!("Using {} from environment: {}", name, raw);
                value
            }
            Err(_) => {
                warn!("Invalid {} in environment: {}. Keeping configured value.", name, raw);
                current
            }
        },
        Err(_) => current,
    }
}

impl DiskConfig {
    pub fn new(capacity: usize, block_size: u64) -> Self {
        Self {
            capacity,
            block_size,
            ..Self::default()
        }
    }

    /// Apply `DISK_CAPACITY`, `DISK_BLOCK_SIZE` and `DISK_DATAPORT_SIZE`
    pub fn with_env_overrides(self) -> Self {
        Self {
            capacity: env_override("DISK_CAPACITY", self.capacity),
            block_size: env_override("DISK_BLOCK_SIZE", self.block_size),
            dataport_size: env_override("DISK_DATAPORT_SIZE", self.dataport_size),
            initial_removal_budget: self.initial_removal_budget,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.dataport_size == 0 {
            return Err(ConfigError::ZeroDataport);
        }
        if self.capacity as u64 % self.block_size != 0 {
            return Err(ConfigError::Misaligned {
                capacity: self.capacity,
                block_size: self.block_size,
            });
        }
        Ok(())
    }

    /// Create a disk based on the configuration
    pub fn create_disk(&self) -> Result<RemovableDisk, ConfigError> {
        self.validate()?;
        let mut disk = RemovableDisk::new(self.capacity, self.block_size);
        if self.initial_removal_budget >= 0 {
            disk.arm_removal(self.initial_removal_budget);
        }
        Ok(disk)
    }

    pub fn create_dataport(&self) -> DataPort {
        DataPort::new(self.dataport_size)
    }
}
