//! Block Storage Layer Abstraction
//!
//! This module provides the block-device contract consumed by filesystem
//! adapters, together with the in-memory removable disk that implements it.
//! Higher layers (integrity checks, scenario harness, RPC service) only talk
//! to the `BlockDevice` and `RemovalControl` traits.

pub mod config;
pub mod dataport;
pub mod engine;
pub mod presence;
pub mod region;


use serde::{Deserialize, Serialize};
use std::fmt;

pub use dataport::DataPort;
pub use engine::RemovableDisk;

/// Byte value written by erase, emulating flash-erase semantics
pub const ERASE_PATTERN: u8 = 0xFF;

/// Errors reported by block-device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageError {
    /// The medium is (simulated as) removed
    DeviceNotPresent,
    /// Requested range is negative, overflows, or exceeds capacity
    OutOfBounds,
    /// Feature stub, e.g. extended state flags
    NotSupported,
    /// A caller detected a short transfer; the engine broke its own invariant
    Aborted,
    /// Internal failure with no more specific classification
    Generic,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DeviceNotPresent => write!(f, "device not present"),
            StorageError::OutOfBounds => write!(f, "access out of bounds"),
            StorageError::NotSupported => write!(f, "operation not supported"),
            StorageError::Aborted => write!(f, "operation aborted"),
            StorageError::Generic => write!(f, "generic storage error"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Status code as carried on the call surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    DeviceNotPresent,
    OutOfBounds,
    NotSupported,
    Aborted,
    Generic,
}

impl From<StorageError> for Status {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DeviceNotPresent => Status::DeviceNotPresent,
            StorageError::OutOfBounds => Status::OutOfBounds,
            StorageError::NotSupported => Status::NotSupported,
            StorageError::Aborted => Status::Aborted,
            StorageError::Generic => Status::Generic,
        }
    }
}

impl<T> From<&Result<T, StorageError>> for Status {
    fn from(result: &Result<T, StorageError>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(e) => Status::from(*e),
        }
    }
}

/// Trait defining the block-device interface
///
/// Every method except `block_size` is gated by medium presence: it first
/// consults the presence simulator and fails with `DeviceNotPresent` before
/// doing any validation or I/O. Failed transfers process zero bytes.
pub trait BlockDevice {
    /// Copy `size` bytes starting at `offset` into the front of `port`
    fn read(&mut self, offset: i64, size: i64, port: &mut DataPort) -> Result<u64, StorageError>;

    /// Copy the first `size` bytes of `port` to `offset`
    fn write(&mut self, offset: i64, size: i64, port: &DataPort) -> Result<u64, StorageError>;

    /// Fill `size` bytes starting at `offset` with `ERASE_PATTERN`
    fn erase(&mut self, offset: i64, size: i64) -> Result<u64, StorageError>;

    /// Total capacity of the medium in bytes (not the amount used)
    fn size(&mut self) -> Result<u64, StorageError>;

    /// Minimum addressable/erasable unit.
    ///
    /// This is a static property of the device class and is NOT gated by
    /// medium presence; it succeeds even while the medium is removed.
    fn block_size(&mut self) -> Result<u64, StorageError>;

    /// Extended status flags. Currently a stub: when the medium is present
    /// this always fails with `NotSupported`.
    fn state(&mut self) -> Result<u32, StorageError>;
}

/// Administrative control over the simulated medium presence
pub trait RemovalControl {
    /// Arm the removal countdown.
    ///
    /// `0` makes the next gated operation fail, `n > 0` lets exactly `n`
    /// gated operations succeed first, and a negative value disables removal.
    fn trigger_removal(&mut self, budget: i64);

    /// Pretend the medium was pulled before the next gated operation
    fn remove(&mut self) {
        self.trigger_removal(0);
    }

    /// Put the medium back permanently
    fn attach(&mut self) {
        self.trigger_removal(-1);
    }
}

/// Caller-side consistency check of a transfer count.
///
/// The engine either processes the full request or fails; a short count
/// means the device broke its contract and is reported as `Aborted`.
pub fn check_transfer(requested: i64, processed: u64) -> Result<(), StorageError> {
    if requested < 0 || requested as u64 != processed {
        return Err(StorageError::Aborted);
    }
    Ok(())
}
