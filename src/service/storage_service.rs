//! Storage service layer that serialises access to the removable disk
//!
//! The disk itself is single-threaded; the server is not. All calls go
//! through one mutex guarding the disk together with its dataport, so a
//! request observes and consumes presence budget atomically.

use crate::integrity::{Fingerprint, IntegrityVerifier};
use crate::storage::{BlockDevice, DataPort, RemovableDisk, RemovalControl, StorageError};
use log::{debug, info};
use std::sync::{Mutex, MutexGuard};

struct DiskSession {
    disk: RemovableDisk,
    port: DataPort,
}

pub struct StorageService {
    session: Mutex<DiskSession>,
    dataport_size: usize,
}

impl StorageService {
    /// Create a new storage service owning the disk and its dataport
    pub fn new(disk: RemovableDisk, port: DataPort) -> Self {
        let dataport_size = port.capacity();
        Self {
            session: Mutex::new(DiskSession { disk, port }),
            dataport_size,
        }
    }

    pub fn dataport_size(&self) -> usize {
        self.dataport_size
    }

    fn lock(&self) -> MutexGuard<'_, DiskSession> {
        // poisoning never leaves partial disk state behind
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read `size` bytes at `offset`, returning a copy of the dataport contents
    pub fn read(&self, offset: i64, size: i64) -> Result<Vec<u8>, StorageError> {
        let mut session = self.lock();
        let DiskSession { disk, port } = &mut *session;
        let read = disk.read(offset, size, port)?;
        Ok(port.contents(read as usize).to_vec())
    }

    /// Load `data` into the dataport and write its first `size` bytes.
    ///
    /// Bytes beyond the dataport capacity are dropped before the call; the
    /// disk then rejects any `size` the dataport cannot hold or that exceeds
    /// the staged payload.
    pub fn write(&self, offset: i64, size: i64, data: &[u8]) -> Result<u64, StorageError> {
        let mut session = self.lock();
        let DiskSession { disk, port } = &mut *session;
        let staged = &data[..data.len().min(port.capacity())];
        port.load(staged)?;
        debug!("Staged {} of {} payload bytes in dataport", staged.len(), data.len());
        disk.write(offset, size, port)
    }

    pub fn erase(&self, offset: i64, size: i64) -> Result<u64, StorageError> {
        self.lock().disk.erase(offset, size)
    }

    pub fn size(&self) -> Result<u64, StorageError> {
        self.lock().disk.size()
    }

    pub fn block_size(&self) -> Result<u64, StorageError> {
        self.lock().disk.block_size()
    }

    pub fn state(&self) -> Result<u32, StorageError> {
        self.lock().disk.state()
    }

    pub fn trigger_removal(&self, budget: i64) {
        info!("Removal triggered with budget {}", budget);
        self.lock().disk.trigger_removal(budget);
    }

    pub fn fingerprint(&self) -> Result<Fingerprint, StorageError> {
        let mut session = self.lock();
        let DiskSession { disk, port } = &mut *session;
        IntegrityVerifier::fingerprint(disk, port)
    }
}
