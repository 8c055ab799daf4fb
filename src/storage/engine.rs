//! In-memory removable disk
//!
//! Combines the storage region with the presence simulator behind the
//! `BlockDevice` contract. Every gated operation checks presence first, so a
//! removed medium never reveals whether a range would have been valid.

use crate::storage::presence::{PresenceSimulator, PresenceState};
use crate::storage::region::StorageRegion;
use crate::storage::{BlockDevice, DataPort, RemovalControl, StorageError, ERASE_PATTERN};
use log::{debug, warn};

pub struct RemovableDisk {
    region: StorageRegion,
    presence: PresenceSimulator,
    block_size: u64,
}

impl RemovableDisk {
    pub fn new(capacity: usize, block_size: u64) -> Self {
        Self {
            region: StorageRegion::new(capacity),
            presence: PresenceSimulator::new(),
            block_size,
        }
    }

    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    pub fn presence_state(&self) -> PresenceState {
        self.presence.state()
    }

    pub fn presence(&self) -> &PresenceSimulator {
        &self.presence
    }

    /// Raw view of the medium, bypassing presence (for test verification)
    pub fn raw(&self) -> &[u8] {
        self.region.as_slice()
    }

    pub fn arm_removal(&mut self, budget: i64) {
        self.presence.arm(budget);
    }

    fn ensure_present(&mut self, op: &str) -> Result<(), StorageError> {
        if self.presence.check_and_consume() {
            Ok(())
        } else {
            warn!("{} rejected: medium not present", op);
            Err(StorageError::DeviceNotPresent)
        }
    }

    fn ensure_range(&self, op: &str, offset: i64, size: i64) -> Result<(), StorageError> {
        if self.region.valid_range(offset, size) {
            Ok(())
        } else {
            warn!(
                "{} rejected: offset {} size {} outside capacity {}",
                op,
                offset,
                size,
                self.region.capacity()
            );
            Err(StorageError::OutOfBounds)
        }
    }

    fn ensure_port(&self, op: &str, port: &DataPort, size: i64) -> Result<(), StorageError> {
        if port.fits(size) {
            Ok(())
        } else {
            warn!("{} rejected: size {} exceeds dataport of {} bytes", op, size, port.capacity());
            Err(StorageError::OutOfBounds)
        }
    }

    fn ensure_staged(&self, port: &DataPort, size: i64) -> Result<(), StorageError> {
        if port.holds(size) {
            Ok(())
        } else {
            warn!("write rejected: size {} but only {} bytes staged in dataport", size, port.filled());
            Err(StorageError::OutOfBounds)
        }
    }
}

impl BlockDevice for RemovableDisk {
    fn read(&mut self, offset: i64, size: i64, port: &mut DataPort) -> Result<u64, StorageError> {
        self.ensure_present("read")?;
        self.ensure_range("read", offset, size)?;
        self.ensure_port("read", port, size)?;

        let len = size as usize;
        self.region.copy_out(offset, &mut port.as_mut_slice()[..len])?;
        port.mark_filled(len);
        debug!("Read {} bytes at offset {}", len, offset);
        Ok(len as u64)
    }

    fn write(&mut self, offset: i64, size: i64, port: &DataPort) -> Result<u64, StorageError> {
        self.ensure_present("write")?;
        self.ensure_range("write", offset, size)?;
        self.ensure_port("write", port, size)?;
        self.ensure_staged(port, size)?;

        let len = size as usize;
        self.region.copy_in(offset, &port.as_slice()[..len])?;
        debug!("Wrote {} bytes at offset {}", len, offset);
        Ok(len as u64)
    }

    fn erase(&mut self, offset: i64, size: i64) -> Result<u64, StorageError> {
        self.ensure_present("erase")?;
        self.ensure_range("erase", offset, size)?;

        self.region.fill(offset, size, ERASE_PATTERN)?;
        debug!("Erased {} bytes at offset {}", size, offset);
        Ok(size as u64)
    }

    fn size(&mut self) -> Result<u64, StorageError> {
        self.ensure_present("size")?;
        Ok(self.region.capacity() as u64)
    }

    fn block_size(&mut self) -> Result<u64, StorageError> {
        Ok(self.block_size)
    }

    fn state(&mut self) -> Result<u32, StorageError> {
        self.ensure_present("state")?;
        Err(StorageError::NotSupported)
    }
}

impl RemovalControl for RemovableDisk {
    fn trigger_removal(&mut self, budget: i64) {
        self.arm_removal(budget);
    }
}
