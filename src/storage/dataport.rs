//! Shared bulk-transfer buffer
//!
//! The transport owns this buffer and lends it to the disk for each read or
//! write; the control channel only carries offsets, sizes and status codes.

use crate::storage::StorageError;

/// Default dataport size: one page
pub const DEFAULT_DATAPORT_SIZE: usize = 4096;

pub struct DataPort {
    buf: Vec<u8>,
    // bytes at the front that hold data from the last load or read
    filled: usize,
}

impl DataPort {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Whether a transfer of `size` bytes fits in the buffer
    pub fn fits(&self, size: i64) -> bool {
        size >= 0 && size as u128 <= self.buf.len() as u128
    }

    /// Number of valid bytes staged by the last `load` or device read
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Whether the first `size` bytes were all staged by the caller
    pub fn holds(&self, size: i64) -> bool {
        size >= 0 && size as u128 <= self.filled as u128
    }

    pub(crate) fn mark_filled(&mut self, len: usize) {
        self.filled = len.min(self.buf.len());
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Copy `data` to the front of the buffer and zero the rest
    pub fn load(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > self.buf.len() {
            return Err(StorageError::OutOfBounds);
        }
        self.buf[..data.len()].copy_from_slice(data);
        self.buf[data.len()..].fill(0);
        self.filled = data.len();
        Ok(())
    }

    /// First `len` bytes of the buffer, clamped to its capacity
    pub fn contents(&self, len: usize) -> &[u8] {
        &self.buf[..len.min(self.buf.len())]
    }
}

impl Default for DataPort {
    fn default() -> Self {
        Self::new(DEFAULT_DATAPORT_SIZE)
    }
}
