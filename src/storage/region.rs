//! Fixed-capacity byte region acting as the storage medium

use crate::storage::StorageError;

/// Zero-initialised byte array with bounds-checked access
pub struct StorageRegion {
    bytes: Vec<u8>,
}

impl StorageRegion {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// True iff `[offset, offset + size)` lies inside the region.
    ///
    /// Both operands are widened to u128 before adding so the sum cannot wrap.
    pub fn valid_range(&self, offset: i64, size: i64) -> bool {
        if offset < 0 || size < 0 {
            return false;
        }
        let end = offset as u128 + size as u128;
        end <= self.bytes.len() as u128
    }

    fn span(&self, offset: i64, size: i64) -> Result<std::ops::Range<usize>, StorageError> {
        if !self.valid_range(offset, size) {
            return Err(StorageError::OutOfBounds);
        }
        // valid_range bounds both values by the capacity, which is a usize
        let start = offset as usize;
        Ok(start..start + size as usize)
    }

    /// Overwrite `[offset, offset + data.len())` with `data`
    pub fn copy_in(&mut self, offset: i64, data: &[u8]) -> Result<(), StorageError> {
        let range = self.span(offset, data.len() as i64)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Copy `[offset, offset + dst.len())` into `dst`
    pub fn copy_out(&self, offset: i64, dst: &mut [u8]) -> Result<(), StorageError> {
        let range = self.span(offset, dst.len() as i64)?;
        dst.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    pub fn fill(&mut self, offset: i64, size: i64, value: u8) -> Result<(), StorageError> {
        let range = self.span(offset, size)?;
        self.bytes[range].fill(value);
        Ok(())
    }

    /// Raw view of the whole medium (for test verification)
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range_edges() {
        let region = StorageRegion::new(1024);

        assert!(region.valid_range(0, 0));
        assert!(region.valid_range(0, 1024));
        assert!(region.valid_range(1024, 0));
        assert!(region.valid_range(1000, 24));

        assert!(!region.valid_range(0, 1025));
        assert!(!region.valid_range(1024, 1));
        assert!(!region.valid_range(1025, 0));
        assert!(!region.valid_range(-1, 0));
        assert!(!region.valid_range(0, -1));
    }

    #[test]
    fn test_valid_range_does_not_wrap() {
        let region = StorageRegion::new(1024);

        assert!(!region.valid_range(i64::MAX, i64::MAX));
        assert!(!region.valid_range(i64::MAX, 1));
        assert!(!region.valid_range(1, i64::MAX));
    }

    #[test]
    fn test_copy_in_and_out() {
        let mut region = StorageRegion::new(64);
        region.copy_in(10, &[1, 2, 3, 4]).unwrap();

        let mut out = [0u8; 6];
        region.copy_out(9, &mut out).unwrap();
        assert_eq!(out, [0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_rejected_copy_leaves_region_untouched() {
        let mut region = StorageRegion::new(16);
        assert_eq!(region.copy_in(12, &[0xAA; 8]), Err(StorageError::OutOfBounds));
        assert!(region.as_slice().iter().all(|&b| b == 0));

        let mut out = [0x55u8; 4];
        assert_eq!(region.copy_out(14, &mut out), Err(StorageError::OutOfBounds));
        assert_eq!(out, [0x55; 4]);
    }

    #[test]
    fn test_fill() {
        let mut region = StorageRegion::new(32);
        region.fill(8, 8, 0xFF).unwrap();

        let bytes = region.as_slice();
        assert!(bytes[..8].iter().all(|&b| b == 0));
        assert!(bytes[8..16].iter().all(|&b| b == 0xFF));
        assert!(bytes[16..].iter().all(|&b| b == 0));

        assert_eq!(region.fill(30, 4, 0xFF), Err(StorageError::OutOfBounds));
    }
}
