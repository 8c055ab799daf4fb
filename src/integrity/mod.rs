//! Integrity verification over the whole medium
//!
//! A fingerprint streams every byte of the disk through an MD5 context by
//! driving the public block-device API. Two fingerprints are equal iff no
//! byte changed between them, which lets callers prove that a rejected
//! operation left storage untouched.

use crate::storage::{check_transfer, BlockDevice, DataPort, StorageError};
use log::{debug, error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Digest of the full medium content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<md5::Digest> for Fingerprint {
    fn from(digest: md5::Digest) -> Self {
        Self(digest.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Fingerprint the whole device, reading it in dataport-sized chunks.
    ///
    /// Consumes one unit of presence budget for the size query plus one per
    /// chunk. Any failed or short read aborts without producing a digest.
    pub fn fingerprint<D: BlockDevice + ?Sized>(
        device: &mut D,
        port: &mut DataPort,
    ) -> Result<Fingerprint, StorageError> {
        let chunk = port.capacity() as u64;
        if chunk == 0 {
            error!("Cannot fingerprint through an empty dataport");
            return Err(StorageError::Generic);
        }

        let total = device.size()?;
        let mut context = md5::Context::new();
        let mut offset = 0u64;
        while offset < total {
            let len = chunk.min(total - offset);
            let (offset_arg, len_arg) = (offset as i64, len as i64);
            let read = device.read(offset_arg, len_arg, port).map_err(|e| {
                error!("Fingerprint aborted at offset {}: {}", offset, e);
                e
            })?;
            check_transfer(len_arg, read)?;
            context.consume(port.contents(len as usize));
            offset += len;
        }

        let fingerprint = Fingerprint::from(context.compute());
        debug!("Fingerprint over {} bytes: {}", total, fingerprint);
        Ok(fingerprint)
    }
}
