//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries. One entry holds
//! the full operation batch of one committed write transaction, so a
//! transaction is either replayed whole or not at all.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};

/// Entry header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Operations of one committed transaction, in application order
    pub batch: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create an empty bucket
    CreateBucket { name: String },

    /// Drop a bucket and everything in it
    DeleteBucket { name: String },

    /// Put a key-value pair into a bucket
    Put {
        bucket: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Delete a key from a bucket
    Delete { bucket: String, key: Vec<u8> },
}

/// Body stored after the header (the LSN lives in the header)
#[derive(Serialize, Deserialize)]
struct EntryBody {
    timestamp: u64,
    batch: Vec<Operation>,
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, batch: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            batch,
            timestamp,
        }
    }

    /// Encode as `[LSN][CRC][Len][bincode body]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(&EntryBody {
            timestamp: self.timestamp,
            batch: self.batch.clone(),
        })?;

        let len = u32::try_from(body.len())
            .map_err(|_| SiftError::WalWrite(format!("entry too large: {} bytes", body.len())))?;
        let crc = Self::compute_crc(self.lsn, &body);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode one entry, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(SiftError::WalCorruption(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let (lsn, crc, len) = Self::parse_header(&bytes[..HEADER_SIZE]);
        let body = bytes.get(HEADER_SIZE..HEADER_SIZE + len).ok_or_else(|| {
            SiftError::WalCorruption(format!(
                "incomplete body: expected {} bytes, got {}",
                len,
                bytes.len() - HEADER_SIZE
            ))
        })?;

        Self::from_parts(lsn, crc, body)
    }

    /// Split a header into (lsn, crc, body length)
    pub(crate) fn parse_header(header: &[u8]) -> (u64, u32, usize) {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&header[0..8]);
        crc.copy_from_slice(&header[8..12]);
        len.copy_from_slice(&header[12..16]);
        (
            u64::from_le_bytes(lsn),
            u32::from_le_bytes(crc),
            u32::from_le_bytes(len) as usize,
        )
    }

    /// Rebuild an entry from an already-split frame
    pub(crate) fn from_parts(lsn: u64, crc: u32, body: &[u8]) -> Result<Self> {
        let actual = Self::compute_crc(lsn, body);
        if actual != crc {
            return Err(SiftError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:08x}, computed {:08x}",
                lsn, crc, actual
            )));
        }

        let body: EntryBody = bincode::deserialize(body)
            .map_err(|e| SiftError::WalCorruption(format!("undecodable body at lsn {}: {}", lsn, e)))?;

        Ok(Self {
            lsn,
            batch: body.batch,
            timestamp: body.timestamp,
        })
    }

    /// CRC32 over the LSN and body bytes
    pub fn compute_crc(lsn: u64, body: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(body);
        hasher.finalize()
    }
}
