//! Checkpoint files
//!
//! A checkpoint is a full dump of a [`Snapshot`] taken at a known LSN.
//! Once written, every WAL entry up to that LSN is redundant.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                           │
//! │   Magic: "SFKV" (4) | Version: u16 (2) | LSN: u64 (8)       │
//! │   BucketCount: u32 (4)                                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Bucket Block (repeated BucketCount times)                   │
//! │   [NameLen: u32][Name][EntryCount: u64]                     │
//! │   [KeyLen: u32][ValLen: u32][Key][Value] ... per entry      │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                            │
//! │   DataCRC: u32 (4) | Padding (4)                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SiftError};
use super::snapshot::{BucketData, Snapshot};

/// Magic bytes identifying a SiftKV checkpoint file
pub(crate) const MAGIC: &[u8; 4] = b"SFKV";

/// Current checkpoint format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + LSN (8) + BucketCount (4)
pub(crate) const HEADER_SIZE: usize = 18;

/// Footer size: DataCRC (4) + Padding (4)
pub(crate) const FOOTER_SIZE: usize = 8;

/// Summary of a written checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    pub path: PathBuf,
    pub lsn: u64,
    pub bucket_count: u32,
    pub entry_count: u64,
    pub file_size: u64,
}

/// Writes and loads checkpoint files
pub struct Checkpoint;

impl Checkpoint {
    /// Write `snapshot` to `path` atomically (temp file + rename)
    pub fn write(path: &Path, snapshot: &Snapshot, lsn: u64) -> Result<CheckpointInfo> {
        let tmp_path = path.with_extension("ckpt.tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut writer = BlockWriter::new(BufWriter::new(file));

        let bucket_count = u32::try_from(snapshot.bucket_count())
            .map_err(|_| SiftError::Storage("too many buckets for checkpoint".to_string()))?;

        writer.raw(MAGIC)?;
        writer.raw(&VERSION.to_le_bytes())?;
        writer.raw(&lsn.to_le_bytes())?;
        writer.raw(&bucket_count.to_le_bytes())?;

        let mut entry_count = 0u64;
        for (name, data) in snapshot.iter() {
            writer.bytes(name.as_bytes())?;
            writer.hashed(&(data.len() as u64).to_le_bytes())?;
            for (key, value) in data {
                writer.hashed(&(key.len() as u32).to_le_bytes())?;
                writer.hashed(&(value.len() as u32).to_le_bytes())?;
                writer.hashed(key)?;
                writer.hashed(value)?;
            }
            entry_count += data.len() as u64;
        }

        let crc = writer.hasher.finalize();
        let mut out = writer.out;
        out.write_all(&crc.to_le_bytes())?;
        out.write_all(&[0u8; 4])?;
        out.flush()?;

        let file = out
            .into_inner()
            .map_err(|e| SiftError::Storage(format!("Failed to flush checkpoint: {}", e)))?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();
        drop(file);

        fs::rename(&tmp_path, path)?;

        Ok(CheckpointInfo {
            path: path.to_path_buf(),
            lsn,
            bucket_count,
            entry_count,
            file_size,
        })
    }

    /// Load a checkpoint, returning its snapshot and LSN
    pub fn load(path: &Path) -> Result<(Snapshot, u64)> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(SiftError::Storage(format!(
                "Checkpoint too short: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(SiftError::Storage(format!(
                "Invalid checkpoint magic: expected SFKV, got {:?}",
                &bytes[0..4]
            )));
        }

        let mut header = Slice::new(&bytes[4..HEADER_SIZE]);
        let version = u16::from_le_bytes(header.array()?);
        if version != VERSION {
            return Err(SiftError::Storage(format!(
                "Unsupported checkpoint version: {}",
                version
            )));
        }
        let lsn = u64::from_le_bytes(header.array()?);
        let bucket_count = u32::from_le_bytes(header.array()?);

        let data_end = bytes.len() - FOOTER_SIZE;
        let data = &bytes[HEADER_SIZE..data_end];
        let mut footer = Slice::new(&bytes[data_end..]);
        let stored_crc = u32::from_le_bytes(footer.array()?);
        let actual_crc = crc32fast::hash(data);
        if stored_crc != actual_crc {
            return Err(SiftError::Storage(format!(
                "Checkpoint CRC mismatch: stored {:08x}, computed {:08x}",
                stored_crc, actual_crc
            )));
        }

        let mut snapshot = Snapshot::new();
        let mut body = Slice::new(data);
        for _ in 0..bucket_count {
            let name_len = u32::from_le_bytes(body.array()?) as usize;
            let name = String::from_utf8(body.take(name_len)?.to_vec())
                .map_err(|e| SiftError::Storage(format!("Invalid bucket name: {}", e)))?;
            let entries = u64::from_le_bytes(body.array()?);

            let mut bucket = BucketData::new();
            for _ in 0..entries {
                let key_len = u32::from_le_bytes(body.array()?) as usize;
                let val_len = u32::from_le_bytes(body.array()?) as usize;
                let key = body.take(key_len)?.to_vec();
                let value = body.take(val_len)?.to_vec();
                bucket.insert(key, value);
            }
            snapshot.insert_bucket(name, bucket);
        }

        Ok((snapshot, lsn))
    }
}

/// Buffered writer that checksums everything after the header
struct BlockWriter {
    out: BufWriter<File>,
    hasher: crc32fast::Hasher,
}

impl BlockWriter {
    fn new(out: BufWriter<File>) -> Self {
        Self {
            out,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Header bytes (not checksummed)
    fn raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    fn hashed(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        self.hasher.update(bytes);
        Ok(())
    }

    /// Length-prefixed byte string
    fn bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.hashed(&(bytes.len() as u32).to_le_bytes())?;
        self.hashed(bytes)
    }
}

/// Bounds-checked reader over a byte slice
struct Slice<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Slice<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                SiftError::Storage(format!(
                    "Checkpoint truncated: wanted {} bytes at offset {}",
                    len, self.pos
                ))
            })?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
