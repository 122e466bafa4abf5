//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::WalSyncStrategy;
use crate::error::{Result, SiftError};
use super::{Operation, WalEntry, WalReader};

/// Writes entries to the WAL file
pub struct WalWriter {
    file: File,
    /// LSN handed to the next appended entry
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries appended since the last fsync
    unsynced: usize,
    /// Current file length in bytes
    size: u64,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Existing entries are scanned so new entries continue the LSN
    /// sequence. Call after recovery has trimmed any partial tail.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut last_lsn = 0;
        for entry in WalReader::open(path)?.entries() {
            match entry {
                Ok(entry) => last_lsn = last_lsn.max(entry.lsn),
                Err(SiftError::WalCorruption(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        let size = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            file,
            current_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            size,
        })
    }

    /// Append one committed batch to the WAL, returning its LSN
    ///
    /// Either the entry is written (and synced, if due) or the file and the
    /// LSN are left exactly as before the call.
    pub fn append(&mut self, batch: Vec<Operation>) -> Result<u64> {
        let lsn = self.current_lsn;
        let bytes = WalEntry::new(lsn, batch).serialize()?;

        if let Err(e) = self.write_entry(&bytes) {
            self.discard_tail();
            return Err(SiftError::WalWrite(format!("append lsn {}: {}", lsn, e)));
        }

        self.size += bytes.len() as u64;
        self.current_lsn += 1;
        Ok(lsn)
    }

    fn write_entry(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Cut the file back to the last fully appended entry
    fn discard_tail(&mut self) {
        if let Err(e) = self.file.set_len(self.size) {
            // Recovery drops a torn or unreplayable tail on the next open.
            tracing::error!("Failed to discard partial WAL entry: {}", e);
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Discard all entries (after a checkpoint made them redundant)
    ///
    /// LSNs keep counting up so a checkpoint's LSN stays comparable.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.size = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// Move the LSN sequence forward to at least `next_lsn`
    pub fn advance_to(&mut self, next_lsn: u64) {
        self.current_lsn = self.current_lsn.max(next_lsn);
    }

    /// Get the current LSN (the one the next append will use)
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Current WAL size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}
