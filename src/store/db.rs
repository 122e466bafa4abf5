//! Store
//!
//! Owns the published snapshot, the WAL and the checkpoint file, and hands
//! out transactions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::Result;
use crate::wal::{Operation, WalRecovery, WalWriter};
use super::checkpoint::{Checkpoint, CheckpointInfo};
use super::snapshot::Snapshot;
use super::txn::{ReadTxn, WriteTxn};

/// The embedded ordered key-value store
///
/// ## Concurrency Model: Snapshot Readers / Single Writer
///
/// - **Reads**: `begin_read` clones the `Arc` of the current snapshot
///   under a brief read lock, then runs lock-free against it.
/// - **Writes**: serialized by `write_lock`. A write transaction edits a
///   copy-on-write working set; commit appends one WAL entry and then
///   swaps the published snapshot pointer.
pub struct Store {
    data_dir: PathBuf,
    wal_path: PathBuf,
    checkpoint_path: PathBuf,

    /// Last committed state; replaced wholesale on commit
    current: RwLock<Arc<Snapshot>>,

    /// Write-ahead log (only touched with `write_lock` held)
    wal: Mutex<WalWriter>,

    /// Serializes write transactions and checkpoints
    write_lock: Mutex<()>,

    /// WAL size that triggers a checkpoint after commit
    checkpoint_threshold: u64,
}

impl Store {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const CHECKPOINT_FILENAME: &'static str = "data.ckpt";

    /// Open or create a store under `config.data_dir`
    ///
    /// On startup:
    /// 1. Load the checkpoint, if any
    /// 2. Replay WAL entries newer than the checkpoint
    /// 3. Checkpoint again if anything was replayed, then truncate the WAL
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let checkpoint_path = config.data_dir.join(Self::CHECKPOINT_FILENAME);

        let (mut snapshot, checkpoint_lsn) = if checkpoint_path.exists() {
            let (snapshot, lsn) = Checkpoint::load(&checkpoint_path)?;
            tracing::info!(
                "Loaded checkpoint at lsn {} ({} buckets)",
                lsn,
                snapshot.bucket_count()
            );
            (snapshot, lsn)
        } else {
            (Snapshot::new(), 0)
        };

        let mut replayed = 0u64;
        let mut last_lsn = checkpoint_lsn;
        if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;
            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    result.entries_recovered,
                    result.entries_corrupted,
                    result.last_lsn
                );
            }

            for entry in entries.into_iter().filter(|e| e.lsn > checkpoint_lsn) {
                // Replay the batch on a scratch copy so a batch that no longer
                // applies cleanly is dropped whole, like an aborted transaction.
                let mut next = snapshot.clone();
                match entry.batch.iter().try_for_each(|op| next.apply(op)) {
                    Ok(()) => {
                        snapshot = next;
                        replayed += 1;
                    }
                    Err(e) => tracing::warn!("Skipping WAL entry lsn {}: {}", entry.lsn, e),
                }
                last_lsn = last_lsn.max(entry.lsn);
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.advance_to(last_lsn + 1);

        let store = Self {
            data_dir: config.data_dir.clone(),
            wal_path,
            checkpoint_path,
            current: RwLock::new(Arc::new(snapshot)),
            wal: Mutex::new(wal),
            write_lock: Mutex::new(()),
            checkpoint_threshold: config.checkpoint_threshold,
        };

        if replayed > 0 {
            tracing::info!("Checkpointing {} replayed transactions", replayed);
            store.checkpoint()?;
        }

        Ok(store)
    }

    /// Start a read transaction on the current snapshot
    pub fn begin_read(&self) -> ReadTxn {
        ReadTxn::new(Arc::clone(&self.current.read()))
    }

    /// Start a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> WriteTxn<'_> {
        let guard = self.write_lock.lock();
        let working = Snapshot::clone(&self.current.read());
        WriteTxn::new(self, guard, working)
    }

    /// Run `f` inside a read transaction
    pub fn view<R>(&self, f: impl FnOnce(&ReadTxn) -> R) -> R {
        let txn = self.begin_read();
        f(&txn)
    }

    /// Run `f` inside a write transaction, committing on `Ok`
    pub fn update<R>(&self, f: impl FnOnce(&mut WriteTxn<'_>) -> Result<R>) -> Result<R> {
        let mut txn = self.begin_write();
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.rollback();
                Err(e)
            }
        }
    }

    /// Called by `WriteTxn::commit` with the writer lock held
    ///
    /// Fails only if the WAL append fails, in which case nothing is
    /// published. A failed threshold checkpoint is logged and retried at the
    /// next commit.
    pub(crate) fn commit(&self, working: Snapshot, ops: Vec<Operation>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let wal_size = {
            let mut wal = self.wal.lock();
            wal.append(ops)?;
            wal.size()
        };

        // The batch is durable from here on; the commit stands.
        *self.current.write() = Arc::new(working);

        if wal_size >= self.checkpoint_threshold {
            if let Err(e) = self.checkpoint_locked() {
                tracing::error!("Checkpoint after commit failed, WAL kept: {}", e);
            }
        }
        Ok(())
    }

    /// Write a checkpoint and truncate the WAL
    pub fn checkpoint(&self) -> Result<CheckpointInfo> {
        let _writer = self.write_lock.lock();
        self.checkpoint_locked()
    }

    /// Checkpoint implementation (called with the writer lock held)
    fn checkpoint_locked(&self) -> Result<CheckpointInfo> {
        let snapshot = Arc::clone(&self.current.read());
        let mut wal = self.wal.lock();
        let lsn = wal.current_lsn().saturating_sub(1);

        let info = Checkpoint::write(&self.checkpoint_path, &snapshot, lsn)?;
        wal.truncate()?;

        tracing::debug!(
            "Checkpoint at lsn {}: {} buckets, {} entries, {} bytes",
            info.lsn,
            info.bucket_count,
            info.entry_count,
            info.file_size
        );
        Ok(info)
    }

    /// Close the store gracefully
    ///
    /// Writes a final checkpoint so the next open has nothing to replay.
    pub fn close(self) -> Result<()> {
        self.checkpoint()?;
        self.wal.lock().sync()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.lock().size()
    }
}
