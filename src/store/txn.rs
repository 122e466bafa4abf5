//! Transactions, bucket handles and cursors
//!
//! Everything a transaction hands out (bucket handles, values, cursor
//! items) borrows from the transaction. Results that must outlive it have
//! to be copied first, and the borrow checker rejects code that forgets.

use std::collections::btree_map;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::error::{Result, SiftError};
use crate::wal::Operation;
use super::snapshot::{BucketData, Snapshot};
use super::Store;

/// Read access shared by read and write transactions
pub trait ReadView {
    /// Open a bucket by name, `None` when it does not exist
    fn bucket(&self, name: &str) -> Option<Bucket<'_>>;
}

// =============================================================================
// Bucket Handle and Cursor
// =============================================================================

/// Read handle on one bucket, valid for the enclosing transaction
#[derive(Clone, Copy)]
pub struct Bucket<'tx> {
    name: &'tx str,
    data: &'tx BucketData,
}

impl<'tx> Bucket<'tx> {
    pub(crate) fn new(name: &'tx str, data: &'tx BucketData) -> Self {
        Self { name, data }
    }

    pub fn name(&self) -> &'tx str {
        self.name
    }

    /// Point lookup
    pub fn get(&self, key: &[u8]) -> Option<&'tx [u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Cursor positioned at the first key `>= start` (or the first key)
    pub fn seek(&self, start: Option<&[u8]>) -> Cursor<'tx> {
        let lower = match start {
            Some(key) => Bound::Included(key),
            None => Bound::Unbounded,
        };
        Cursor {
            range: self.data.range::<[u8], _>((lower, Bound::Unbounded)),
        }
    }

    /// Cursor positioned at the first key
    pub fn cursor(&self) -> Cursor<'tx> {
        self.seek(None)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Forward iterator over a bucket in ascending key order
pub struct Cursor<'tx> {
    range: btree_map::Range<'tx, Vec<u8>, Vec<u8>>,
}

impl<'tx> Iterator for Cursor<'tx> {
    type Item = (&'tx [u8], &'tx [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        self.range
            .next()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

// =============================================================================
// Read Transaction
// =============================================================================

/// Consistent read-only view of the store
///
/// Holds the snapshot that was current when it began; later commits are
/// invisible to it. Any number may be open at once.
pub struct ReadTxn {
    snapshot: Arc<Snapshot>,
}

impl ReadTxn {
    pub(crate) fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    /// Names of all buckets, ascending
    pub fn bucket_names(&self) -> Vec<String> {
        self.snapshot.bucket_names().map(str::to_string).collect()
    }
}

impl ReadView for ReadTxn {
    fn bucket(&self, name: &str) -> Option<Bucket<'_>> {
        let (stored, data) = self.snapshot.bucket_entry(name)?;
        Some(Bucket::new(stored, data))
    }
}

// =============================================================================
// Write Transaction
// =============================================================================

/// Exclusive write transaction
///
/// Changes go to a private working copy and become visible only on
/// [`commit`](WriteTxn::commit). Dropping without committing discards them.
pub struct WriteTxn<'db> {
    store: &'db Store,
    _writer: MutexGuard<'db, ()>,
    working: Snapshot,
    ops: Vec<Operation>,
}

impl<'db> WriteTxn<'db> {
    pub(crate) fn new(store: &'db Store, writer: MutexGuard<'db, ()>, working: Snapshot) -> Self {
        Self {
            store,
            _writer: writer,
            working,
            ops: Vec::new(),
        }
    }

    pub fn create_bucket(&mut self, name: &str) -> Result<()> {
        self.apply(Operation::CreateBucket {
            name: name.to_string(),
        })
    }

    pub fn delete_bucket(&mut self, name: &str) -> Result<()> {
        self.apply(Operation::DeleteBucket {
            name: name.to_string(),
        })
    }

    /// Open a bucket for writing
    pub fn bucket_mut(&mut self, name: &str) -> Result<BucketMut<'_, 'db>> {
        if self.working.bucket(name).is_none() {
            return Err(SiftError::BucketNotFound(name.to_string()));
        }
        Ok(BucketMut {
            txn: self,
            name: name.to_string(),
        })
    }

    /// Number of operations staged so far
    pub fn pending(&self) -> usize {
        self.ops.len()
    }

    /// Publish all staged changes atomically
    pub fn commit(self) -> Result<()> {
        self.store.commit(self.working, self.ops)
    }

    /// Discard all staged changes
    pub fn rollback(self) {
        if !self.ops.is_empty() {
            tracing::debug!("Rolling back {} staged operations", self.ops.len());
        }
    }

    fn apply(&mut self, op: Operation) -> Result<()> {
        self.working.apply(&op)?;
        self.ops.push(op);
        Ok(())
    }
}

impl ReadView for WriteTxn<'_> {
    fn bucket(&self, name: &str) -> Option<Bucket<'_>> {
        let (stored, data) = self.working.bucket_entry(name)?;
        Some(Bucket::new(stored, data))
    }
}

/// Write handle on one bucket inside a [`WriteTxn`]
pub struct BucketMut<'t, 'db> {
    txn: &'t mut WriteTxn<'db>,
    name: String,
}

impl BucketMut<'_, '_> {
    /// Insert or replace the value under `key`
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.txn.apply(Operation::Put {
            bucket: self.name.clone(),
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Remove `key`; removing an absent key is not an error
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.txn.apply(Operation::Delete {
            bucket: self.name.clone(),
            key: key.to_vec(),
        })
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.txn
            .working
            .bucket(&self.name)
            .and_then(|data| data.get(key))
            .map(Vec::as_slice)
    }
}
