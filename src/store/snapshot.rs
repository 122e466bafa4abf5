//! Snapshot state
//!
//! The complete contents of the store at one commit point: every bucket,
//! each an ordered map from key to value. Buckets sit behind `Arc` so a
//! write transaction copies only the buckets it actually modifies.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, SiftError};
use crate::wal::Operation;

/// Ordered contents of one bucket
pub type BucketData = BTreeMap<Vec<u8>, Vec<u8>>;

/// Largest accepted key, in bytes
pub const MAX_KEY_SIZE: usize = 32768;

/// Largest accepted value, in bytes (lengths are stored as u32)
pub const MAX_VALUE_SIZE: usize = u32::MAX as usize - 1;

/// Immutable-once-published view of all buckets
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    buckets: BTreeMap<String, Arc<BucketData>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a bucket by name
    pub fn bucket(&self, name: &str) -> Option<&BucketData> {
        self.buckets.get(name).map(|b| b.as_ref())
    }

    /// Look up a bucket together with its stored name
    pub fn bucket_entry(&self, name: &str) -> Option<(&str, &BucketData)> {
        self.buckets
            .get_key_value(name)
            .map(|(stored, data)| (stored.as_str(), data.as_ref()))
    }

    /// Bucket names in ascending order
    pub fn bucket_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Iterate over (name, contents) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BucketData)> {
        self.buckets.iter().map(|(name, data)| (name.as_str(), data.as_ref()))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Install a fully built bucket (checkpoint loading)
    pub(crate) fn insert_bucket(&mut self, name: String, data: BucketData) {
        self.buckets.insert(name, Arc::new(data));
    }

    /// Apply one logged operation
    ///
    /// This is the only mutation path, shared by live write transactions
    /// and WAL replay, so both enforce the same rules.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::CreateBucket { name } => {
                if name.is_empty() {
                    return Err(SiftError::InvalidKey("bucket name required".to_string()));
                }
                if self.buckets.contains_key(name) {
                    return Err(SiftError::BucketExists(name.clone()));
                }
                self.buckets.insert(name.clone(), Arc::new(BucketData::new()));
            }
            Operation::DeleteBucket { name } => {
                if self.buckets.remove(name).is_none() {
                    return Err(SiftError::BucketNotFound(name.clone()));
                }
            }
            Operation::Put { bucket, key, value } => {
                validate_key(key)?;
                if value.len() > MAX_VALUE_SIZE {
                    return Err(SiftError::ValueTooLarge(value.len()));
                }
                let data = self.bucket_mut(bucket)?;
                Arc::make_mut(data).insert(key.clone(), value.clone());
            }
            Operation::Delete { bucket, key } => {
                let data = self.bucket_mut(bucket)?;
                // Deleting an absent key leaves the bucket untouched.
                if data.contains_key(key) {
                    Arc::make_mut(data).remove(key);
                }
            }
        }
        Ok(())
    }

    fn bucket_mut(&mut self, name: &str) -> Result<&mut Arc<BucketData>> {
        self.buckets
            .get_mut(name)
            .ok_or_else(|| SiftError::BucketNotFound(name.to_string()))
    }
}

/// Reject keys the store cannot hold
pub fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(SiftError::InvalidKey("key required".to_string()));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(SiftError::InvalidKey(format!(
            "key too large: {} bytes (max {})",
            key.len(),
            MAX_KEY_SIZE
        )));
    }
    Ok(())
}
