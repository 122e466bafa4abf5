//! Query executor
//!
//! Runs a bounded cursor scan over one bucket, filters with find
//! conditions, orders with sort keys and copies the survivors out of the
//! transaction.
//!
//! ## Algorithm
//! 1. Open the bucket (`BucketNotFound` if absent)
//! 2. Seek to `start` (or the first key)
//! 3. Walk forward until a key exceeds `end` or the cursor is exhausted
//! 4. Keep records that pass every condition, in key order
//! 5. Stable-sort the kept set when sort keys are given
//! 6. Copy each kept value into an owned buffer
//!
//! No row limit is applied; `start`/`end` are the only bounds.

use bytes::Bytes;

use crate::error::{Result, SiftError};
use crate::store::ReadView;
use super::budget::ScanBudget;
use super::condition::{self, FindCondition};
use super::sort::{self, SortKey};

/// Everything a query needs besides the transaction
#[derive(Debug, Clone, Default)]
pub struct QuerySpec<'a> {
    pub bucket: &'a str,
    /// Inclusive lower key bound
    pub start: Option<&'a [u8]>,
    /// Inclusive upper key bound
    pub end: Option<&'a [u8]>,
    pub conditions: &'a [FindCondition],
    pub sort_keys: &'a [SortKey],
}

impl<'a> QuerySpec<'a> {
    /// Unfiltered, unsorted scan of a whole bucket
    pub fn all(bucket: &'a str) -> Self {
        Self {
            bucket,
            ..Self::default()
        }
    }

    pub fn range(mut self, start: Option<&'a [u8]>, end: Option<&'a [u8]>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn conditions(mut self, conditions: &'a [FindCondition]) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn sort_keys(mut self, sort_keys: &'a [SortKey]) -> Self {
        self.sort_keys = sort_keys;
        self
    }
}

/// Scan tuning
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Initial capacity of the kept-record buffer
    pub capacity_hint: usize,
    pub budget: ScanBudget,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            capacity_hint: 300,
            budget: ScanBudget::unbounded(),
        }
    }
}

/// Execute `spec`, returning owned copies in result order
///
/// An empty result is not an error.
pub fn query<V: ReadView>(txn: &V, spec: &QuerySpec<'_>, options: &ScanOptions) -> Result<Vec<Bytes>> {
    let bucket = txn
        .bucket(spec.bucket)
        .ok_or_else(|| SiftError::BucketNotFound(spec.bucket.to_string()))?;

    let mut kept: Vec<&[u8]> = Vec::with_capacity(options.capacity_hint);

    tracing::debug!("qry read loop start: bucket={}", spec.bucket);
    for (key, value) in bucket.seek(spec.start) {
        options.budget.check()?;
        if spec.end.is_some_and(|end| key > end) {
            break;
        }
        if spec.conditions.is_empty() || condition::evaluate(value, spec.conditions) {
            kept.push(value);
        }
    }
    tracing::debug!("qry read loop done: kept={}", kept.len());

    if !spec.sort_keys.is_empty() {
        sort::sort_records(&mut kept, spec.sort_keys);
        tracing::debug!("sort done: keys={}", spec.sort_keys.len());
    }

    // Values borrow from the transaction; hand back independent buffers.
    Ok(kept.into_iter().map(Bytes::copy_from_slice).collect())
}

/// All records with `start <= key <= end`, ascending by key
pub fn get_all<V: ReadView>(
    txn: &V,
    bucket: &str,
    start: Option<&[u8]>,
    end: Option<&[u8]>,
    options: &ScanOptions,
) -> Result<Vec<Bytes>> {
    query(txn, &QuerySpec::all(bucket).range(start, end), options)
}
