//! Store Module
//!
//! Embedded ordered key-value store with named buckets and transactions.
//!
//! ## Responsibilities
//! - Named buckets, each ordered by byte-wise key comparison
//! - Snapshot read transactions (many at once) and one writer at a time
//! - Point get/put/delete and forward cursors with seek
//! - Durability through the WAL plus periodic checkpoints
//!
//! ## Layout
//! ```text
//!   ReadTxn ──► Arc<Snapshot> ◄── published by commit ── WriteTxn
//!                    │                                       │
//!                    ▼                                       ▼
//!            bucket → BTreeMap                     WAL append, then swap
//!                                                            │
//!                                           threshold ──► data.ckpt
//! ```

mod checkpoint;
mod db;
mod snapshot;
mod txn;

pub use checkpoint::{Checkpoint, CheckpointInfo};
pub use db::Store;
pub use snapshot::{validate_key, BucketData, Snapshot, MAX_KEY_SIZE, MAX_VALUE_SIZE};
pub use txn::{Bucket, BucketMut, Cursor, ReadTxn, ReadView, WriteTxn};
