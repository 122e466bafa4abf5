//! # SiftKV
//!
//! An embedded ordered key-value store with a record query engine:
//! - Named buckets of byte keys, iterated in byte order
//! - Schema-less filtering of JSON records (AND-combined find conditions)
//! - Multi-key, direction-aware, stable sorting
//! - Snapshot read transactions and a single serialized writer
//! - Write-Ahead Logging (WAL) and checkpoints for durability
//! - TCP request/response protocol with JSON payloads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │           (accept loop + crossbeam worker pool)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  [op name][JSON]
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                               │
//! │     Request table → read txn (get/getone/getall/qry)        │
//! │                   → write txn (bkt/put/putone/delete)       │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌───────────────────┐
//!   │ Query executor  │               │ Mutation / admin  │
//!   │ field·cond·sort │               │   executors       │
//!   └────────┬────────┘               └─────────┬─────────┘
//!            └──────────────┬───────────────────┘
//!                           ▼
//!                 ┌───────────────────┐
//!                 │       Store       │
//!                 │ snapshot + WAL +  │
//!                 │    checkpoint     │
//!                 └───────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod store;
pub mod query;
pub mod protocol;
pub mod engine;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SiftError};
pub use config::{Config, WalSyncStrategy};
pub use engine::Engine;
pub use protocol::{Request, Response, Status};
pub use query::{FindCondition, FindOp, SortDir, SortKey};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SiftKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
