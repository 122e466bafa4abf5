//! Error types for SiftKV
//!
//! Provides a unified error type for all operations. Logical request
//! outcomes (not found, rejected records) are carried in
//! [`Response`](crate::protocol::Response) status values instead; these
//! errors describe why an operation could not run at all.

use thiserror::Error;

/// Result type alias using SiftError
pub type Result<T> = std::result::Result<T, SiftError>;

/// Unified error type for SiftKV operations
#[derive(Debug, Error)]
pub enum SiftError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Bkt Not Found - {0}")]
    BucketNotFound(String),

    #[error("Bkt Already Exists - {0}")]
    BucketExists(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Value too large: {0} bytes")]
    ValueTooLarge(usize),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Scan cancelled: {0}")]
    Cancelled(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for SiftError {
    fn from(err: bincode::Error) -> Self {
        SiftError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(err: serde_json::Error) -> Self {
        SiftError::Serialization(err.to_string())
    }
}
