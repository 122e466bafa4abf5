//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One I/O thread per open connection
//! - Fixed worker pool executing requests through the Engine

mod client;
mod connection;
mod server;

pub use client::{Client, DEFAULT_KEY_FIELD};
pub use server::Server;
