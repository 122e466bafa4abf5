//! SiftKV Server Binary
//!
//! Opens the store and serves the request protocol over TCP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use siftkv::network::Server;
use siftkv::{Config, Engine, WalSyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// SiftKV Server
#[derive(Parser, Debug)]
#[command(name = "siftkv-server")]
#[command(about = "Ordered key-value store with schema-less record queries")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./siftkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    listen: String,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// WAL size in MB that triggers a checkpoint
    #[arg(short = 'c', long, default_value = "64")]
    checkpoint_mb: u64,

    /// Per-scan deadline in milliseconds (0 = unbounded)
    #[arg(short = 't', long, default_value = "0")]
    scan_timeout_ms: u64,

    /// fsync the WAL after every commit
    #[arg(long)]
    sync_every_write: bool,

    /// Dump request and response JSON at trace level
    #[arg(long)]
    log_payloads: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,siftkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("SiftKV Server v{}", siftkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = if args.sync_every_write {
        WalSyncStrategy::EveryWrite
    } else {
        Config::default().wal_sync_strategy
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .worker_threads(args.workers)
        .checkpoint_threshold(args.checkpoint_mb * 1024 * 1024)
        .scan_timeout_ms(args.scan_timeout_ms)
        .wal_sync_strategy(sync_strategy)
        .log_payloads(args.log_payloads)
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl+C / SIGTERM stops the accept loop; close() below then checkpoints
    install_shutdown_handler(engine.shutdown_flag());

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close() {
                tracing::error!("Failed to close engine: {}", e);
            }
        }
        Err(engine) => {
            if let Err(e) = engine.store().checkpoint() {
                tracing::error!("Final checkpoint failed: {}", e);
            }
        }
    }

    tracing::info!("Server stopped");
}

/// Set the shutdown flag on Ctrl+C or SIGTERM
fn install_shutdown_handler(shutdown: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, initiating shutdown...");
        shutdown.store(true, Ordering::SeqCst);
    });
    if let Err(e) = result {
        tracing::warn!("Failed to install signal handler: {}", e);
    }
}
