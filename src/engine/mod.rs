//! Engine Module
//!
//! Runs decoded requests against the store and turns every outcome into a
//! [`Response`].
//!
//! ## Responsibilities
//! - Pick a read or write transaction per operation
//! - Commit writes unless the response is `Fail` (a `Fail` rolls back every
//!   write of that request)
//! - Bound scans by the configured deadline and the shutdown flag
//! - Convert internal errors into `Fail` responses; nothing escapes as a
//!   transport error

mod admin;
mod mutation;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{GetAllRequest, QryRequest, Request, Response};
use crate::query::{self, QuerySpec, ScanBudget, ScanOptions};
use crate::store::{ReadTxn, Store, WriteTxn};

/// The request engine
///
/// ## Concurrency Model
///
/// - **Reads** (`get`, `getone`, `getall`, `qry`): each runs in its own
///   snapshot read transaction; any number run at once.
/// - **Writes** (`bkt`, `put`, `putone`, `delete`): each runs in one write
///   transaction; the store admits a single writer at a time.
pub struct Engine {
    config: Config,
    store: Store,

    /// Set on shutdown; running scans stop at their next cursor advance
    shutdown: Arc<AtomicBool>,
}

impl Engine {
    /// Open or create an engine with the given config
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::open(&config)?;
        tracing::info!("Engine open: data_dir={}", config.data_dir.display());
        Ok(Self {
            config,
            store,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Decode and execute one framed operation
    ///
    /// Unknown operations and malformed payloads yield a `Fail` response.
    pub fn dispatch(&self, op: &str, payload: &[u8]) -> Response {
        if self.config.log_payloads {
            tracing::trace!("request {}: {}", op, String::from_utf8_lossy(payload));
        }
        match Request::decode(op, payload) {
            Ok(request) => self.execute(&request),
            Err(e) => {
                tracing::warn!("Rejected {} request: {}", op, e);
                Response::fail(format!("Invalid Request - {}", e))
            }
        }
    }

    /// Execute a request
    ///
    /// Routes requests to the matching executor inside a read or write
    /// transaction.
    pub fn execute(&self, request: &Request) -> Response {
        tracing::debug!("{} request: bucket={}", request.op_name(), request.bucket());

        let response = match request {
            Request::Get(req) => self.read(|txn| mutation::get_many(txn, req)),
            Request::GetOne(req) => self.read(|txn| mutation::get_one(txn, req)),
            Request::GetAll(req) => self.read(|txn| self.get_all(txn, req)),
            Request::Qry(req) => self.read(|txn| self.qry(txn, req)),
            Request::Bkt(req) => self.write(|txn| admin::bucket(txn, req)),
            Request::Put(req) => self.write(|txn| mutation::put_many(txn, req)),
            Request::PutOne(req) => self.write(|txn| mutation::put_one(txn, req)),
            Request::Delete(req) => self.write(|txn| mutation::delete_many(txn, req)),
        };

        tracing::debug!(
            "{} response: status={:?} recs={} putCnt={}",
            request.op_name(),
            response.status,
            response.recs.len(),
            response.put_cnt
        );
        if self.config.log_payloads {
            match serde_json::to_string(&response) {
                Ok(json) => tracing::trace!("response {}: {}", request.op_name(), json),
                Err(e) => tracing::trace!("response {}: unprintable ({})", request.op_name(), e),
            }
        }
        response
    }

    fn read(&self, f: impl FnOnce(&ReadTxn) -> Response) -> Response {
        self.store.view(f)
    }

    fn write(&self, f: impl FnOnce(&mut WriteTxn<'_>) -> Response) -> Response {
        let mut txn = self.store.begin_write();
        let response = f(&mut txn);

        if response.is_fail() {
            txn.rollback();
            return response;
        }
        match txn.commit() {
            Ok(()) => response,
            Err(e) => {
                tracing::error!("Commit failed: {}", e);
                Response::fail(format!("Commit Failed - {}", e))
            }
        }
    }

    /// Fresh scan options: configured capacity, deadline and shutdown flag
    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            capacity_hint: self.config.scan_capacity_hint,
            budget: ScanBudget::unbounded()
                .with_timeout(self.config.scan_timeout())
                .with_cancel_flag(Arc::clone(&self.shutdown)),
        }
    }

    fn get_all(&self, txn: &ReadTxn, req: &GetAllRequest) -> Response {
        let result = query::get_all(
            txn,
            &req.bucket,
            req.start_key.as_deref().map(str::as_bytes),
            req.end_key.as_deref().map(str::as_bytes),
            &self.scan_options(),
        );
        scan_response(result)
    }

    fn qry(&self, txn: &ReadTxn, req: &QryRequest) -> Response {
        let spec = QuerySpec::all(&req.bucket)
            .range(
                req.start_key.as_deref().map(str::as_bytes),
                req.end_key.as_deref().map(str::as_bytes),
            )
            .conditions(&req.find_conditions)
            .sort_keys(&req.sort_flds);
        scan_response(query::query(txn, &spec, &self.scan_options()))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flag shared with scans and the server accept loop
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Ask running scans and the server to stop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Close the engine gracefully
    ///
    /// Checkpoints the store so the next open has no WAL to replay.
    pub fn close(self) -> Result<()> {
        self.shutdown();
        self.store.close()?;
        tracing::info!("Engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }
}

fn scan_response(result: Result<Vec<bytes::Bytes>>) -> Response {
    match result {
        Ok(recs) => Response::ok().with_records(recs),
        Err(e) => {
            tracing::warn!("Scan failed: {}", e);
            Response::from_error(&e)
        }
    }
}
