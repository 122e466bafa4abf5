//! TCP Server
//!
//! Every accepted connection gets its own I/O thread. Requests read on those
//! threads go through a bounded channel to a fixed pool of workers, so the
//! number of requests executing at once stays at `worker_threads` however
//! many clients are connected.
//!
//! ```text
//!   accept loop ──► conn thread 1..M ──► crossbeam channel ──► worker 1..N
//!        │               ▲                                         │
//!        │               └────────────── reply channel ◄── Engine::dispatch
//!        └──── polls shutdown flag
//! ```
//!
//! On shutdown the read half of every open connection is closed. Idle
//! clients see EOF at once; a request already queued is still answered.

use std::collections::HashMap;
use std::io::{BufWriter, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, SiftError};
use crate::protocol::{write_response, Response};
use super::connection::{Connection, Job};

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Streams of open connections, by connection id
type OpenConnections = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for SiftKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind to `config.listen_addr`
    ///
    /// The server shares the engine's shutdown flag, so shutting either
    /// down stops both.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            SiftError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        let shutdown = engine.shutdown_flag();
        Ok(Self {
            config,
            engine,
            listener,
            shutdown,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Start the server (blocking until shutdown)
    pub fn run(self) -> Result<()> {
        let worker_count = self.config.worker_threads.max(1);
        let (jobs, receiver) = channel::bounded::<Job>(worker_count * 4);

        let workers: Vec<JoinHandle<()>> = (0..worker_count)
            .map(|id| self.spawn_worker(id, receiver.clone()))
            .collect::<Result<_>>()?;
        drop(receiver);

        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            worker_count
        );

        let open: OpenConnections = Arc::new(Mutex::new(HashMap::new()));
        let mut connections: Vec<JoinHandle<()>> = Vec::new();
        let mut next_id = 0u64;

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::debug!("Accepted connection from {}", peer);
                    connections.retain(|handle| !handle.is_finished());

                    if open.lock().len() >= self.config.max_connections {
                        tracing::warn!(
                            "Refusing {}: {} connections open",
                            peer,
                            self.config.max_connections
                        );
                        refuse(stream);
                        continue;
                    }

                    next_id += 1;
                    match self.spawn_connection(next_id, stream, jobs.clone(), Arc::clone(&open)) {
                        Ok(handle) => connections.push(handle),
                        Err(e) => tracing::warn!("Dropping connection from {}: {}", peer, e),
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutdown requested, closing {} connections", open.lock().len());
        for stream in open.lock().values() {
            // Unblocks the pending read; responses can still be written.
            let _ = stream.shutdown(Shutdown::Read);
        }
        for handle in connections {
            if handle.join().is_err() {
                tracing::error!("Connection thread panicked");
            }
        }

        drop(jobs);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
        Ok(())
    }

    fn spawn_connection(
        &self,
        id: u64,
        stream: TcpStream,
        jobs: Sender<Job>,
        open: OpenConnections,
    ) -> Result<JoinHandle<()>> {
        stream.set_nonblocking(false)?;
        open.lock().insert(id, stream.try_clone()?);

        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name(format!("siftkv-conn-{}", id))
            .spawn({
                let open = Arc::clone(&open);
                move || {
                    serve(stream, jobs, read_ms, write_ms);
                    open.lock().remove(&id);
                }
            });

        spawned.map_err(|e| {
            open.lock().remove(&id);
            SiftError::Io(e)
        })
    }

    fn spawn_worker(&self, id: usize, receiver: Receiver<Job>) -> Result<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);

        thread::Builder::new()
            .name(format!("siftkv-worker-{}", id))
            .spawn(move || {
                for job in receiver.iter() {
                    let response = engine.dispatch(&job.raw.op, &job.raw.payload);
                    if job.reply.send(response).is_err() {
                        tracing::debug!("Connection closed before {} completed", job.raw.op);
                    }
                }
                tracing::debug!("Worker {} exiting", id);
            })
            .map_err(SiftError::Io)
    }
}

/// Run one connection to completion
fn serve(stream: TcpStream, jobs: Sender<Job>, read_ms: u64, write_ms: u64) {
    let mut connection = match Connection::new(stream, jobs) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Connection setup failed: {}", e);
            return;
        }
    };
    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
    }
    if let Err(e) = connection.handle() {
        tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
    }
}

/// Tell a client over the connection limit why it is being dropped
fn refuse(stream: TcpStream) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let _ = stream.set_write_timeout(Some(Duration::from_secs(1)));
    let mut writer = BufWriter::new(stream);
    let _ = write_response(&mut writer, &Response::fail("Too Many Connections"));
}
