//! Connection Handler
//!
//! Handles individual client connections. A connection only does I/O; each
//! request it reads is queued for the worker pool and the connection waits
//! for the answer before reading the next frame.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use crate::error::{Result, SiftError};
use crate::protocol::{read_raw_request, write_response, RawRequest, Response};

/// A framed request waiting for a worker
pub(super) struct Job {
    pub raw: RawRequest,
    pub reply: Sender<Response>,
}

/// Handles a single client connection
pub(super) struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Queue feeding the worker pool
    jobs: Sender<Job>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O; timeouts are configured separately
    pub fn new(stream: TcpStream, jobs: Sender<Job>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            jobs,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads request frames in a loop and answers each one. A frame whose
    /// payload does not decode still gets a `Fail` response; only broken
    /// framing ends the connection.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let raw = match read_raw_request(&mut self.reader) {
                Ok(raw) => raw,
                Err(SiftError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(SiftError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    // Framing is lost; answer once and close.
                    let _ = self.send_response(&Response::from_error(&e));
                    return Err(e);
                }
            };

            tracing::trace!(
                "Received {} from {} ({} bytes)",
                raw.op,
                self.peer_addr,
                raw.payload.len()
            );

            let response = match self.submit(raw) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Request from {} not executed: {}", self.peer_addr, e);
                    let _ = self.send_response(&Response::from_error(&e));
                    return Err(e);
                }
            };

            if let Err(e) = self.send_response(&response) {
                if let SiftError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Queue `raw` for a worker and wait for its response
    fn submit(&self, raw: RawRequest) -> Result<Response> {
        let (reply, answer) = channel::bounded(1);
        self.jobs
            .send(Job { raw, reply })
            .map_err(|_| SiftError::Network("worker pool has stopped".to_string()))?;
        answer
            .recv()
            .map_err(|_| SiftError::Network("request dropped by worker".to_string()))
    }

    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
