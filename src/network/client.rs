//! Blocking TCP client
//!
//! Sends one request frame and waits for its response. Logical failures
//! arrive as a `Fail`/`Warning` status; only transport problems are `Err`.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{Result, SiftError};
use crate::protocol::{
    read_response, write_request, GetOneRequest, GetRequest, PutOneRequest, PutRequest, Request,
    Response,
};

/// Key field the convenience helpers put under unless told otherwise
pub const DEFAULT_KEY_FIELD: &str = "id";

pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    key_field: String,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| SiftError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            key_field: DEFAULT_KEY_FIELD.to_string(),
        })
    }

    /// Key field used by [`put`](Client::put) and [`put_one`](Client::put_one)
    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = key_field.into();
        self
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send `request` and wait for its response
    pub fn run(&mut self, request: &Request) -> Result<Response> {
        tracing::trace!("client sending {} request", request.op_name());
        write_request(&mut self.writer, request)?;
        let response = read_response(&mut self.reader)?;
        tracing::trace!("client received status {:?}", response.status);
        Ok(response)
    }

    /// `getone` for a single key, `get` otherwise
    pub fn get(&mut self, bucket: &str, keys: &[&str]) -> Result<Response> {
        let request: Request = match keys {
            [key] => GetOneRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
            .into(),
            _ => GetRequest {
                bucket: bucket.to_string(),
                keys: keys.iter().map(|k| k.to_string()).collect(),
            }
            .into(),
        };
        self.run(&request)
    }

    /// Put already-serialized records
    pub fn put(&mut self, bucket: &str, recs: Vec<Bytes>) -> Result<Response> {
        let sent = recs.len();
        let request = Request::Put(PutRequest {
            bucket: bucket.to_string(),
            key_field: self.key_field.clone(),
            recs,
        });
        let response = self.run(&request)?;
        if response.put_cnt != sent {
            tracing::warn!(
                "Put did not process all records: sent {}, put {}",
                sent,
                response.put_cnt
            );
        }
        Ok(response)
    }

    /// Serialize `rec` to JSON and put it
    pub fn put_one<T: Serialize>(&mut self, bucket: &str, rec: &T) -> Result<Response> {
        let json = serde_json::to_vec(rec)?;
        let request = Request::PutOne(PutOneRequest {
            bucket: bucket.to_string(),
            key_field: self.key_field.clone(),
            rec: Bytes::from(json),
        });
        let response = self.run(&request)?;
        if response.put_cnt != 1 {
            tracing::warn!("PutOne did not process the record: {}", response.msg);
        }
        Ok(response)
    }
}
