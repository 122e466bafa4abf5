//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌───────────┬──────────────┬──────────┬─────────────────────┐
//! │NameLen (1)│ Op name (N)  │ Len (4)  │   JSON payload      │
//! └───────────┴──────────────┴──────────┴─────────────────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │      JSON response          │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! Lengths are big-endian. Framing is checked before JSON decoding, so a
//! frame with a bad payload can still be answered with a `Fail` response.

use std::io::{Read, Write};

use crate::error::{Result, SiftError};
use super::{Request, Response};

/// Length prefix size
pub const LEN_SIZE: usize = 4;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// A framed request whose payload has not been decoded yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub op: String,
    pub payload: Vec<u8>,
}

impl RawRequest {
    pub fn decode(&self) -> Result<Request> {
        Request::decode(&self.op, &self.payload)
    }
}

fn check_len(len: usize, what: &str) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(SiftError::Protocol(format!(
            "{} too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
///
/// Format: name_len (1) + name + payload_len (4) + payload
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let name = request.op_name().as_bytes();
    let payload = request.encode_payload()?;
    check_len(payload.len(), "Payload")?;

    let mut message = Vec::with_capacity(1 + name.len() + LEN_SIZE + payload.len());
    message.push(name.len() as u8);
    message.extend_from_slice(name);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(&payload);
    Ok(message)
}

/// Split one request frame out of `bytes`
pub fn decode_raw_request(bytes: &[u8]) -> Result<RawRequest> {
    let name_len = *bytes
        .first()
        .ok_or_else(|| SiftError::Protocol("Incomplete header: empty frame".to_string()))? as usize;

    let len_start = 1 + name_len;
    let payload_start = len_start + LEN_SIZE;
    if bytes.len() < payload_start {
        return Err(SiftError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            payload_start,
            bytes.len()
        )));
    }

    let op = std::str::from_utf8(&bytes[1..len_start])
        .map_err(|e| SiftError::Protocol(format!("Operation name is not UTF-8: {}", e)))?
        .to_string();

    let payload_len = read_len(&bytes[len_start..payload_start]);
    check_len(payload_len, "Payload")?;

    let total_len = payload_start + payload_len;
    if bytes.len() < total_len {
        return Err(SiftError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok(RawRequest {
        op,
        payload: bytes[payload_start..total_len].to_vec(),
    })
}

/// Decode a request frame completely
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    decode_raw_request(bytes)?.decode()
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: payload_len (4) + JSON
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(response)?;
    check_len(payload.len(), "Response payload")?;

    let mut message = Vec::with_capacity(LEN_SIZE + payload.len());
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(&payload);
    Ok(message)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() < LEN_SIZE {
        return Err(SiftError::Protocol(format!(
            "Incomplete response header: expected {} bytes, got {}",
            LEN_SIZE,
            bytes.len()
        )));
    }

    let payload_len = read_len(&bytes[..LEN_SIZE]);
    check_len(payload_len, "Response payload")?;

    let total_len = LEN_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(SiftError::Protocol(format!(
            "Incomplete response payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok(serde_json::from_slice(&bytes[LEN_SIZE..total_len])?)
}

fn read_len(bytes: &[u8]) -> usize {
    let mut len = [0u8; LEN_SIZE];
    len.copy_from_slice(&bytes[..LEN_SIZE]);
    u32::from_be_bytes(len) as usize
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one request frame from a stream
///
/// Blocks until a complete frame is received or an error occurs. The
/// payload is returned undecoded.
pub fn read_raw_request<R: Read>(reader: &mut R) -> Result<RawRequest> {
    let mut name_len = [0u8; 1];
    reader.read_exact(&mut name_len)?;

    let mut name = vec![0u8; name_len[0] as usize];
    reader.read_exact(&mut name)?;
    let op = String::from_utf8(name)
        .map_err(|e| SiftError::Protocol(format!("Operation name is not UTF-8: {}", e)))?;

    let payload = read_sized(reader, "Payload")?;
    Ok(RawRequest { op, payload })
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let payload = read_sized(reader, "Response payload")?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

fn read_sized<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; LEN_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes(header) as usize;
    check_len(payload_len, what)?;

    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }
    Ok(payload)
}
