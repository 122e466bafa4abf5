//! Response definitions
//!
//! Every operation answers with the same envelope. Logical outcomes travel
//! in `status` only; the transport always delivers the response.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::SiftError;
use super::b64;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Status {
    #[default]
    Ok = 0,
    Fail = 1,
    Warning = 2,
}

impl TryFrom<u8> for Status {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Fail),
            2 => Ok(Status::Warning),
            other => Err(format!("unknown response status {}", other)),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status as u8
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,

    #[serde(default)]
    pub msg: String,

    /// Records in result order (`get`, `getall`, `qry`)
    #[serde(with = "b64::list", default)]
    pub recs: Vec<Bytes>,

    /// Single record (`getone`)
    #[serde(with = "b64::option", default)]
    pub rec: Option<Bytes>,

    /// Records actually written (`put`, `putone`)
    #[serde(rename = "putCnt", default)]
    pub put_cnt: usize,
}

impl Response {
    /// Create an OK response with no message
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            msg: msg.into(),
            ..Self::default()
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Warning,
            msg: msg.into(),
            ..Self::default()
        }
    }

    pub fn with_records(mut self, recs: Vec<Bytes>) -> Self {
        self.recs = recs;
        self
    }

    pub fn with_record(mut self, rec: Bytes) -> Self {
        self.rec = Some(rec);
        self
    }

    pub fn with_put_count(mut self, put_cnt: usize) -> Self {
        self.put_cnt = put_cnt;
        self
    }

    /// `Fail` carrying the error's display text
    pub fn from_error(err: &SiftError) -> Self {
        Self::fail(err.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn is_fail(&self) -> bool {
        self.status == Status::Fail
    }
}
