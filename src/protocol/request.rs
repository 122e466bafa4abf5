//! Request definitions
//!
//! One typed payload per operation, using the JSON field names clients
//! already send. [`Request::decode`] resolves the operation name through a
//! static table and deserializes straight into the matching payload.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SiftError};
use crate::query::{FindCondition, SortKey};
use super::b64;

// =============================================================================
// Payloads
// =============================================================================

/// Bucket admin operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketOp {
    Create,
    Delete,
}

impl fmt::Display for BucketOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketOp::Create => write!(f, "create"),
            BucketOp::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BktRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    pub operation: BucketOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetOneRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    #[serde(default)]
    pub key: String,
}

/// Range scan; an absent or empty bound is open
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetAllRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    #[serde(rename = "startKey", default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub start_key: Option<String>,
    #[serde(rename = "endKey", default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub end_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PutRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    /// Field whose string value becomes each record's key
    #[serde(rename = "keyField", default)]
    pub key_field: String,
    #[serde(with = "b64::list", default)]
    pub recs: Vec<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PutOneRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    #[serde(rename = "keyField", default)]
    pub key_field: String,
    #[serde(with = "b64::single", default)]
    pub rec: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QryRequest {
    #[serde(rename = "bktName")]
    pub bucket: String,
    #[serde(rename = "findConditions", default, deserialize_with = "null_as_empty")]
    pub find_conditions: Vec<FindCondition>,
    #[serde(rename = "sortFlds", default, deserialize_with = "null_as_empty")]
    pub sort_flds: Vec<SortKey>,
    #[serde(rename = "startKey", default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub start_key: Option<String>,
    #[serde(rename = "endKey", default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub end_key: Option<String>,
}

fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Request
// =============================================================================

/// A decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Bkt(BktRequest),
    Get(GetRequest),
    GetOne(GetOneRequest),
    GetAll(GetAllRequest),
    Put(PutRequest),
    PutOne(PutOneRequest),
    Delete(DeleteRequest),
    Qry(QryRequest),
}

macro_rules! impl_from_payload {
    ($($payload:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Request {
                fn from(payload: $payload) -> Self {
                    Request::$variant(payload)
                }
            }
        )*
    };
}

impl_from_payload! {
    BktRequest => Bkt,
    GetRequest => Get,
    GetOneRequest => GetOne,
    GetAllRequest => GetAll,
    PutRequest => Put,
    PutOneRequest => PutOne,
    DeleteRequest => Delete,
    QryRequest => Qry,
}

type Decoder = fn(&[u8]) -> Result<Request>;

/// One row of the operation table
#[derive(Debug, Clone, Copy)]
pub struct OpSpec {
    pub name: &'static str,
    decode: Decoder,
}

fn decode_as<T>(json: &[u8]) -> Result<Request>
where
    T: DeserializeOwned + Into<Request>,
{
    Ok(serde_json::from_slice::<T>(json)?.into())
}

/// Every operation the engine understands
pub static OPERATIONS: [OpSpec; 8] = [
    OpSpec { name: "bkt", decode: decode_as::<BktRequest> },
    OpSpec { name: "get", decode: decode_as::<GetRequest> },
    OpSpec { name: "getone", decode: decode_as::<GetOneRequest> },
    OpSpec { name: "getall", decode: decode_as::<GetAllRequest> },
    OpSpec { name: "put", decode: decode_as::<PutRequest> },
    OpSpec { name: "putone", decode: decode_as::<PutOneRequest> },
    OpSpec { name: "delete", decode: decode_as::<DeleteRequest> },
    OpSpec { name: "qry", decode: decode_as::<QryRequest> },
];

/// Look up an operation by name
pub fn lookup(op: &str) -> Option<&'static OpSpec> {
    OPERATIONS.iter().find(|spec| spec.name == op)
}

impl Request {
    /// Decode the JSON payload of operation `op`
    pub fn decode(op: &str, json: &[u8]) -> Result<Self> {
        let spec = lookup(op).ok_or_else(|| SiftError::Protocol(format!("unknown operation '{}'", op)))?;
        (spec.decode)(json)
    }

    /// Operation name as used on the wire
    pub fn op_name(&self) -> &'static str {
        match self {
            Request::Bkt(_) => "bkt",
            Request::Get(_) => "get",
            Request::GetOne(_) => "getone",
            Request::GetAll(_) => "getall",
            Request::Put(_) => "put",
            Request::PutOne(_) => "putone",
            Request::Delete(_) => "delete",
            Request::Qry(_) => "qry",
        }
    }

    /// Name of the bucket the request targets
    pub fn bucket(&self) -> &str {
        match self {
            Request::Bkt(r) => &r.bucket,
            Request::Get(r) => &r.bucket,
            Request::GetOne(r) => &r.bucket,
            Request::GetAll(r) => &r.bucket,
            Request::Put(r) => &r.bucket,
            Request::PutOne(r) => &r.bucket,
            Request::Delete(r) => &r.bucket,
            Request::Qry(r) => &r.bucket,
        }
    }

    /// JSON body of the payload, without the operation name
    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        let json = match self {
            Request::Bkt(r) => serde_json::to_vec(r)?,
            Request::Get(r) => serde_json::to_vec(r)?,
            Request::GetOne(r) => serde_json::to_vec(r)?,
            Request::GetAll(r) => serde_json::to_vec(r)?,
            Request::Put(r) => serde_json::to_vec(r)?,
            Request::PutOne(r) => serde_json::to_vec(r)?,
            Request::Delete(r) => serde_json::to_vec(r)?,
            Request::Qry(r) => serde_json::to_vec(r)?,
        };
        Ok(json)
    }
}
