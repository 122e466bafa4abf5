//! Mutation executor
//!
//! Point reads and writes. Records are stored under the string value of
//! their key field; a record without one is never written.
//!
//! ## Batch put policy
//! Records lacking the key field are skipped and the rest of the batch is
//! still written. The response is `Warning` when some records were
//! rejected and at least one was written, `Fail` when none were written.
//! A store write error is `Fail` immediately, and the engine rolls back
//! the whole request. `putCnt` always equals the records actually written.

use bytes::Bytes;

use crate::protocol::{DeleteRequest, GetOneRequest, GetRequest, PutOneRequest, PutRequest, Response};
use crate::query::extract_str;
use crate::store::{ReadView, WriteTxn};

/// Records for `keys` in request order; absent keys make the response a
/// `Warning` but do not stop the batch
pub(super) fn get_many<V: ReadView>(txn: &V, req: &GetRequest) -> Response {
    let Some(bucket) = txn.bucket(&req.bucket) else {
        return bucket_not_found(&req.bucket);
    };

    let mut recs = Vec::with_capacity(req.keys.len());
    let mut missing = 0usize;
    for key in &req.keys {
        match bucket.get(key.as_bytes()) {
            Some(value) => recs.push(Bytes::copy_from_slice(value)),
            None => {
                tracing::warn!("key not found: {}", key);
                missing += 1;
            }
        }
    }

    let response = if missing > 0 {
        Response::warning("Requested Record(s) Not Found")
    } else {
        Response::ok()
    };
    response.with_records(recs)
}

pub(super) fn get_one<V: ReadView>(txn: &V, req: &GetOneRequest) -> Response {
    let Some(bucket) = txn.bucket(&req.bucket) else {
        return bucket_not_found(&req.bucket);
    };

    match bucket.get(req.key.as_bytes()) {
        Some(value) => Response::ok().with_record(Bytes::copy_from_slice(value)),
        None => {
            tracing::warn!("key not found: {}", req.key);
            Response::fail(format!("Requested Record Not Found - {}", req.key))
        }
    }
}

pub(super) fn put_many(txn: &mut WriteTxn<'_>, req: &PutRequest) -> Response {
    let mut bucket = match txn.bucket_mut(&req.bucket) {
        Ok(bucket) => bucket,
        Err(_) => return bucket_not_found(&req.bucket),
    };

    let mut written = 0usize;
    let mut rejected = 0usize;
    for rec in &req.recs {
        let key = extract_str(rec, &req.key_field);
        if key.is_empty() {
            tracing::warn!(
                "key value not found in record for specified KeyField - {}: {}",
                req.key_field,
                String::from_utf8_lossy(rec)
            );
            rejected += 1;
            continue;
        }
        if let Err(e) = bucket.put(key.as_bytes(), rec) {
            tracing::error!("put failed: {}", e);
            return Response::fail(format!("Put Request Failed - {}", e));
        }
        written += 1;
    }

    let response = if rejected == 0 {
        Response::ok()
    } else {
        let msg = format!(
            "key value not found in record for specified KeyField - {}",
            req.key_field
        );
        if written == 0 {
            Response::fail(msg)
        } else {
            Response::warning(msg)
        }
    };
    response.with_put_count(written)
}

pub(super) fn put_one(txn: &mut WriteTxn<'_>, req: &PutOneRequest) -> Response {
    let mut bucket = match txn.bucket_mut(&req.bucket) {
        Ok(bucket) => bucket,
        Err(_) => return bucket_not_found(&req.bucket),
    };

    let key = extract_str(&req.rec, &req.key_field);
    if key.is_empty() {
        tracing::warn!("key value not found in record - {}", req.key_field);
        return Response::fail(format!("key value not found in record - {}", req.key_field));
    }
    match bucket.put(key.as_bytes(), &req.rec) {
        Ok(()) => Response::ok().with_put_count(1),
        Err(e) => {
            tracing::error!("put failed: {}", e);
            Response::fail(format!("Put Request Failed - {}", e))
        }
    }
}

/// Deleting an absent key is fine; a store error stops the batch
pub(super) fn delete_many(txn: &mut WriteTxn<'_>, req: &DeleteRequest) -> Response {
    let mut bucket = match txn.bucket_mut(&req.bucket) {
        Ok(bucket) => bucket,
        Err(_) => return bucket_not_found(&req.bucket),
    };

    for key in &req.keys {
        if let Err(e) = bucket.delete(key.as_bytes()) {
            tracing::error!("delete error - {}: {}", key, e);
            return Response::fail(format!("delete error - {}", key));
        }
    }
    Response::ok()
}

fn bucket_not_found(bucket: &str) -> Response {
    tracing::warn!("Bkt Not Found - {}", bucket);
    Response::fail(format!("Bkt Not Found - {}", bucket))
}
