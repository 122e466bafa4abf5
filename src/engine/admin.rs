//! Bucket admin
//!
//! Create and delete named keyspaces. Neither is idempotent: creating an
//! existing bucket or deleting a missing one is a `Fail`.

use crate::protocol::{BktRequest, BucketOp, Response};
use crate::store::WriteTxn;

pub(super) fn bucket(txn: &mut WriteTxn<'_>, req: &BktRequest) -> Response {
    let result = match req.operation {
        BucketOp::Create => txn.create_bucket(&req.bucket),
        BucketOp::Delete => txn.delete_bucket(&req.bucket),
    };

    match result {
        Ok(()) => {
            tracing::info!("Bucket {}d: {}", req.operation, req.bucket);
            Response::ok()
        }
        Err(e) => {
            tracing::warn!("Bkt Operation Failed-{}-{}: {}", req.operation, req.bucket, e);
            Response::fail(format!("Bkt Operation Failed-{}-{}: {}", req.operation, req.bucket, e))
        }
    }
}
