//! Protocol Module
//!
//! Defines the request/response contract and its wire framing.
//!
//! ## Operations
//! | name     | txn    | payload                                        |
//! |----------|--------|------------------------------------------------|
//! | `bkt`    | write  | bktName, operation (`create`/`delete`)         |
//! | `get`    | read   | bktName, keys                                  |
//! | `getone` | read   | bktName, key                                   |
//! | `getall` | read   | bktName, startKey?, endKey?                    |
//! | `put`    | write  | bktName, keyField, recs                        |
//! | `putone` | write  | bktName, keyField, rec                         |
//! | `delete` | write  | bktName, keys                                  |
//! | `qry`    | read   | bktName, findConditions?, sortFlds?, start/end |
//!
//! ## Response
//! `{status, msg, recs, rec, putCnt}` with `status` 0 = Ok, 1 = Fail,
//! 2 = Warning. Records are base64 strings.
//!
//! ## Frames
//! ```text
//! request:  [NameLen u8][op name][Len u32][JSON]
//! response: [Len u32][JSON]
//! ```

mod b64;
mod codec;
mod request;
mod response;

pub use codec::{
    decode_raw_request, decode_request, decode_response, encode_request, encode_response,
    read_raw_request, read_response, write_request, write_response, RawRequest, MAX_PAYLOAD_SIZE,
};
pub use request::{
    lookup, BktRequest, BucketOp, DeleteRequest, GetAllRequest, GetOneRequest, GetRequest,
    OpSpec, PutOneRequest, PutRequest, QryRequest, Request, OPERATIONS,
};
pub use response::{Response, Status};
