//! Wire protocol: JSON request and response records.
//!
//! Requests arrive as a stream of self-delimiting JSON objects discriminated by a
//! `command` field. Responses are written one JSON object per line.

pub mod codec;
pub mod request;
pub mod response;

pub use codec::{RequestDecoder, ResponseEncoder};
pub use request::{Request, RequestId, RequestKind};
pub use response::Response;
