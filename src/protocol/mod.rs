//! RESP2 protocol implementation
//!
//! This module handles parsing and encoding of the Redis Serialization Protocol (RESP2),
//! the framing used between snapkv clients and the server.
//! It is completely independent from other modules (loose coupling).

mod types;
mod resp;

pub use types::{RespValue, RespError};
pub use resp::{RespParser, RespEncoder, MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_DEPTH, MAX_LINE_LEN};
