//! Remote operations
//!
//! Typed requests and responses for the Get/Set interface, and their mapping
//! onto RESP frames. Both the server side (dispatcher) and the client use
//! these, so the wire shape of each operation lives in exactly one place.

mod messages;

pub use messages::{GetRequest, GetResponse, SetRequest, SetResponse};

use crate::protocol::{RespError, RespValue};
use bytes::Bytes;
use thiserror::Error;

/// Error prefix the server uses when a request's deadline elapsed
pub const TIMEOUT_PREFIX: &str = "TIMEOUT";

/// A request to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get(GetRequest),
    Set(SetRequest),
    Ping,
}

impl Request {
    pub fn get(key: impl Into<String>) -> Self {
        Request::Get(GetRequest { key: key.into() })
    }

    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Request::Set(SetRequest {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Command name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Request::Get(_) => "GET",
            Request::Set(_) => "SET",
            Request::Ping => "PING",
        }
    }

    /// Encode as a RESP command array
    pub fn to_resp(&self) -> RespValue {
        let name = Bytes::from_static(self.name().as_bytes());
        match self {
            Request::Get(req) => RespValue::command([name, Bytes::from(req.key.clone())]),
            Request::Set(req) => RespValue::command([
                name,
                Bytes::from(req.key.clone()),
                Bytes::from(req.value.clone()),
            ]),
            Request::Ping => RespValue::command([name]),
        }
    }
}

/// A response from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Get(GetResponse),
    Set(SetResponse),
    Pong,
}

impl Response {
    /// Encode as the RESP reply frame
    ///
    /// A missing key is a null bulk string, not an error.
    pub fn to_resp(&self) -> RespValue {
        match self {
            Response::Get(resp) if resp.found => RespValue::bulk_string(resp.value.clone()),
            Response::Get(_) => RespValue::Null,
            Response::Set(resp) if resp.success => RespValue::simple_string("OK"),
            Response::Set(_) => RespValue::error("ERR set failed"),
            Response::Pong => RespValue::simple_string("PONG"),
        }
    }

    /// Decode the reply frame received for `request`
    pub fn from_resp(request: &Request, frame: RespValue) -> Result<Response, RpcError> {
        match (request, frame) {
            (_, RespValue::Error(msg)) => Err(RpcError::from_server_message(&msg)),
            (Request::Get(_), RespValue::BulkString(bytes)) => String::from_utf8(bytes.to_vec())
                .map(|value| Response::Get(GetResponse::found(value)))
                .map_err(|_| RpcError::UnexpectedResponse("value is not valid UTF-8".to_string())),
            (Request::Get(_), RespValue::Null) => Ok(Response::Get(GetResponse::not_found())),
            (Request::Set(_), RespValue::SimpleString(s)) if s == "OK" => {
                Ok(Response::Set(SetResponse { success: true }))
            }
            (Request::Ping, RespValue::SimpleString(s)) if s == "PONG" => Ok(Response::Pong),
            (request, other) => Err(RpcError::UnexpectedResponse(format!(
                "{} in reply to {}",
                other,
                request.name()
            ))),
        }
    }
}

/// Errors of a remote operation, on either side of the connection
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request's deadline elapsed before the store could serve it
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The request could not be understood (unknown command, bad arguments)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with an error frame
    #[error("server error: {0}")]
    Server(String),

    /// The server answered with a frame that does not fit the request
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,
}

impl RpcError {
    /// Encode as the RESP error frame sent back to the client
    pub fn to_resp(&self) -> RespValue {
        match self {
            RpcError::DeadlineExceeded => {
                RespValue::error(format!("{} deadline exceeded", TIMEOUT_PREFIX))
            }
            RpcError::InvalidRequest(msg) => RespValue::error(format!("ERR {}", msg)),
            other => RespValue::error(format!("ERR {}", other)),
        }
    }

    fn from_server_message(msg: &str) -> Self {
        if msg.starts_with(TIMEOUT_PREFIX) {
            RpcError::DeadlineExceeded
        } else {
            RpcError::Server(msg.to_string())
        }
    }
}
