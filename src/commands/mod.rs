//! Command parsing module
//!
//! Each wire command implements the Command trait, which validates its
//! arguments and turns them into a typed rpc::Request. Execution is left to
//! the service, so commands never touch the store directly.

mod registry;

mod string;
mod admin;

pub use registry::CommandRegistry;

use crate::protocol::RespValue;
use crate::rpc::{Request, RpcError};

/// Command parsing trait
pub trait Command: Send + Sync {
    /// Build the request from the command arguments (excluding the command name itself)
    fn parse(&self, args: &[RespValue]) -> Result<Request, RpcError>;

    /// Get the command name
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited)
    fn max_args(&self) -> Option<usize> {
        None
    }
}

/// Extract a UTF-8 string argument
pub(crate) fn extract_string(value: &RespValue) -> Result<String, RpcError> {
    let bytes = value
        .as_bulk_string()
        .ok_or_else(|| RpcError::InvalidRequest("expected bulk string argument".to_string()))?;

    String::from_utf8(bytes.to_vec())
        .map_err(|_| RpcError::InvalidRequest("argument is not valid UTF-8".to_string()))
}
