//! String commands (GET, SET)

use super::{extract_string, Command};
use crate::protocol::RespValue;
use crate::rpc::{Request, RpcError};

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn parse(&self, args: &[RespValue]) -> Result<Request, RpcError> {
        let key = extract_string(&args[0])?;
        Ok(Request::get(key))
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// SET command - Set a key to a value
///
/// Syntax: SET key value
pub struct SetCommand;

impl Command for SetCommand {
    fn parse(&self, args: &[RespValue]) -> Result<Request, RpcError> {
        let key = extract_string(&args[0])?;
        let value = extract_string(&args[1])?;
        Ok(Request::set(key, value))
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}
