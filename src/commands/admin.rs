//! Admin commands (PING)

use super::Command;
use crate::protocol::RespValue;
use crate::rpc::{Request, RpcError};

/// PING command - Check that the server answers
///
/// Syntax: PING
pub struct PingCommand;

impl Command for PingCommand {
    fn parse(&self, _args: &[RespValue]) -> Result<Request, RpcError> {
        Ok(Request::Ping)
    }

    fn name(&self) -> &'static str {
        "PING"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}
