//! Command dispatcher
//!
//! Routes incoming frames through the command registry to the service.
//! This module provides loose coupling between the server and command implementations.

use crate::commands::CommandRegistry;
use crate::protocol::RespValue;
use crate::rpc::{Request, RpcError};
use crate::service::KvService;
use tracing::{debug, warn};

/// Command dispatcher
///
/// Receives RESP commands, validates them, and hands the resulting request
/// to the service. Shared by all connections; the store does its own locking.
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    /// Service backing the commands
    service: KvService,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(service: KvService) -> Self {
        let registry = CommandRegistry::new();
        debug!("Registered commands: {:?}", registry.command_names());
        Dispatcher { registry, service }
    }

    /// Dispatch a command
    ///
    /// Takes a RESP value (expected to be an array), parses it into a request,
    /// runs it and encodes the reply. Failures become RESP error frames.
    pub async fn dispatch(&self, frame: RespValue) -> RespValue {
        let request = match self.parse(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected command: {}", e);
                return e.to_resp();
            }
        };

        match self.service.handle(request).await {
            Ok(response) => response.to_resp(),
            Err(e) => e.to_resp(),
        }
    }

    /// Turn a command frame into a request
    pub fn parse(&self, frame: &RespValue) -> Result<Request, RpcError> {
        // Commands should be arrays
        let args = match frame.as_array() {
            Some(arr) if !arr.is_empty() => arr,
            Some(_) => return Err(RpcError::InvalidRequest("empty command array".to_string())),
            None => return Err(RpcError::InvalidRequest("expected array".to_string())),
        };

        // First element is the command name
        let cmd_name = args[0]
            .as_bulk_string()
            .and_then(|name| std::str::from_utf8(name).ok())
            .ok_or_else(|| {
                RpcError::InvalidRequest("command name must be a UTF-8 bulk string".to_string())
            })?;

        debug!("Dispatching command: {}", cmd_name);

        let command = self
            .registry
            .get(cmd_name)
            .ok_or_else(|| RpcError::InvalidRequest(format!("unknown command '{}'", cmd_name)))?;

        // Extract arguments (everything after the command name)
        let cmd_args = &args[1..];

        let too_many = command.max_args().map_or(false, |max| cmd_args.len() > max);
        if cmd_args.len() < command.min_args() || too_many {
            return Err(RpcError::InvalidRequest(format!(
                "wrong number of arguments for '{}' command",
                cmd_name
            )));
        }

        command.parse(cmd_args)
    }

    pub fn service(&self) -> &KvService {
        &self.service
    }
}
