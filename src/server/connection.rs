//! Connection handling
//!
//! Manages individual client connections, parsing RESP commands
//! and sending responses.

use crate::dispatch::Dispatcher;
use crate::protocol::{RespEncoder, RespParser, RespValue};
use anyhow::bail;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Connection handler
pub struct Connection {
    /// TCP stream
    stream: TcpStream,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Handle the connection
    ///
    /// Serves every complete command in the read buffer, then waits for more
    /// bytes. Returns when the client hangs up or `shutdown` fires. A command
    /// already being dispatched still runs to completion, but its reply is
    /// dropped if the client stops reading and `shutdown` fires meanwhile.
    pub async fn handle(
        &mut self,
        dispatcher: &Dispatcher,
        shutdown: &CancellationToken,
    ) -> anyhow::Result<()> {
        loop {
            // Serve what is already buffered (pipelined commands)
            loop {
                match RespParser::parse(&mut self.read_buffer) {
                    Ok(Some(frame)) => {
                        debug!("Parsed command: {}", frame);
                        let response = dispatcher.dispatch(frame).await;
                        debug!("Response: {}", response);
                        if !self.send_response(&response, shutdown).await? {
                            return Ok(());
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Protocol error: {}", e);
                        // Framing is lost, drop whatever is buffered
                        self.read_buffer.clear();
                        let response = RespValue::error(format!("ERR protocol error: {}", e));
                        if !self.send_response(&response, shutdown).await? {
                            return Ok(());
                        }
                        break;
                    }
                }
            }

            let n = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Closing connection for shutdown");
                    return Ok(());
                }
                read = self.stream.read_buf(&mut self.read_buffer) => read?,
            };

            // Connection closed
            if n == 0 {
                if self.read_buffer.is_empty() {
                    return Ok(());
                }
                bail!("connection reset by peer with {} unparsed bytes", self.read_buffer.len());
            }

            debug!("Read {} bytes", n);
        }
    }

    /// Send a response to the client
    ///
    /// Returns `false` if `shutdown` fired before the client took the whole reply.
    async fn send_response(
        &mut self,
        response: &RespValue,
        shutdown: &CancellationToken,
    ) -> anyhow::Result<bool> {
        self.write_buffer.clear();
        RespEncoder::encode_to(&mut self.write_buffer, response);

        let stream = &mut self.stream;
        let write_buffer = &self.write_buffer;
        let write = async move {
            stream.write_all(write_buffer).await?;
            stream.flush().await
        };

        tokio::select! {
            _ = shutdown.cancelled() => {
                warn!("Client not reading replies, closing connection for shutdown");
                Ok(false)
            }
            written = write => {
                written?;
                Ok(true)
            }
        }
    }
}
