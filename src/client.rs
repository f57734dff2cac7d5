//! RESP client
//!
//! Issues Get/Set requests over one TCP connection, each bounded by a deadline.

use crate::protocol::{RespEncoder, RespParser, RespValue};
use crate::rpc::{GetResponse, Request, Response, RpcError, SetResponse};
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time;
use tracing::debug;

/// Client for a snapkv server
///
/// A call that hits its deadline leaves the connection in an unknown state
/// (the reply may still arrive later); drop the client and reconnect.
pub struct KvClient {
    stream: TcpStream,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    timeout: Duration,
}

impl KvClient {
    /// Connect to `addr`; `timeout` bounds the connect and every later call
    pub async fn connect(addr: impl ToSocketAddrs, timeout: Duration) -> Result<Self, RpcError> {
        let stream = time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| RpcError::DeadlineExceeded)??;
        stream.set_nodelay(true)?;

        Ok(KvClient {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
            timeout,
        })
    }

    /// Get the value of `key`
    pub async fn get(&mut self, key: &str) -> Result<GetResponse, RpcError> {
        match self.call(Request::get(key)).await? {
            Response::Get(resp) => Ok(resp),
            other => Err(RpcError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Set `key` to `value`
    pub async fn set(&mut self, key: &str, value: &str) -> Result<SetResponse, RpcError> {
        match self.call(Request::set(key, value)).await? {
            Response::Set(resp) => Ok(resp),
            other => Err(RpcError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Check that the server answers
    pub async fn ping(&mut self) -> Result<(), RpcError> {
        match self.call(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(RpcError::UnexpectedResponse(format!("{:?}", other))),
        }
    }

    /// Send one request and decode its reply within the deadline
    pub async fn call(&mut self, request: Request) -> Result<Response, RpcError> {
        let timeout = self.timeout;
        let frame = time::timeout(timeout, self.round_trip(&request))
            .await
            .map_err(|_| RpcError::DeadlineExceeded)??;

        Response::from_resp(&request, frame)
    }

    async fn round_trip(&mut self, request: &Request) -> Result<RespValue, RpcError> {
        debug!("Sending {}", request.name());

        self.write_buffer.clear();
        RespEncoder::encode_to(&mut self.write_buffer, &request.to_resp());
        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;

        loop {
            if let Some(frame) = RespParser::parse(&mut self.read_buffer)? {
                return Ok(frame);
            }

            if self.stream.read_buf(&mut self.read_buffer).await? == 0 {
                return Err(RpcError::ConnectionClosed);
            }
        }
    }
}
