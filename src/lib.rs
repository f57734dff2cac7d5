//! snapkv - A small in-memory key-value store with snapshot persistence
//!
//! The store is a string-to-string map behind a single readers-writer lock,
//! loaded from a JSON snapshot at startup and written back on clean shutdown.
//! It is served over RESP (GET/SET/PING) and, optionally, a JSON HTTP gateway:
//! - `store`: the concurrent mapping and its snapshot format
//! - `rpc`: typed requests and responses shared by server and client
//! - `service`: request deadlines and the load/save lifecycle
//! - `protocol`, `commands`, `dispatch`, `server`: the RESP transport
//! - `web`: the HTTP transport
//! - `client`: async client used by `snapkv-cli`

pub mod protocol;
pub mod store;
pub mod rpc;
pub mod commands;
pub mod dispatch;
pub mod service;
pub mod server;
pub mod web;
pub mod client;
pub mod config;

/// Re-export commonly used types
pub use store::{KvStore, SnapshotError};
pub use protocol::{RespValue, RespError};
pub use rpc::{Request, Response, RpcError};
pub use service::KvService;
pub use client::KvClient;
pub use config::ServerConfig;
