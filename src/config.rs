//! Server configuration
//!
//! Every option is a command-line flag that can also come from a
//! `SNAPKV_*` environment variable.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "127.0.0.1:50051";
pub const DEFAULT_SNAPSHOT: &str = "kvstore.json";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;

/// snapkv server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "snapkv-server", version, about = "In-memory key-value store with snapshot persistence")]
pub struct ServerConfig {
    /// Address of the RESP listener
    #[arg(long, env = "SNAPKV_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Address of the HTTP JSON gateway (disabled when absent)
    #[arg(long, env = "SNAPKV_HTTP_ADDR")]
    pub http_addr: Option<String>,

    /// Snapshot file loaded at startup and written at shutdown
    #[arg(long, env = "SNAPKV_SNAPSHOT", default_value = DEFAULT_SNAPSHOT)]
    pub snapshot: PathBuf,

    /// Neither load nor save a snapshot
    #[arg(long, env = "SNAPKV_NO_PERSIST")]
    pub no_persist: bool,

    /// Deadline of a single request, in milliseconds
    #[arg(long, env = "SNAPKV_REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "SNAPKV_LOG", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Snapshot path, `None` when persistence is disabled
    pub fn snapshot_path(&self) -> Option<&Path> {
        if self.no_persist {
            None
        } else {
            Some(self.snapshot.as_path())
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: DEFAULT_ADDR.to_string(),
            http_addr: None,
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
            no_persist: false,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            log_level: "info".to_string(),
        }
    }
}
