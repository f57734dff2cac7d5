//! In-memory storage module
//!
//! Provides the concurrent key-value mapping and its snapshot persistence.
//! This module is independent of protocol and command handling (loose coupling).

mod memory;
mod snapshot;

pub use memory::KvStore;
pub use snapshot::{decode_snapshot, encode_snapshot, SnapshotError};
