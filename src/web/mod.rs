//! HTTP gateway module
//!
//! Offers the Get/Set operations as JSON over HTTP, next to the RESP listener,
//! plus a small statistics endpoint.

mod server;
mod handlers;

pub use server::{router, run_web};
pub use handlers::{ApiError, ErrorBody, StatsResponse};
