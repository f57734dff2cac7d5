//! Request and response bodies of the remote operations

use serde::{Deserialize, Serialize};

/// Get request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

/// Get response; `value` is empty when `found` is false
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetResponse {
    pub value: String,
    pub found: bool,
}

impl GetResponse {
    pub fn found(value: impl Into<String>) -> Self {
        GetResponse {
            value: value.into(),
            found: true,
        }
    }

    pub fn not_found() -> Self {
        GetResponse::default()
    }
}

impl From<Option<String>> for GetResponse {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) => GetResponse::found(value),
            None => GetResponse::not_found(),
        }
    }
}

/// Set request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
}

/// Set response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResponse {
    pub success: bool,
}
