//! Platform response envelope
//!
//! Every API response is a JSON object with an `ok` flag. Failure bodies carry
//! an `error` code; success bodies carry arbitrary method-specific fields, kept
//! in [`CallResult::extra`]. Pagination and throttling hints live under
//! `response_metadata`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error code the platform uses for API-level throttling
pub const RATE_LIMITED_ERROR: &str = "ratelimited";

/// Auxiliary metadata attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Cursor identifying the next page; empty or absent means no more pages
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_cursor: String,

    /// Non-fatal warnings reported alongside a successful call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Human-readable diagnostic messages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,

    /// OAuth scopes attached to the presented token
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,

    /// Scopes the failing method would have accepted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_scopes: Vec<String>,

    /// Server-suggested wait before retrying, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Parsed result of one API call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    /// Whether the platform accepted the call
    #[serde(default)]
    pub ok: bool,

    /// Error code when `ok` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Non-fatal warning code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    /// Pagination/throttling metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_metadata: Option<ResponseMetadata>,

    /// Method-specific fields not modeled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallResult {
    /// Parse a response body into a result envelope
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// The next-page cursor, if one is present and non-empty
    pub fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|m| m.next_cursor.as_str())
            .filter(|c| !c.is_empty())
    }

    /// True when the body itself signals API-level throttling
    pub fn is_rate_limited(&self) -> bool {
        !self.ok && self.error.as_deref() == Some(RATE_LIMITED_ERROR)
    }

    /// Server-suggested wait in seconds, when present
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.response_metadata
            .as_ref()
            .and_then(|m| m.retry_after_seconds)
    }
}
