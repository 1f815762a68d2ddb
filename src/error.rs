//! Client error taxonomy
//!
//! Platform-level failures (`ok: false` bodies) are not represented here: they
//! resolve as an ordinary [`crate::CallResult`] so callers can distinguish
//! transport/protocol failures (an `Err`) from API-semantic failures (an `Ok`
//! result with `ok == false`).

use std::time::Duration;

/// Errors surfaced by the client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid construction or call arguments, raised before any network activity
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP exchange could not be completed (DNS, connection, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// The exchange completed but the status is outside the platform envelope
    #[error("HTTP error {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Raw response body, useful for diagnostics
        body: String,
    },

    /// Explicit throttling signal (HTTP 429 or an `ok:false, error:"ratelimited"` body)
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-suggested wait before the next attempt
        retry_after: Duration,
    },

    /// Response body could not be parsed as a platform envelope
    #[error("parse error: {0}")]
    Parse(String),

    /// Pagination safety cap exceeded (possible repeated-cursor loop)
    #[error("pagination aborted after {pages} pages: safety cap reached")]
    PaginationLimit {
        /// Number of pages fetched before aborting
        pages: usize,
    },
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;
