//! Error types for the pub/sub transport.
//!
//! This module defines all error types used throughout the crate.
//! Every failure a request can reach is normalized into one [`Error`]
//! variant so collaborators pattern-match instead of duck-typing
//! response shapes.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use pubsub_transport::{Result, Error};
//!
//! fn on_failure(err: Error) {
//!     match err {
//!         Error::Timeout { .. } => { /* give up */ }
//!         Error::Status { status, payload, .. } => { /* inspect server reply */ }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Construction | [`Error::Construction`] |
//! | Terminal request outcomes | [`Error::Timeout`], [`Error::Network`], [`Error::Status`], [`Error::Parse`] |
//! | Pool lifecycle | [`Error::PoolDestroyed`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// The four terminal request outcomes ([`Error::Timeout`],
/// [`Error::Network`], [`Error::Status`], [`Error::Parse`]) are the only
/// values ever delivered through a failure callback. [`Error::Construction`]
/// is returned synchronously from `send` and never reaches a callback.
///
/// The `Display` strings of the terminal variants are part of the
/// collaborator contract and must not change.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// Request descriptor could not be turned into a dispatchable target.
    ///
    /// Returned synchronously from `Transport::send`. The transport never
    /// re-issues a request that failed construction.
    #[error("Construction error: {message}")]
    Construction {
        /// Description of the invalid descriptor or target.
        message: String,
    },

    // ========================================================================
    // Terminal Request Outcomes
    // ========================================================================
    /// The request timer fired before the exchange completed.
    #[error("timeout")]
    Timeout {
        /// Milliseconds waited before the timer fired.
        timeout_ms: u64,
    },

    /// Transport-level failure: connect, write, or mid-stream read error.
    #[error("Network Connection Error")]
    Network {
        /// Underlying failure detail, for logs only.
        message: String,
    },

    /// The server answered with a non-200 status.
    ///
    /// `payload` holds the parsed JSON body when the body was parseable,
    /// `message` always holds the raw body text.
    #[error("HTTP status {status}")]
    Status {
        /// HTTP status code of the response.
        status: u16,
        /// Parsed JSON body, when the body was valid JSON.
        payload: Option<Value>,
        /// Raw response body text.
        message: String,
    },

    /// A 200 response carried a body that is not valid JSON.
    #[error("error in response parsing")]
    Parse,

    // ========================================================================
    // Pool Lifecycle Errors
    // ========================================================================
    /// A keep-alive request was issued after the pools were destroyed.
    #[error("Connection pools destroyed")]
    PoolDestroyed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a construction error.
    #[inline]
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates a network error with underlying detail.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a status error for a non-200 response with a parsed body.
    #[inline]
    pub fn status_parsed(status: u16, payload: Value, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            payload: Some(payload),
            message: message.into(),
        }
    }

    /// Creates a status error for a non-200 response with an unparsable body.
    #[inline]
    pub fn status_raw(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            payload: None,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout outcome.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a transport-level network failure.
    #[inline]
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Io(_))
    }

    /// Returns `true` if this is a non-200 status outcome.
    #[inline]
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Returns `true` if this error can be delivered through a failure
    /// callback.
    ///
    /// Construction and pool-lifecycle errors are surfaced synchronously
    /// and never reach a callback.
    #[inline]
    #[must_use]
    pub fn is_terminal_outcome(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Network { .. } | Self::Status { .. } | Self::Parse
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    use serde_json::json;

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout(5000);
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn test_network_display() {
        let err = Error::network("connection refused");
        assert_eq!(err.to_string(), "Network Connection Error");
    }

    #[test]
    fn test_parse_display() {
        assert_eq!(Error::Parse.to_string(), "error in response parsing");
    }

    #[test]
    fn test_status_parsed() {
        let err = Error::status_parsed(400, json!({"error": true}), "{\"error\":true}");
        match err {
            Error::Status {
                status,
                payload: Some(payload),
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(payload["error"], json!(true));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_raw() {
        let err = Error::status_raw(500, "oops");
        match err {
            Error::Status {
                status,
                payload,
                message,
            } => {
                assert_eq!(status, 500);
                assert!(payload.is_none());
                assert_eq!(message, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::timeout(100).is_timeout());
        assert!(!Error::network("x").is_timeout());
    }

    #[test]
    fn test_is_terminal_outcome() {
        assert!(Error::timeout(100).is_terminal_outcome());
        assert!(Error::Parse.is_terminal_outcome());
        assert!(!Error::construction("bad").is_terminal_outcome());
        assert!(!Error::PoolDestroyed.is_terminal_outcome());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_network());
    }
}
