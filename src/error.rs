//! Error types for the duplex bridge.
//!
//! Every failure a bridge, its session or a command loop can report is a
//! variant of [`Error`]. None of them outlives the bridge that produced it:
//! a failed write leaves the bridge usable, a closed bridge stays closed.
//!
//! ```ignore
//! use ws_duplex_bridge::{Error, Result};
//!
//! fn reply(bridge: &Bridge, text: &str) -> Result<()> {
//!     match bridge.send_text(text) {
//!         // The peer left; nothing to answer.
//!         Err(Error::ConnectionClosed) => Ok(()),
//!         other => other,
//!     }
//! }
//! ```
//!
//! | Raised by | Variants |
//! |-----------|----------|
//! | [`BridgeOptions::validate`](crate::BridgeOptions::validate) | [`Error::Config`] |
//! | Session establishment and writes | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::WebSocket`] |
//! | Sends on a closed bridge | [`Error::ConnectionClosed`] |
//! | Bounded sends | [`Error::Timeout`] |
//! | Inbound command parsing | [`Error::Protocol`] |
//! | Encoding, sockets | [`Error::Json`], [`Error::Io`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Crate result alias over [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Bridge error.
#[derive(Error, Debug)]
pub enum Error {
    /// [`BridgeOptions`](crate::BridgeOptions) rejected before any session
    /// was created.
    #[error("Invalid bridge options: {message}")]
    Config {
        /// What was wrong with the options.
        message: String,
    },

    /// The transport failed a write, or never came up.
    #[error("Transport failure: {message}")]
    Connection {
        /// Transport-supplied detail.
        message: String,
    },

    /// Accept or dial did not complete within the establishment bound.
    #[error("Session not established within {timeout_ms}ms")]
    ConnectionTimeout {
        /// The bound that elapsed.
        timeout_ms: u64,
    },

    /// The bridge is closed.
    ///
    /// Every send after close gets this, as does a send that was waiting
    /// for the write gate when the bridge closed.
    #[error("Bridge closed")]
    ConnectionClosed,

    /// An inbound line is not a well-formed command.
    #[error("Malformed command: {message}")]
    Protocol {
        /// Why the line was rejected.
        message: String,
    },

    /// A bounded send gave up. Only the `*_with_timeout` sends produce it.
    #[error("{operation} gave up after {timeout_ms}ms")]
    Timeout {
        /// Which call gave up.
        operation: String,
        /// The bound that elapsed.
        timeout_ms: u64,
    },

    /// Socket level I/O failure.
    #[error("I/O failure: {0}")]
    Io(#[from] IoError),

    /// A message could not be encoded or a line could not be decoded.
    #[error("JSON failure: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported by the WebSocket layer.
    #[error("WebSocket failure: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Shorthand for [`Error::Config`].
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Connection`].
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Shorthand for [`Error::Protocol`].
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
#[inline]
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the send failed because the bridge is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// Returns `true` for both the establishment bound and bounded sends.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the session itself is the problem, as opposed to
    /// the options, the message or the caller's bound.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
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

    #[test]
    fn test_display_names_the_cause() {
        assert_eq!(
            Error::connection("broken pipe").to_string(),
            "Transport failure: broken pipe"
        );
        assert_eq!(Error::ConnectionClosed.to_string(), "Bridge closed");
        assert_eq!(
            Error::config("zero timeout").to_string(),
            "Invalid bridge options: zero timeout"
        );
        assert_eq!(
            Error::timeout("send", 50).to_string(),
            "send gave up after 50ms"
        );
    }

    #[test]
    fn test_closed_is_only_closed() {
        assert!(Error::ConnectionClosed.is_closed());
        assert!(!Error::connection("reset").is_closed());
        assert!(!Error::connection_timeout(10).is_closed());
    }

    #[test]
    fn test_both_bounds_count_as_timeouts() {
        assert!(Error::timeout("send", 50).is_timeout());
        assert!(Error::connection_timeout(1000).is_timeout());
        assert!(!Error::ConnectionClosed.is_timeout());
    }

    #[test]
    fn test_session_failures_are_connection_errors() {
        assert!(Error::connection("reset").is_connection_error());
        assert!(Error::connection_timeout(1000).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());

        assert!(!Error::config("bad").is_connection_error());
        assert!(!Error::protocol("bad").is_connection_error());
        assert!(!Error::timeout("send", 1).is_connection_error());
    }

    #[test]
    fn test_conversions() {
        let io: Error = IoError::new(ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(io, Error::Io(_)));

        let json: Error = serde_json::from_str::<u8>("[]").unwrap_err().into();
        assert!(matches!(json, Error::Json(_)));
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::from_micros(999)), 0);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }
}
