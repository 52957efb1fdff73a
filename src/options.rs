//! Transport configuration.
//!
//! Controls how the single connection attempt behind a bridge is
//! established and which frame limits the WebSocket layer enforces.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ws_duplex_bridge::BridgeOptions;
//!
//! let options = BridgeOptions::new()
//!     .with_establish_timeout(Duration::from_secs(5))
//!     .with_max_message_size(1 << 20);
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bound on accepting or dialing the connection.
pub const DEFAULT_ESTABLISH_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// BridgeOptions
// ============================================================================

/// Configuration for one bridged WebSocket session.
///
/// None of these settings bound `send` or `receive_next`; the only timeout
/// here applies to establishing the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Bound on accepting (listen) or dialing (connect) the peer.
    ///
    /// `None` waits indefinitely.
    pub establish_timeout: Option<Duration>,

    /// Maximum size of a reassembled inbound message, in bytes.
    pub max_message_size: Option<usize>,

    /// Maximum size of a single inbound frame, in bytes.
    pub max_frame_size: Option<usize>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            establish_timeout: Some(DEFAULT_ESTABLISH_TIMEOUT),
            max_message_size: None,
            max_frame_size: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the connection establishment bound.
    #[inline]
    #[must_use]
    pub fn with_establish_timeout(mut self, timeout: Duration) -> Self {
        self.establish_timeout = Some(timeout);
        self
    }

    /// Waits indefinitely for the peer.
    #[inline]
    #[must_use]
    pub fn without_establish_timeout(mut self) -> Self {
        self.establish_timeout = None;
        self
    }

    /// Sets the maximum inbound message size.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = Some(bytes);
        self
    }

    /// Sets the maximum inbound frame size.
    #[inline]
    #[must_use]
    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = Some(bytes);
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl BridgeOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero timeout or a zero size limit.
    pub fn validate(&self) -> Result<()> {
        if self.establish_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("Establish timeout must be greater than zero"));
        }
        if self.max_message_size == Some(0) {
            return Err(Error::config("Max message size must be greater than zero"));
        }
        if self.max_frame_size == Some(0) {
            return Err(Error::config("Max frame size must be greater than zero"));
        }
        if let (Some(message), Some(frame)) = (self.max_message_size, self.max_frame_size)
            && frame > message
        {
            return Err(Error::config(format!(
                "Max frame size ({frame}) exceeds max message size ({message})"
            )));
        }
        Ok(())
    }

    /// Builds the tungstenite configuration for these options.
    #[must_use]
    pub fn websocket_config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        if let Some(size) = self.max_message_size {
            config = config.max_message_size(Some(size));
        }
        if let Some(size) = self.max_frame_size {
            config = config.max_frame_size(Some(size));
        }
        config
    }
}

// ============================================================================
// Tests
// ============================================================================
