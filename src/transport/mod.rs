//! WebSocket transport layer.
//!
//! This module defines the narrow capability interface between a bridge
//! and whatever delivers socket events, plus the shipped WebSocket
//! implementation of it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  send_text / close   ┌──────────────────┐
//! │  DuplexBridge    │─────────────────────►│  WsSession       │
//! │  (consumer side) │                      │  (handle)        │
//! │                  │◄─────────────────────│                  │
//! └──────────────────┘  on_open / on_message└────────┬─────────┘
//!                       / on_close                   │ mpsc
//!                                           ┌────────▼─────────┐
//!                                           │  SessionDriver   │
//!                                           │  (tokio task)    │◄──► peer
//!                                           └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `WsSession::new` - Create a not-yet-open session and its driver
//! 2. `DuplexBridge::bind` - Register the bridge as the event sink
//! 3. `SessionDriver::run` - Accept or dial, then pump frames
//! 4. `on_close` - Fired exactly once when the stream ends
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Session handle and event loop |
//! | `server` | Listener binding for the accept side |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Weak;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket session handle and event loop.
pub mod connection;

/// WebSocket listener for the accept side.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Endpoint, SessionDriver, WsSession};
pub use server::PendingServer;

// ============================================================================
// Capability Traits
// ============================================================================

/// Event sink for a transport session.
///
/// Callbacks may arrive on any thread, and must return promptly.
pub trait TransportEvents: Send + Sync {
    /// The connection is established. Invoked at most once.
    fn on_open(&self);

    /// A text message arrived.
    fn on_message(&self, text: String);

    /// The connection ended, or never came up.
    fn on_close(&self);
}

/// Outbound capabilities of a transport session.
pub trait TransportSession: Send + Sync {
    /// Registers the sink that receives this session's events.
    ///
    /// The session holds the sink weakly; events fired after the sink is
    /// dropped are discarded.
    fn set_event_sink(&self, sink: Weak<dyn TransportEvents>);

    /// Writes one text message, blocking until the transport reports
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects or fails the write.
    fn send_text(&self, text: &str) -> Result<()>;

    /// Requests the session to close. Never blocks.
    fn close(&self);

    /// Returns `true` while the connection is established.
    fn is_open(&self) -> bool;
}
