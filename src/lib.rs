//! WebSocket duplex bridge - blocking reads and writes over an async socket.
//!
//! This library adapts an event-driven WebSocket session, whose events
//! arrive on tokio worker threads, to a synchronous interface: a consumer
//! thread calls "read the next message" and "send a message" as ordinary
//! blocking calls.
//!
//! # Architecture
//!
//! - **Transport edge**: [`TransportSession`] / [`TransportEvents`], a narrow
//!   capability pair; [`WsSession`] implements it on tokio-tungstenite
//! - **Consumer edge**: [`DuplexBridge::send`], [`DuplexBridge::receive_next`],
//!   [`DuplexBridge::close`]
//!
//! Key guarantees:
//!
//! - Inbound messages are read in arrival order
//! - At most one write is in flight at any time
//! - After close, sends fail fast and the reader sees end of stream
//! - Close is idempotent from either side
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use ws_duplex_bridge::transport::{Endpoint, PendingServer};
//! use ws_duplex_bridge::{BridgeOptions, DuplexBridge, JsonEncoder, Result};
//!
//! fn main() -> Result<()> {
//!     let runtime = tokio::runtime::Runtime::new()?;
//!     let server = runtime.block_on(PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))?;
//!     println!("connect to {}", server.ws_url());
//!
//!     let bridge = DuplexBridge::spawn(
//!         Endpoint::Listen(server),
//!         BridgeOptions::new(),
//!         JsonEncoder,
//!         runtime.handle(),
//!     )?;
//!
//!     for line in bridge.incoming() {
//!         bridge.send_text(&line)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`DuplexBridge`], client traits, command loop |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`options`] | [`BridgeOptions`] |
//! | [`protocol`] | Command/response envelopes and encoding |
//! | [`transport`] | Transport capability traits and WebSocket session |

// ============================================================================
// Modules
// ============================================================================

/// Blocking duplex bridge.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Transport configuration.
pub mod options;

/// Command/response envelopes and outbound encoding.
pub mod protocol;

/// Transport capability traits and the WebSocket session.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{ClientReader, ClientWriter, ConnectionState, DuplexBridge, Incoming, serve};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SessionId;

// Configuration
pub use options::BridgeOptions;

// Protocol types
pub use protocol::{CommandMessage, JsonEncoder, MessageEncoder, ResponseMessage, ResponseStatus};

// Transport types
pub use transport::{Endpoint, PendingServer, TransportEvents, TransportSession, WsSession};
