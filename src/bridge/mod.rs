//! Blocking duplex bridge over an asynchronous transport.
//!
//! # State Machine
//!
//! | State | open event | message event | close | `send` | `receive_next` |
//! |-------|------------|---------------|-------|--------|----------------|
//! | `Disconnected` | → `Connected` | enqueue | → `Closed` | blocks | blocks |
//! | `Connected` | ignored | enqueue | → `Closed` | serialized | next or blocks |
//! | `Closed` | ignored | enqueue | no-op | fails fast | end of stream |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`DuplexBridge`] |
//! | `client` | Reader/writer traits and the command loop |
//! | `state` | [`ConnectionState`] and the lifecycle |
//! | `inbound` | Inbound hand-off queue |

// ============================================================================
// Submodules
// ============================================================================

/// Reader/writer traits and the command loop.
pub mod client;

/// The bridge itself.
pub mod core;

mod inbound;

/// Connection lifecycle.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{ClientReader, ClientWriter, Incoming, serve};
pub use self::core::DuplexBridge;
pub use state::ConnectionState;
