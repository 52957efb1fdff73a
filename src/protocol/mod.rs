//! Message types exchanged with the connected client.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `CommandMessage` | Remote → Local | Command request |
//! | `ResponseMessage` | Local → Remote | Command outcome |
//!
//! Each message travels as one WebSocket text frame. The bridge itself only
//! moves text; these types and the [`MessageEncoder`] are what a consumer
//! loop uses on either side of it.

// ============================================================================
// Submodules
// ============================================================================

/// Outbound encoding.
pub mod encoder;

/// Command and response envelopes.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use encoder::{JsonEncoder, MessageEncoder};
pub use message::{CommandMessage, ResponseMessage, ResponseStatus};
