//! Command and response envelopes.
//!
//! A connected client sends one [`CommandMessage`] per text frame and
//! receives one [`ResponseMessage`] per handled command.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// CommandMessage
// ============================================================================

/// A command sent by the remote client.
///
/// # Format
///
/// ```json
/// {
///   "id": "client-chosen id",
///   "command": "dump",
///   "args": ["foo", "bar"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Client-chosen correlation ID, echoed back in the response.
    #[serde(default)]
    pub id: Option<String>,

    /// Command name.
    pub command: String,

    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandMessage {
    /// Parses a command from one received line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the line is not a command envelope or
    /// names an empty command.
    pub fn parse(line: &str) -> Result<Self> {
        let message: Self = serde_json::from_str(line)
            .map_err(|e| Error::protocol(e.to_string()))?;

        if message.command.trim().is_empty() {
            return Err(Error::protocol("Command name is empty"));
        }

        Ok(message)
    }
}

// ============================================================================
// ResponseStatus
// ============================================================================

/// Outcome of a handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The command ran and produced a payload.
    Success,
    /// The command was rejected, e.g. invalid arguments.
    Failure,
    /// The command raised an error while running.
    Exception,
}

// ============================================================================
// ResponseMessage
// ============================================================================

/// A response sent back to the remote client.
///
/// # Format
///
/// ```json
/// {
///   "id": "client-chosen id",
///   "status": "success",
///   "commandName": "dump",
///   "payload": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage<T> {
    /// Correlation ID copied from the command, if any.
    pub id: Option<String>,

    /// Outcome.
    pub status: ResponseStatus,

    /// Name of the command this responds to.
    pub command_name: String,

    /// Result or error description.
    pub payload: T,
}

impl<T> ResponseMessage<T> {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(command: &CommandMessage, payload: T) -> Self {
        Self::with_status(command, ResponseStatus::Success, payload)
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Converts the payload, keeping id, status and command name.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseMessage<U> {
        ResponseMessage {
            id: self.id,
            status: self.status,
            command_name: self.command_name,
            payload: f(self.payload),
        }
    }

    fn with_status(command: &CommandMessage, status: ResponseStatus, payload: T) -> Self {
        Self {
            id: command.id.clone(),
            status,
            command_name: command.command.clone(),
            payload,
        }
    }
}

impl ResponseMessage<String> {
    /// Creates a failure response with a description.
    #[inline]
    #[must_use]
    pub fn failure(command: &CommandMessage, reason: impl Into<String>) -> Self {
        Self::with_status(command, ResponseStatus::Failure, reason.into())
    }

    /// Creates an exception response from an error.
    #[inline]
    #[must_use]
    pub fn exception(command: &CommandMessage, error: &dyn std::error::Error) -> Self {
        Self::with_status(command, ResponseStatus::Exception, error.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
