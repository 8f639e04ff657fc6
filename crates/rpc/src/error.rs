//! Error types for the RPC layer.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure delivered to the caller of a remote method.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The remote handler failed; the payload is the message it reported.
    #[error("{0}")]
    Remote(String),

    /// No reply arrived within the configured call timeout.
    #[error("Call to '{method}' timed out after {timeout:?}")]
    Timeout {
        /// The method that was called.
        method: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Arguments could not be encoded or decoded.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The reply could not be decoded into the requested type.
    #[error("Failed to decode result: {0}")]
    Decode(String),

    /// The call was discarded before a reply arrived.
    #[error("Channel closed")]
    ChannelClosed,
}

impl Error {
    /// The message transmitted by the remote side, if this is a remote failure.
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Remote(message) => Some(message),
            _ => None,
        }
    }
}

/// Convenience failure type for method handlers.
///
/// Handlers may fail with any `Display` type; the text becomes the message
/// reported to the caller. This type covers the common case of a plain message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a handler failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<Error> for HandlerError {
    fn from(error: Error) -> Self {
        Self::new(error.to_string())
    }
}
