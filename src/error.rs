//! Error types for tablink
//!
//! Provides a unified error type for all client operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Unified error type for tablink operations
#[derive(Debug, Error)]
pub enum ClientError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    /// Address resolution yielded nothing, or no candidate accepted
    #[error("Unable to connect to server at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    Send(#[source] std::io::Error),

    /// Only produced by the bounded-wait correlator operation
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Invalid column type: {0}")]
    InvalidKind(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub(crate) fn connect(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        ClientError::Connect {
            addr: addr.into(),
            reason: reason.into(),
        }
    }
}
