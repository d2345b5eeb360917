//! Bolt protocol error types.

use std::io;

use thiserror::Error;

use super::packstream::PackStreamError;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Bolt protocol errors.
///
/// Everything except `Encode` and `InvalidState` leaves the session closed.
#[derive(Error, Debug)]
pub enum BoltError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Version negotiation failed
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Inbound message could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[source] PackStreamError),

    /// Outbound value could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[source] PackStreamError),

    /// Protocol error (malformed envelope, correlation broken, ...)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Message signature not valid in the current state
    #[error("Unexpected message 0x{signature:02X} while {state}")]
    UnexpectedMessage { signature: u8, state: &'static str },

    /// Server rejected INIT
    #[error("Initialization failed: {code} - {message}")]
    InitFailed { code: String, message: String },

    /// Reassembled message exceeds the configured limit
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Timed out waiting for the server
    #[error("Timed out during {0}")]
    Timeout(&'static str),

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,
}

impl BoltError {
    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether the error leaves the session unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BoltError::Encode(_) | BoltError::InvalidState(_))
    }
}

/// Handshake-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Server accepted none of the proposed versions
    #[error("No compatible protocol version found")]
    NoCompatibleVersion,

    /// Server picked a version this client did not propose
    #[error("Unsupported protocol version: 0x{0:08X}")]
    UnsupportedVersion(u32),

    /// Transport closed before the reply arrived
    #[error("Connection closed during handshake")]
    ConnectionClosed,
}
