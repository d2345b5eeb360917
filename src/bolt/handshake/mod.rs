//! Bolt protocol handshake.
//!
//! The handshake consists of:
//! 1. Client sends 4-byte magic number (0x6060B017)
//! 2. Client sends 4 x 4-byte version proposals (preferred first, zero padded)
//! 3. Server responds with 4-byte agreed version (or 0 if none)
//!
//! Only after the reply has been accepted does the connection switch to
//! chunked messages.

mod negotiation;
mod version;

pub use negotiation::Handshake;
pub use version::BoltVersion;

pub use super::error::HandshakeError;

/// Bolt protocol magic number: 0x6060B017
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Size of the complete handshake message from client (magic + 4 versions)
pub const HANDSHAKE_SIZE: usize = 20;

/// Size of server response (negotiated version)
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;
