//! # Bolt Protocol Implementation
//!
//! Wire-level building blocks for the Bolt v1 client.
//!
//! ## Submodules
//!
//! - [`packstream`] - Binary value encoding, graph entities and hydration
//! - [`codec`] - Chunk framing and reassembly
//! - [`handshake`] - Version negotiation
//! - [`message`] - Bolt message types (INIT, RUN, PULL_ALL, SUCCESS, ...)
//! - [`error`] - Protocol error types
//!
//! Most users drive these through [`crate::client`].

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;

pub use codec::{BoltCodec, ChunkWriter, END_MARKER, MAX_CHUNK_SIZE};
pub use error::{BoltError, BoltResult, HandshakeError};
pub use handshake::{BoltVersion, Handshake, BOLT_MAGIC, HANDSHAKE_RESPONSE_SIZE, HANDSHAKE_SIZE};
pub use message::{
    BoltRequest, BoltResponse, FailureMessage, IgnoredMessage, InitMessage, RecordMessage,
    RunMessage, SuccessMessage,
};
pub use packstream::{
    hydrate, Node, PackStreamDecoder, PackStreamEncoder, PackStreamError, PackStreamMap,
    PackStreamStructure, PackStreamValue, Relationship,
};
