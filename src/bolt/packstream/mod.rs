//! PackStream serialization format.
//!
//! PackStream is the binary serialization format carried inside Bolt
//! chunks. Every value starts with a marker byte; variable-size kinds
//! either fold their size into a tiny marker or follow an explicit
//! size-class marker with a big-endian length.
//!
//! # Supported Types
//!
//! - **Null**: Single byte marker
//! - **Boolean**: True/False markers
//! - **Integer**: Variable-length encoding (-2^63 to 2^63-1)
//! - **Float**: 64-bit IEEE 754
//! - **String**: UTF-8 text, 4/8/16/32-bit size classes
//! - **List**: Heterogeneous collections
//! - **Map**: String keys to arbitrary values
//! - **Structure**: Signature byte plus fields, used for protocol messages
//!   and graph entities
//!
//! # Graph Structures
//!
//! - **Node** (`0x4E`): identity, labels, properties
//! - **Relationship** (`0x52`): identity, start, end, type, properties

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod structures;
pub mod types;

pub use decoder::{decode, decode_with_depth, PackStreamDecoder};
pub use encoder::{encode, PackStreamEncoder};
pub use marker::*;
pub use structures::{hydrate, Node, Relationship};
pub use types::{PackStreamMap, PackStreamStructure, PackStreamValue};

use std::fmt;

/// Default bound on container nesting for both directions.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// PackStream errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamError {
    /// Input ended before the value was complete
    UnexpectedEof { offset: usize, needed: usize },
    /// Unknown marker byte
    UnknownMarker { marker: u8, offset: usize },
    /// Invalid UTF-8 in text
    InvalidUtf8 { offset: usize, reason: String },
    /// Map key that is not text
    InvalidMapKey { offset: usize, found: &'static str },
    /// Value too large to encode in any size class
    ValueTooLarge(&'static str, usize),
    /// Containers nested deeper than the configured limit
    NestingTooDeep(usize),
    /// Bytes left over after a complete value
    TrailingBytes(usize),
    /// Invalid structure format
    InvalidStructure(String),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof { offset, needed } => write!(
                f,
                "Unexpected end of PackStream data at offset {} ({} more bytes needed)",
                offset, needed
            ),
            PackStreamError::UnknownMarker { marker, offset } => write!(
                f,
                "Unknown PackStream marker 0x{:02X} at offset {}",
                marker, offset
            ),
            PackStreamError::InvalidUtf8 { offset, reason } => {
                write!(f, "Invalid UTF-8 in text at offset {}: {}", offset, reason)
            }
            PackStreamError::InvalidMapKey { offset, found } => write!(
                f,
                "Map keys must be text, found {} at offset {}",
                found, offset
            ),
            PackStreamError::ValueTooLarge(t, s) => write!(f, "{} too large: {}", t, s),
            PackStreamError::NestingTooDeep(max) => {
                write!(f, "Value nesting exceeds maximum depth of {}", max)
            }
            PackStreamError::TrailingBytes(n) => {
                write!(f, "{} trailing bytes after complete value", n)
            }
            PackStreamError::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
        }
    }
}

impl std::error::Error for PackStreamError {}
