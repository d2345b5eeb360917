//! PackStream encoder.

use bytes::{BufMut, BytesMut};

use super::marker::*;
use super::types::{PackStreamMap, PackStreamStructure, PackStreamValue};
use super::{PackStreamError, DEFAULT_MAX_DEPTH};

/// PackStream encoder that writes values to a byte buffer.
pub struct PackStreamEncoder {
    buffer: BytesMut,
    max_depth: usize,
    depth: usize,
}

impl PackStreamEncoder {
    /// Create a new encoder with default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new encoder with specified buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    /// Limit how deeply lists, maps and structures may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Consume the encoder and return the bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Encode a PackStreamValue.
    ///
    /// On error the buffer may hold a partially written value; callers
    /// discard the encoder rather than sending its contents.
    pub fn encode(&mut self, value: &PackStreamValue) -> Result<(), PackStreamError> {
        match value {
            PackStreamValue::Null => {
                self.encode_null();
                Ok(())
            }
            PackStreamValue::Boolean(b) => {
                self.encode_bool(*b);
                Ok(())
            }
            PackStreamValue::Integer(i) => {
                self.encode_int(*i);
                Ok(())
            }
            PackStreamValue::Float(f) => {
                self.encode_float(*f);
                Ok(())
            }
            PackStreamValue::String(s) => self.encode_string(s),
            PackStreamValue::List(l) => self.encode_list(l),
            PackStreamValue::Map(m) => self.encode_map(m),
            PackStreamValue::Structure(s) => self.encode_structure(s),
            PackStreamValue::Node(n) => self.encode_structure(&n.to_structure()),
            PackStreamValue::Relationship(r) => self.encode_structure(&r.to_structure()),
        }
    }

    /// Encode null.
    pub fn encode_null(&mut self) {
        self.buffer.put_u8(NULL);
    }

    /// Encode a boolean.
    pub fn encode_bool(&mut self, value: bool) {
        self.buffer.put_u8(if value { TRUE } else { FALSE });
    }

    /// Encode an integer using the smallest representation.
    pub fn encode_int(&mut self, value: i64) {
        if can_encode_tiny_int(value) {
            self.buffer.put_u8(value as u8);
        } else if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(value as i8);
        } else if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(value as i16);
        } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(value as i32);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Encode a float (always 64-bit).
    pub fn encode_float(&mut self, value: f64) {
        self.buffer.put_u8(FLOAT_64);
        self.buffer.put_f64(value);
    }

    /// Encode UTF-8 text.
    pub fn encode_string(&mut self, value: &str) -> Result<(), PackStreamError> {
        let bytes = value.as_bytes();
        self.write_header(
            "text",
            bytes.len(),
            TINY_TEXT_BASE,
            [Some(TEXT_8), Some(TEXT_16), Some(TEXT_32)],
        )?;
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Encode a list.
    pub fn encode_list(&mut self, values: &[PackStreamValue]) -> Result<(), PackStreamError> {
        self.write_header(
            "list",
            values.len(),
            TINY_LIST_BASE,
            [Some(LIST_8), Some(LIST_16), Some(LIST_32)],
        )?;
        self.nested(|enc| {
            for value in values {
                enc.encode(value)?;
            }
            Ok(())
        })
    }

    /// Encode a map.
    pub fn encode_map(&mut self, map: &PackStreamMap) -> Result<(), PackStreamError> {
        self.write_header(
            "map",
            map.len(),
            TINY_MAP_BASE,
            [Some(MAP_8), Some(MAP_16), Some(MAP_32)],
        )?;
        self.nested(|enc| {
            for (key, value) in map {
                enc.encode_string(key)?;
                enc.encode(value)?;
            }
            Ok(())
        })
    }

    /// Encode a structure.
    pub fn encode_structure(&mut self, s: &PackStreamStructure) -> Result<(), PackStreamError> {
        self.write_header(
            "structure fields",
            s.fields.len(),
            TINY_STRUCT_BASE,
            [Some(STRUCT_8), Some(STRUCT_16), None],
        )?;
        self.buffer.put_u8(s.signature);
        self.nested(|enc| {
            for field in &s.fields {
                enc.encode(field)?;
            }
            Ok(())
        })
    }

    /// Write the marker (and size field) for a sized kind.
    ///
    /// `sized` holds the 8/16/32-bit markers; `None` means the kind has no
    /// such size class.
    fn write_header(
        &mut self,
        kind: &'static str,
        len: usize,
        tiny_base: u8,
        sized: [Option<u8>; 3],
    ) -> Result<(), PackStreamError> {
        let too_large = PackStreamError::ValueTooLarge(kind, len);
        if len <= TINY_SIZE_MAX {
            self.buffer.put_u8(tiny_base | len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(sized[0].ok_or(too_large)?);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(sized[1].ok_or(too_large)?);
            self.buffer.put_u16(len as u16);
        } else if len <= u32::MAX as usize {
            self.buffer.put_u8(sized[2].ok_or(too_large)?);
            self.buffer.put_u32(len as u32);
        } else {
            return Err(too_large);
        }
        Ok(())
    }

    fn nested<F>(&mut self, body: F) -> Result<(), PackStreamError>
    where
        F: FnOnce(&mut Self) -> Result<(), PackStreamError>,
    {
        if self.depth >= self.max_depth {
            return Err(PackStreamError::NestingTooDeep(self.max_depth));
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }
}

impl Default for PackStreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to encode a single value.
pub fn encode(value: &PackStreamValue) -> Result<BytesMut, PackStreamError> {
    let mut encoder = PackStreamEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}
