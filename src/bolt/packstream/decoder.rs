//! PackStream decoder.

use bytes::Buf;

use super::marker::*;
use super::types::{PackStreamMap, PackStreamStructure, PackStreamValue};
use super::{PackStreamError, DEFAULT_MAX_DEPTH};

/// PackStream decoder that reads values from a byte buffer.
///
/// The decoder only produces `Structure` for structured values; turning
/// graph signatures into nodes and relationships is left to hydration.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deeply lists, maps and structures may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Get the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes count.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<PackStreamValue, PackStreamError> {
        let offset = self.pos;
        let marker = self.read_u8()?;

        if is_tiny_int(marker) {
            return Ok(PackStreamValue::Integer(decode_tiny_int(marker) as i64));
        }
        if let Some(len) = tiny_text_len(marker) {
            return self.read_string_data(len);
        }
        if let Some(len) = tiny_list_len(marker) {
            return self.read_list_data(len);
        }
        if let Some(len) = tiny_map_len(marker) {
            return self.read_map_data(len);
        }
        if let Some(len) = tiny_struct_fields(marker) {
            return self.read_struct_data(len);
        }

        match marker {
            NULL => Ok(PackStreamValue::Null),
            TRUE => Ok(PackStreamValue::Boolean(true)),
            FALSE => Ok(PackStreamValue::Boolean(false)),

            FLOAT_64 => Ok(PackStreamValue::Float(self.read_f64()?)),

            INT_8 => Ok(PackStreamValue::Integer(self.read_i8()? as i64)),
            INT_16 => Ok(PackStreamValue::Integer(self.read_i16()? as i64)),
            INT_32 => Ok(PackStreamValue::Integer(self.read_i32()? as i64)),
            INT_64 => Ok(PackStreamValue::Integer(self.read_i64()?)),

            TEXT_8 => {
                let len = self.read_u8()? as usize;
                self.read_string_data(len)
            }
            TEXT_16 => {
                let len = self.read_u16()? as usize;
                self.read_string_data(len)
            }
            TEXT_32 => {
                let len = self.read_u32()? as usize;
                self.read_string_data(len)
            }

            LIST_8 => {
                let len = self.read_u8()? as usize;
                self.read_list_data(len)
            }
            LIST_16 => {
                let len = self.read_u16()? as usize;
                self.read_list_data(len)
            }
            LIST_32 => {
                let len = self.read_u32()? as usize;
                self.read_list_data(len)
            }

            MAP_8 => {
                let len = self.read_u8()? as usize;
                self.read_map_data(len)
            }
            MAP_16 => {
                let len = self.read_u16()? as usize;
                self.read_map_data(len)
            }
            MAP_32 => {
                let len = self.read_u32()? as usize;
                self.read_map_data(len)
            }

            STRUCT_8 => {
                let len = self.read_u8()? as usize;
                self.read_struct_data(len)
            }
            STRUCT_16 => {
                let len = self.read_u16()? as usize;
                self.read_struct_data(len)
            }

            _ => Err(PackStreamError::UnknownMarker { marker, offset }),
        }
    }

    fn read_string_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        let s = std::str::from_utf8(bytes).map_err(|e| PackStreamError::InvalidUtf8 {
            offset,
            reason: e.to_string(),
        })?;
        Ok(PackStreamValue::String(s.to_string()))
    }

    fn read_list_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        self.nested(|dec| {
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(dec.decode()?);
            }
            Ok(PackStreamValue::List(items))
        })
    }

    fn read_map_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        self.nested(|dec| {
            let mut map = PackStreamMap::new();
            for _ in 0..len {
                let offset = dec.pos;
                let key = match dec.decode()? {
                    PackStreamValue::String(s) => s,
                    other => {
                        return Err(PackStreamError::InvalidMapKey {
                            offset,
                            found: other.type_name(),
                        })
                    }
                };
                let value = dec.decode()?;
                map.insert(key, value);
            }
            Ok(PackStreamValue::Map(map))
        })
    }

    fn read_struct_data(&mut self, field_count: usize) -> Result<PackStreamValue, PackStreamError> {
        let signature = self.read_u8()?;
        self.nested(|dec| {
            let mut fields = Vec::with_capacity(field_count.min(64));
            for _ in 0..field_count {
                fields.push(dec.decode()?);
            }
            Ok(PackStreamValue::Structure(PackStreamStructure::new(
                signature, fields,
            )))
        })
    }

    fn nested<F>(&mut self, body: F) -> Result<PackStreamValue, PackStreamError>
    where
        F: FnOnce(&mut Self) -> Result<PackStreamValue, PackStreamError>,
    {
        if self.depth >= self.max_depth {
            return Err(PackStreamError::NestingTooDeep(self.max_depth));
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    // Low-level read methods

    fn ensure(&self, needed: usize) -> Result<(), PackStreamError> {
        if self.remaining() < needed {
            return Err(PackStreamError::UnexpectedEof {
                offset: self.pos,
                needed: needed - self.remaining(),
            });
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, PackStreamError> {
        self.ensure(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn read_i8(&mut self) -> Result<i8, PackStreamError> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self) -> Result<u16, PackStreamError> {
        self.ensure(2)?;
        let value = (&self.data[self.pos..]).get_u16();
        self.pos += 2;
        Ok(value)
    }

    fn read_i16(&mut self) -> Result<i16, PackStreamError> {
        self.ensure(2)?;
        let value = (&self.data[self.pos..]).get_i16();
        self.pos += 2;
        Ok(value)
    }

    fn read_u32(&mut self) -> Result<u32, PackStreamError> {
        self.ensure(4)?;
        let value = (&self.data[self.pos..]).get_u32();
        self.pos += 4;
        Ok(value)
    }

    fn read_i32(&mut self) -> Result<i32, PackStreamError> {
        self.ensure(4)?;
        let value = (&self.data[self.pos..]).get_i32();
        self.pos += 4;
        Ok(value)
    }

    fn read_i64(&mut self) -> Result<i64, PackStreamError> {
        self.ensure(8)?;
        let value = (&self.data[self.pos..]).get_i64();
        self.pos += 8;
        Ok(value)
    }

    fn read_f64(&mut self) -> Result<f64, PackStreamError> {
        self.ensure(8)?;
        let value = (&self.data[self.pos..]).get_f64();
        self.pos += 8;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        self.ensure(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}

/// Decode exactly one value from `data`, rejecting leftover bytes.
pub fn decode(data: &[u8]) -> Result<PackStreamValue, PackStreamError> {
    decode_with_depth(data, DEFAULT_MAX_DEPTH)
}

/// Like [`decode`], with an explicit nesting limit.
pub fn decode_with_depth(data: &[u8], max_depth: usize) -> Result<PackStreamValue, PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data).with_max_depth(max_depth);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(PackStreamError::TrailingBytes(decoder.remaining()));
    }
    Ok(value)
}
