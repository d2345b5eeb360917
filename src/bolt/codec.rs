//! Chunked message framing.
//!
//! Messages are split into chunks with a 2-byte big-endian length prefix
//! and terminated by a zero-length chunk. [`ChunkWriter`] produces that
//! framing; [`BoltCodec`] reassembles it across arbitrary read boundaries.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::BoltError;

/// Maximum chunk payload
pub const MAX_CHUNK_SIZE: usize = 16383;

/// End of message marker (0x00 0x00)
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Default bound on a reassembled message (16 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Splits outgoing message bytes into chunks.
///
/// Bytes may be handed over in any number of pieces; a chunk is emitted
/// each time the pending payload reaches the chunk limit, and
/// [`end_message`](Self::end_message) flushes the remainder and writes the
/// terminator.
#[derive(Debug)]
pub struct ChunkWriter {
    max_chunk_size: usize,
    pending: BytesMut,
}

impl ChunkWriter {
    /// Create a writer using the protocol chunk limit.
    pub fn new() -> Self {
        Self::with_max_chunk_size(MAX_CHUNK_SIZE)
    }

    /// Create a writer with a smaller chunk limit (clamped to `1..=MAX_CHUNK_SIZE`).
    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        let max_chunk_size = max_chunk_size.clamp(1, MAX_CHUNK_SIZE);
        Self {
            max_chunk_size,
            pending: BytesMut::with_capacity(max_chunk_size),
        }
    }

    /// Bytes buffered for the current chunk.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append message bytes, emitting full chunks into `dst`.
    pub fn write(&mut self, mut data: &[u8], dst: &mut BytesMut) {
        while !data.is_empty() {
            let room = self.max_chunk_size - self.pending.len();
            let take = room.min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.pending.len() == self.max_chunk_size {
                self.flush_chunk(dst);
            }
        }
    }

    /// Flush any partial chunk and terminate the message.
    pub fn end_message(&mut self, dst: &mut BytesMut) {
        if !self.pending.is_empty() {
            self.flush_chunk(dst);
        }
        dst.put_slice(&END_MARKER);
    }

    fn flush_chunk(&mut self, dst: &mut BytesMut) {
        tracing::trace!(size = self.pending.len(), "C: chunk");
        dst.reserve(2 + self.pending.len());
        dst.put_u16(self.pending.len() as u16);
        dst.put_slice(&self.pending);
        self.pending.clear();
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bolt message codec for framing.
///
/// Decoding yields the raw payload of each complete message, including
/// empty ones. Partial chunks stay in the source buffer and completed
/// chunks of an unfinished message stay in the codec, so input may be
/// fed in any slicing.
#[derive(Debug)]
pub struct BoltCodec {
    /// Maximum message size
    max_message_size: usize,
    /// Buffer for accumulating chunks
    message_buffer: BytesMut,
    writer: ChunkWriter,
}

impl BoltCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a codec with custom max message size.
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            message_buffer: BytesMut::with_capacity(4096),
            writer: ChunkWriter::new(),
        }
    }

    /// Whether chunks of an unterminated message are buffered.
    pub fn in_message(&self) -> bool {
        !self.message_buffer.is_empty()
    }
}

impl Default for BoltCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BoltCodec {
    type Item = BytesMut;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // Need at least 2 bytes for chunk header
            if src.len() < 2 {
                return Ok(None);
            }

            let chunk_size = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_size == 0 {
                src.advance(2);
                let message = self.message_buffer.split();
                tracing::trace!(size = message.len(), "S: end of message");
                return Ok(Some(message));
            }

            if src.len() < 2 + chunk_size {
                src.reserve(2 + chunk_size - src.len());
                return Ok(None);
            }

            let size = self.message_buffer.len() + chunk_size;
            if size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.message_buffer.extend_from_slice(&src[..chunk_size]);
            src.advance(chunk_size);
            tracing::trace!(size = chunk_size, "S: chunk");
        }
    }
}

impl Encoder<&[u8]> for BoltCodec {
    type Error = BoltError;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.writer.write(payload, dst);
        self.writer.end_message(dst);
        Ok(())
    }
}
