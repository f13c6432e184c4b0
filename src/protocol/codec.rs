//! Chunked stream codec
//!
//! Both strategies share one state machine. Sending serializes the message
//! once, caches the blob and hands it out in bounded slices; receiving pulls
//! segments from the host until an empty one arrives and decodes the
//! concatenation.
//!
//! # Binary format
//!
//! ```text
//! [BINCODE IMAGE (variable)] [CHECKSUM (8 bytes, xxh3-64 LE)]
//! ```

use bytes::{Bytes, BytesMut};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use xxhash_rust::xxh3::xxh3_64;

use super::finite::find_non_finite;
use super::metrics::{ChunkDirection, Metrics};
use super::{CHECKSUM_SIZE, Encoding, Error, ProductionMessage, Result};

/// Host-side source of an inbound chunk stream
pub trait ChunkSource {
    /// Return segment number `iteration`, at most `max_size` bytes long.
    ///
    /// An empty segment ends the stream.
    fn chunk_from_external(&mut self, iteration: usize, max_size: usize) -> Result<Bytes>;
}

/// Host-side target of an outbound chunk stream
pub trait ChunkSink {
    /// Start a fresh stream, discarding any previous one.
    fn begin_stream(&mut self, encoding: Encoding) -> Result<()>;

    /// Append one segment.
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    /// Attach the completed stream.
    fn finish_stream(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Encoding {
    /// Serialize a message in one pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the encoder fails, or if a JSON
    /// message holds a `NaN` or infinite float, which JSON cannot carry.
    pub fn encode<M: ProductionMessage>(self, message: &M) -> Result<Bytes> {
        let serialization = |reason: String| Error::Serialization {
            type_name: M::qualified_name(),
            encoding: self,
            reason,
        };

        let blob = match self {
            Self::Json => {
                if let Some(found) = find_non_finite(message) {
                    return Err(serialization(found.to_string()));
                }
                serde_json::to_vec(message).map_err(|err| serialization(err.to_string()))?
            }
            Self::Binary => {
                let mut bytes =
                    bincode::serialize(message).map_err(|err| serialization(err.to_string()))?;
                let checksum = xxh3_64(&bytes);
                bytes.extend_from_slice(&checksum.to_le_bytes());
                bytes
            }
        };

        Metrics::record_encode(self);
        debug!(
            message = M::qualified_name(),
            encoding = %self,
            len = blob.len(),
            "encoded message"
        );
        Ok(Bytes::from(blob))
    }

    /// Decode a complete, non-empty blob.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] if:
    /// - the binary blob is shorter than its checksum
    /// - the checksum does not match
    /// - the bytes are not a valid image of `M`
    pub fn decode<M: ProductionMessage>(self, bytes: &[u8]) -> Result<M> {
        let result = match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|err| err.to_string()),
            Self::Binary => decode_binary(bytes),
        };

        match result {
            Ok(message) => {
                Metrics::record_decode(self);
                debug!(
                    message = M::qualified_name(),
                    encoding = %self,
                    len = bytes.len(),
                    "decoded message"
                );
                Ok(message)
            }
            Err(reason) => {
                Metrics::record_decode_error();
                Err(Error::Deserialization {
                    type_name: M::qualified_name(),
                    encoding: self,
                    reason,
                })
            }
        }
    }
}

fn decode_binary<M: ProductionMessage>(bytes: &[u8]) -> std::result::Result<M, String> {
    if bytes.len() < CHECKSUM_SIZE {
        return Err(format!(
            "truncated: need at least {CHECKSUM_SIZE} bytes, got {}",
            bytes.len()
        ));
    }

    let (image, trailer) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);
    let mut stored = [0u8; CHECKSUM_SIZE];
    stored.copy_from_slice(trailer);
    let stored = u64::from_le_bytes(stored);
    let calculated = xxh3_64(image);
    if stored != calculated {
        return Err(format!(
            "checksum mismatch: expected {calculated:#x}, got {stored:#x}"
        ));
    }

    bincode::deserialize(image).map_err(|err| err.to_string())
}

/// Build a message from an already-decoded field mapping.
///
/// Fields absent from the mapping keep their declared defaults; unknown keys
/// are ignored.
pub fn decode_mapping<M: ProductionMessage>(map: Map<String, Value>) -> Result<M> {
    serde_json::from_value(Value::Object(map)).map_err(|err| {
        Metrics::record_decode_error();
        Error::Deserialization {
            type_name: M::qualified_name(),
            encoding: Encoding::Json,
            reason: err.to_string(),
        }
    })
}

/// Serialize-once cache behind [`SerialStream::chunk`].
///
/// Holds the blob only while a transmission is in progress.
#[derive(Debug)]
pub struct SerialStream {
    encoding: Encoding,
    blob: Option<Bytes>,
}

impl SerialStream {
    /// Create an empty cache for blobs in `encoding`
    #[must_use]
    pub const fn new(encoding: Encoding) -> Self {
        Self { encoding, blob: None }
    }

    /// Return bytes `[start, end)` of the serialized message.
    ///
    /// Iteration 0 runs `encode` and caches its output. The cache is dropped as
    /// soon as a slice reaches the end of the blob, so every later call yields
    /// an empty segment until the next iteration 0.
    ///
    /// Text slices never split a UTF-8 character: the end moves back to the
    /// previous character boundary, or forward to the next one when the window
    /// is narrower than the character at `start`. The next slice starts at
    /// `start + chunk.len()`.
    pub fn chunk<F>(&mut self, iteration: usize, start: usize, end: usize, encode: F) -> Result<Bytes>
    where
        F: FnOnce() -> Result<Bytes>,
    {
        if iteration == 0 {
            self.blob = Some(encode()?);
        }

        let Some(blob) = self.blob.as_ref() else {
            return Ok(Bytes::new());
        };

        let len = blob.len();
        let start = start.min(len);
        let mut end = end.clamp(start, len);
        if self.encoding.is_text() {
            end = char_boundary(blob, start, end);
        }
        let chunk = blob.slice(start..end);
        if end == len {
            self.blob = None;
        }
        Ok(chunk)
    }

    /// Drop any cached blob.
    pub fn clear(&mut self) {
        self.blob = None;
    }

    /// Whether a serialized copy is currently held.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        self.blob.is_some()
    }
}

fn char_boundary(text: &[u8], start: usize, end: usize) -> usize {
    let is_boundary = |index: usize| index == text.len() || text[index] & 0xC0 != 0x80;

    let mut cut = end;
    while cut > start && !is_boundary(cut) {
        cut -= 1;
    }
    if cut == start && end > start {
        cut = end;
        while !is_boundary(cut) {
            cut += 1;
        }
    }
    cut
}

/// Pull segments from `source` until an empty one and concatenate them.
pub fn read_stream<S: ChunkSource + ?Sized>(source: &mut S, max_size: usize) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    let mut iteration = 0;
    loop {
        let part = source.chunk_from_external(iteration, max_size)?;
        if part.is_empty() {
            break;
        }
        trace!(iteration, len = part.len(), "read chunk");
        Metrics::record_chunk(ChunkDirection::Received, part.len());
        buffer.extend_from_slice(&part);
        iteration += 1;
    }
    debug!(chunks = iteration, len = buffer.len(), "read stream");
    Ok(buffer.freeze())
}

/// Drive `next(iteration, start, end)` until it yields an empty segment,
/// writing every segment into `sink`. Returns the number of chunks written.
///
/// Each window opens where the previous segment ended, so a segment shorter
/// than `chunk_size` loses no bytes.
pub fn write_stream<S, F>(sink: &mut S, encoding: Encoding, chunk_size: usize, mut next: F) -> Result<usize>
where
    S: ChunkSink + ?Sized,
    F: FnMut(usize, usize, usize) -> Result<Bytes>,
{
    sink.begin_stream(encoding)?;
    let mut iteration = 0;
    let mut start = 0;
    loop {
        let chunk = next(iteration, start, start.saturating_add(chunk_size))?;
        if chunk.is_empty() {
            break;
        }
        trace!(iteration, len = chunk.len(), "write chunk");
        Metrics::record_chunk(ChunkDirection::Sent, chunk.len());
        sink.write_chunk(&chunk)?;
        iteration += 1;
        start += chunk.len();
    }
    sink.finish_stream()?;
    Ok(iteration)
}
