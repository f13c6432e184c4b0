use std::sync::atomic::{AtomicU64, Ordering};

use super::Encoding;

/// Track codec and dispatch counters without external dependencies.
pub(crate) struct Metrics;

static ENCODED_MESSAGES: AtomicU64 = AtomicU64::new(0);
static DECODED_MESSAGES: AtomicU64 = AtomicU64::new(0);
static BYTES_SENT: AtomicU64 = AtomicU64::new(0);
static BYTES_RECEIVED: AtomicU64 = AtomicU64::new(0);
static CHUNKS_SENT: AtomicU64 = AtomicU64::new(0);
static CHUNKS_RECEIVED: AtomicU64 = AtomicU64::new(0);
static EMPTY_PAYLOAD_FALLBACKS: AtomicU64 = AtomicU64::new(0);
static PASSTHROUGHS: AtomicU64 = AtomicU64::new(0);
static DECODE_ERRORS: AtomicU64 = AtomicU64::new(0);

struct EncodingCounters {
    json: AtomicU64,
    binary: AtomicU64,
}

static ENCODE_COUNTERS: EncodingCounters = EncodingCounters::new();
static DECODE_COUNTERS: EncodingCounters = EncodingCounters::new();

impl EncodingCounters {
    const fn new() -> Self {
        Self {
            json: AtomicU64::new(0),
            binary: AtomicU64::new(0),
        }
    }

    fn increment(&self, encoding: Encoding) {
        match encoding {
            Encoding::Json => self.json.fetch_add(1, Ordering::Relaxed),
            Encoding::Binary => self.binary.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Direction of chunk flow for counting.
#[derive(Clone, Copy)]
pub(crate) enum ChunkDirection {
    Sent,
    Received,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_encode(encoding: Encoding) {
        ENCODED_MESSAGES.fetch_add(1, Ordering::Relaxed);
        ENCODE_COUNTERS.increment(encoding);
    }

    #[inline]
    pub(crate) fn record_decode(encoding: Encoding) {
        DECODED_MESSAGES.fetch_add(1, Ordering::Relaxed);
        DECODE_COUNTERS.increment(encoding);
    }

    #[inline]
    pub(crate) fn record_chunk(direction: ChunkDirection, len: usize) {
        let len = u64::try_from(len).unwrap_or(u64::MAX);
        match direction {
            ChunkDirection::Sent => {
                CHUNKS_SENT.fetch_add(1, Ordering::Relaxed);
                BYTES_SENT.fetch_add(len, Ordering::Relaxed);
            }
            ChunkDirection::Received => {
                CHUNKS_RECEIVED.fetch_add(1, Ordering::Relaxed);
                BYTES_RECEIVED.fetch_add(len, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub(crate) fn record_fallback() {
        EMPTY_PAYLOAD_FALLBACKS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_passthrough() {
        PASSTHROUGHS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_decode_error() {
        DECODE_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            encoded_messages: ENCODED_MESSAGES.load(Ordering::Relaxed),
            decoded_messages: DECODED_MESSAGES.load(Ordering::Relaxed),
            json_encoded: ENCODE_COUNTERS.json.load(Ordering::Relaxed),
            binary_encoded: ENCODE_COUNTERS.binary.load(Ordering::Relaxed),
            json_decoded: DECODE_COUNTERS.json.load(Ordering::Relaxed),
            binary_decoded: DECODE_COUNTERS.binary.load(Ordering::Relaxed),
            bytes_sent: BYTES_SENT.load(Ordering::Relaxed),
            bytes_received: BYTES_RECEIVED.load(Ordering::Relaxed),
            chunks_sent: CHUNKS_SENT.load(Ordering::Relaxed),
            chunks_received: CHUNKS_RECEIVED.load(Ordering::Relaxed),
            empty_payload_fallbacks: EMPTY_PAYLOAD_FALLBACKS.load(Ordering::Relaxed),
            passthroughs: PASSTHROUGHS.load(Ordering::Relaxed),
            decode_errors: DECODE_ERRORS.load(Ordering::Relaxed),
        }
    }
}

/// Process-wide counters collected since startup.
#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    Metrics::totals()
}

/// Lightweight snapshot of codec counters.
#[allow(missing_docs)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub encoded_messages: u64,
    pub decoded_messages: u64,
    pub json_encoded: u64,
    pub binary_encoded: u64,
    pub json_decoded: u64,
    pub binary_decoded: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub chunks_sent: u64,
    pub chunks_received: u64,
    pub empty_payload_fallbacks: u64,
    pub passthroughs: u64,
    pub decode_errors: u64,
}

impl MetricsSnapshot {
    /// Average bytes per chunk sent.
    #[must_use]
    pub fn avg_sent_chunk_bytes(&self) -> Option<u64> {
        average(self.bytes_sent, self.chunks_sent)
    }

    /// Average bytes per chunk received.
    #[must_use]
    pub fn avg_received_chunk_bytes(&self) -> Option<u64> {
        average(self.bytes_received, self.chunks_received)
    }
}

fn average(total: u64, count: u64) -> Option<u64> {
    if count == 0 {
        return None;
    }
    Some(total / count)
}
