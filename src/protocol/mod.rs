//! prodwire protocol core
//!
//! This module provides field schemas, the chunked stream codec and the
//! message trait.

mod codec;
mod config;
mod error;
mod finite;
mod message;
pub(crate) mod metrics;
mod schema;
mod types;

pub use codec::{ChunkSink, ChunkSource, SerialStream, decode_mapping, read_stream, write_stream};
pub use config::{CHUNK_SIZE_ENV, CodecConfig};
pub use error::{Error, Result, SchemaError};
pub use message::{ProductionMessage, display_fields};
pub use metrics::{MetricsSnapshot, snapshot as metrics_snapshot};
pub use schema::{FieldDescriptor, FieldSchema, field_from_value, field_to_value, package_from_module};
pub use types::{Encoding, Origin, Payload};

/// Default chunk size: 3 MiB, below the host's in-memory string limit
pub const DEFAULT_CHUNK_SIZE: usize = 3 * 1024 * 1024;

/// Largest accepted chunk size
pub const MAX_CHUNK_SIZE: usize = DEFAULT_CHUNK_SIZE;

/// Binary checksum trailer size in bytes
pub const CHECKSUM_SIZE: usize = 8;
