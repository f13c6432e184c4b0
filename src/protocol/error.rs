//! prodwire error types

use thiserror::Error;

use super::Encoding;

/// Failure to derive a field schema from a message type's declaration.
///
/// This always points at a defect in how the type was declared, so it is
/// reported once and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot extract field schema for {type_name}: {reason}")]
pub struct SchemaError {
    /// Type whose declaration was rejected
    pub type_name: String,
    /// What was wrong with the declaration
    pub reason: String,
}

impl SchemaError {
    pub(crate) fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// prodwire errors
#[derive(Error, Debug)]
pub enum Error {
    /// Field schema could not be extracted
    #[error(transparent)]
    SchemaExtraction(#[from] SchemaError),

    /// Qualified name is not registered
    #[error("no message type registered as {name:?}")]
    Lookup {
        /// Unresolved qualified name
        name: String,
    },

    /// Envelope constructed from an invalid combination of inputs
    #[error("invalid construction of {type_name}: {reason}")]
    InvalidConstruction {
        /// Message type being constructed
        type_name: &'static str,
        /// Which inputs conflicted
        reason: &'static str,
    },

    /// More positional values than declared fields
    #[error("{type_name}() takes at most {max} positional values (got {got})")]
    TooManyArguments {
        /// Message type being constructed
        type_name: &'static str,
        /// Number of declared fields
        max: usize,
        /// Number of values supplied
        got: usize,
    },

    /// Named value does not match any declared field
    #[error("{type_name}() got unexpected field {field:?}")]
    UnexpectedArgument {
        /// Message type being constructed
        type_name: &'static str,
        /// Offending name
        field: String,
    },

    /// Field name unknown to the message type
    #[error("{type_name} has no field {field:?}")]
    UnknownField {
        /// Message type
        type_name: &'static str,
        /// Requested field
        field: String,
    },

    /// Value could not be converted to or from the field's type
    #[error("field {type_name}.{field}: {source}")]
    FieldType {
        /// Message type
        type_name: &'static str,
        /// Field being read or written
        field: &'static str,
        /// Conversion failure
        #[source]
        source: serde_json::Error,
    },

    /// Payload is corrupt, truncated or not a valid document
    #[error("cannot decode {type_name} from {encoding} payload: {reason}")]
    Deserialization {
        /// Message type being decoded
        type_name: &'static str,
        /// Strategy used for decoding
        encoding: Encoding,
        /// Decoder failure
        reason: String,
    },

    /// Message could not be encoded
    #[error("cannot encode {type_name} as {encoding}: {reason}")]
    Serialization {
        /// Message type being encoded
        type_name: &'static str,
        /// Strategy used for encoding
        encoding: Encoding,
        /// Encoder failure
        reason: String,
    },

    /// Registered type does not match the requested Rust type
    #[error("message type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Qualified name the caller asked for
        expected: &'static str,
        /// Qualified name actually resolved
        found: String,
    },

    /// Chunk size outside the supported range
    #[error("invalid chunk size: {size} bytes (must be 1..={max})")]
    InvalidChunkSize {
        /// Requested size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Configuration value could not be used
    #[error("invalid configuration {key}: {reason}")]
    Config {
        /// Setting name
        key: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Failure reported by the host-side wrapper
    #[error("external wrapper error: {0}")]
    Wrapper(String),
}

impl Error {
    /// Whether this error means an inbound type was never registered here.
    ///
    /// Routing code uses this to log and keep going instead of failing the
    /// whole process when peer deployments diverge.
    #[must_use]
    pub const fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }

    /// Whether the payload itself was unusable.
    #[must_use]
    pub const fn is_deserialization(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
