//! Encoding tags, payload inputs and envelope origin

use std::fmt;

use bytes::Bytes;
use serde_json::{Map, Value};

/// Wire encoding strategy of a message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Structured-text: one JSON document keyed by field name
    Json,
    /// Opaque-binary: bincode image of the whole message plus checksum
    Binary,
}

impl Encoding {
    /// Whether the host should store the stream as character data
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Short lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload accompanying a wrapper during rehydration
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Field values that were already decoded by the caller
    Mapping(Map<String, Value>),
    /// Encoded document; empty bytes mean nothing was ever serialized
    Encoded(Bytes),
}

impl Payload {
    /// The empty marker used when a wrapper was created host-side
    #[must_use]
    pub const fn empty() -> Self {
        Self::Encoded(Bytes::new())
    }

    /// Whether this is the empty marker
    #[must_use]
    pub fn is_empty_marker(&self) -> bool {
        matches!(self, Self::Encoded(bytes) if bytes.is_empty())
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self::Mapping(map)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Encoded(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Encoded(Bytes::from(bytes))
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Encoded(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// How an envelope came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Built from values (or defaults) with a newly allocated wrapper
    Fresh,
    /// Rebuilt from an existing wrapper and its payload
    Rehydrated,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => f.write_str("fresh"),
            Self::Rehydrated => f.write_str("rehydrated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_names() {
        assert_eq!(Encoding::Json.to_string(), "json");
        assert_eq!(Encoding::Binary.to_string(), "binary");
        assert!(Encoding::Json.is_text());
        assert!(!Encoding::Binary.is_text());
    }

    #[test]
    fn test_empty_marker() {
        assert!(Payload::empty().is_empty_marker());
        assert!(Payload::from("").is_empty_marker());
        assert!(!Payload::from("{}").is_empty_marker());
        assert!(!Payload::Mapping(Map::new()).is_empty_marker());
    }
}
