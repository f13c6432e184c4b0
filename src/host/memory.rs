//! In-memory host wrappers.
//!
//! Stand-ins for the host runtime, used by test harnesses and benchmarks. A
//! [`MemoryHost`] knows which classes exist and which fields each declares;
//! the [`MemoryWrapper`]s it allocates hold field values and one stream.

use std::collections::{BTreeMap, HashMap};

use bytes::{Bytes, BytesMut};
use serde_json::Value;

use super::{ExternalWrapper, WrapperFactory};
use crate::protocol::{ChunkSink, ChunkSource, Encoding, Error, Result};

/// Host-side container kept in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryWrapper {
    qualified_name: String,
    declared: Vec<String>,
    fields: BTreeMap<String, Value>,
    stream: Bytes,
    stream_encoding: Option<Encoding>,
    pending: Option<BytesMut>,
    reads: usize,
}

impl MemoryWrapper {
    /// Empty wrapper for `qualified_name` declaring no fields
    #[must_use]
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            ..Self::default()
        }
    }

    /// Declare storage fields; each starts as the host's empty value `""`
    #[must_use]
    pub fn with_declared<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            self.fields.entry(name.clone()).or_insert_with(|| Value::String(String::new()));
            if !self.declared.contains(&name) {
                self.declared.push(name);
            }
        }
        self
    }

    /// Declare a field and give it a value
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if !self.declared.contains(&name) {
            self.declared.push(name.clone());
        }
        self.fields.insert(name, value.into());
        self
    }

    /// Preload the stored stream
    #[must_use]
    pub fn with_stream(mut self, stream: impl Into<Bytes>) -> Self {
        self.stream = stream.into();
        self
    }

    /// Bytes of the last completed stream
    #[must_use]
    pub fn stream(&self) -> &Bytes {
        &self.stream
    }

    /// Encoding announced for the last completed stream
    #[must_use]
    pub const fn stream_encoding(&self) -> Option<Encoding> {
        self.stream_encoding
    }

    /// Number of chunk reads served so far, including the terminating one
    #[must_use]
    pub const fn reads(&self) -> usize {
        self.reads
    }
}

impl ChunkSource for MemoryWrapper {
    fn chunk_from_external(&mut self, iteration: usize, max_size: usize) -> Result<Bytes> {
        self.reads += 1;
        let len = self.stream.len();
        let start = iteration.saturating_mul(max_size).min(len);
        let end = start.saturating_add(max_size).min(len);
        Ok(self.stream.slice(start..end))
    }
}

impl ChunkSink for MemoryWrapper {
    fn begin_stream(&mut self, encoding: Encoding) -> Result<()> {
        self.stream_encoding = Some(encoding);
        self.pending = Some(BytesMut::new());
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| Error::Wrapper("write_chunk called before begin_stream".to_owned()))?;
        pending.extend_from_slice(chunk);
        Ok(())
    }

    fn finish_stream(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| Error::Wrapper("finish_stream called before begin_stream".to_owned()))?;
        self.stream = pending.freeze();
        Ok(())
    }
}

impl ExternalWrapper for MemoryWrapper {
    fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        if !self.declared.iter().any(|declared| declared == name) {
            return Err(Error::Wrapper(format!(
                "{} declares no property {name:?}",
                self.qualified_name
            )));
        }
        self.fields.insert(name.to_owned(), value);
        Ok(())
    }

    fn declared_fields(&self) -> Vec<String> {
        self.declared.clone()
    }
}

/// Class catalogue acting as the wrapper factory
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    classes: HashMap<String, Vec<String>>,
}

impl MemoryHost {
    /// Host with no classes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `qualified_name` allocatable with the given storage fields
    #[must_use]
    pub fn declare<I, S>(mut self, qualified_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes
            .insert(qualified_name.into(), fields.into_iter().map(Into::into).collect());
        self
    }
}

impl WrapperFactory for MemoryHost {
    fn allocate(&self, qualified_name: &str) -> Result<Box<dyn ExternalWrapper>> {
        let fields = self
            .classes
            .get(qualified_name)
            .ok_or_else(|| Error::Wrapper(format!("host has no class {qualified_name:?}")))?;
        Ok(Box::new(
            MemoryWrapper::new(qualified_name).with_declared(fields.iter().cloned()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::read_stream;
    use serde_json::json;

    #[test]
    fn test_stream_write_then_read() {
        let mut wrapper = MemoryWrapper::new("demo.Blob");
        wrapper.begin_stream(Encoding::Binary).unwrap();
        wrapper.write_chunk(b"hello ").unwrap();
        wrapper.write_chunk(b"world").unwrap();
        wrapper.finish_stream().unwrap();
        assert_eq!(wrapper.stream_encoding(), Some(Encoding::Binary));

        let joined = read_stream(&mut wrapper, 4).unwrap();
        assert_eq!(joined, "hello world");
        // three full or partial chunks plus the empty terminator
        assert_eq!(wrapper.reads(), 4);
    }

    #[test]
    fn test_write_requires_begin() {
        let mut wrapper = MemoryWrapper::new("demo.Blob");
        assert!(matches!(wrapper.write_chunk(b"x"), Err(Error::Wrapper(_))));
    }

    #[test]
    fn test_declared_fields_start_empty() {
        let mut wrapper = MemoryWrapper::new("demo.Row").with_declared(["a", "b"]);
        assert_eq!(wrapper.field("a"), Some(json!("")));
        assert_eq!(wrapper.declared_fields(), ["a", "b"]);

        wrapper.set_field("b", json!(3)).unwrap();
        assert_eq!(wrapper.field("b"), Some(json!(3)));
        assert!(wrapper.set_field("c", json!(1)).is_err());
    }

    #[test]
    fn test_host_allocates_declared_classes_only() {
        let host = MemoryHost::new().declare("shop.Order", ["amount"]);
        let wrapper = host.allocate("shop.Order").unwrap();
        assert_eq!(wrapper.qualified_name(), "shop.Order");
        assert_eq!(wrapper.declared_fields(), ["amount"]);

        assert!(matches!(host.allocate("shop.Missing"), Err(Error::Wrapper(_))));
    }
}
