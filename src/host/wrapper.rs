//! Host-side wrapper contracts
//!
//! The host represents every message at the process boundary with a wrapper
//! object it owns. The envelope only borrows it for one round trip, through
//! the capabilities below.

use std::fmt;

use serde_json::Value;

use crate::protocol::{ChunkSink, ChunkSource, Result};

/// Host container for one message
pub trait ExternalWrapper: ChunkSource + ChunkSink + Send {
    /// `package.ClassName` of the host-side class
    fn qualified_name(&self) -> &str;

    /// Read one of the wrapper's own declared fields
    fn field(&self, name: &str) -> Option<Value>;

    /// Write one of the wrapper's own declared fields
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// Field names the host's storage layer declares for this class
    fn declared_fields(&self) -> Vec<String>;
}

impl fmt::Debug for dyn ExternalWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalWrapper")
            .field("qualified_name", &self.qualified_name())
            .finish_non_exhaustive()
    }
}

/// Backing constructor for fresh, empty wrappers
pub trait WrapperFactory {
    /// Allocate an empty wrapper of the host class `qualified_name`
    fn allocate(&self, qualified_name: &str) -> Result<Box<dyn ExternalWrapper>>;
}

impl<F> WrapperFactory for F
where
    F: Fn(&str) -> Result<Box<dyn ExternalWrapper>>,
{
    fn allocate(&self, qualified_name: &str) -> Result<Box<dyn ExternalWrapper>> {
        self(qualified_name)
    }
}
