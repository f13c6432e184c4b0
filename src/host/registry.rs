//! Type registry keyed by qualified name
//!
//! The registry is filled during startup, one entry per message type, and
//! read on every inbound message afterwards. Writes go through an `RwLock`;
//! once startup is over a [`FrozenRegistry`] snapshot can serve lookups with
//! no locking at all.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use super::{AnyEnvelope, Envelope, ExternalWrapper};
use crate::protocol::{CodecConfig, Encoding, Error, FieldSchema, Payload, ProductionMessage, Result};

/// Type-erased rehydrating constructor stored in a [`TypeDescriptor`]
pub type RehydrateFn =
    fn(Box<dyn ExternalWrapper>, Payload, CodecConfig) -> Result<Box<dyn AnyEnvelope>>;

/// Everything dispatch needs to know about one registered message type
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    qualified_name: &'static str,
    package: &'static str,
    name: &'static str,
    encoding: Encoding,
    schema: &'static FieldSchema,
    type_id: TypeId,
    rehydrate: RehydrateFn,
}

fn rehydrate_erased<M: ProductionMessage>(
    wrapper: Box<dyn ExternalWrapper>,
    payload: Payload,
    config: CodecConfig,
) -> Result<Box<dyn AnyEnvelope>> {
    let envelope = Envelope::<M>::rehydrate_with(wrapper, payload, config)?;
    Ok(Box::new(envelope))
}

impl TypeDescriptor {
    /// Describe a message type.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::SchemaExtraction`] if the type's field declaration
    /// is unusable.
    pub fn of<M: ProductionMessage>() -> Result<Self> {
        Ok(Self {
            qualified_name: M::qualified_name(),
            package: M::package(),
            name: M::NAME,
            encoding: M::ENCODING,
            schema: M::schema()?,
            type_id: TypeId::of::<M>(),
            rehydrate: rehydrate_erased::<M>,
        })
    }

    /// `package.ClassName`
    #[must_use]
    pub const fn qualified_name(&self) -> &'static str {
        self.qualified_name
    }

    /// Package part of the qualified name
    #[must_use]
    pub const fn package(&self) -> &'static str {
        self.package
    }

    /// Class part of the qualified name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Wire encoding of the type
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Cached field schema
    #[must_use]
    pub const fn schema(&self) -> &'static FieldSchema {
        self.schema
    }

    /// Rust type behind the entry
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Whether the entry was registered for `M`
    #[must_use]
    pub fn is<M: ProductionMessage>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Rebuild an envelope of this type around `wrapper`.
    pub fn rehydrate(
        &self,
        wrapper: Box<dyn ExternalWrapper>,
        payload: Payload,
        config: CodecConfig,
    ) -> Result<Box<dyn AnyEnvelope>> {
        (self.rehydrate)(wrapper, payload, config)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualified_name == other.qualified_name
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("qualified_name", &self.qualified_name)
            .field("encoding", &self.encoding)
            .field("fields", &self.schema.all_fields())
            .field("columns", &self.schema.column_fields())
            .finish_non_exhaustive()
    }
}

/// Anything that maps qualified names to descriptors
pub trait Resolve {
    /// Find the descriptor registered under `name`
    fn resolve(&self, name: &str) -> Option<TypeDescriptor>;

    /// Like [`Resolve::resolve`], but an unknown name is an [`Error::Lookup`]
    fn lookup(&self, name: &str) -> Result<TypeDescriptor> {
        self.resolve(name).ok_or_else(|| Error::Lookup {
            name: name.to_owned(),
        })
    }
}

impl<T: Resolve + ?Sized> Resolve for &T {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        (**self).resolve(name)
    }
}

impl<T: Resolve + ?Sized> Resolve for Arc<T> {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        (**self).resolve(name)
    }
}

/// Process-wide, lock-guarded registration table
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<&'static str, TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Insert a descriptor, replacing any entry with the same qualified name.
    ///
    /// Returns the replaced entry.
    pub fn register(&self, descriptor: TypeDescriptor) -> Option<TypeDescriptor> {
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(descriptor.qualified_name, descriptor);

        match previous {
            Some(old) if old != descriptor => warn!(
                name = descriptor.qualified_name,
                "message type registered twice; replacing previous definition"
            ),
            Some(_) => debug!(name = descriptor.qualified_name, "message type re-registered"),
            None => debug!(
                name = descriptor.qualified_name,
                encoding = %descriptor.encoding,
                "registered message type"
            ),
        }
        previous
    }

    /// Describe and register `M`.
    pub fn register_message<M: ProductionMessage>(&self) -> Result<Option<TypeDescriptor>> {
        Ok(self.register(TypeDescriptor::of::<M>()?))
    }

    /// Descriptor for `name`, if registered
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeDescriptor> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// Descriptor for `name`, or [`Error::Lookup`]
    pub fn lookup(&self, name: &str) -> Result<TypeDescriptor> {
        Resolve::lookup(self, name)
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered qualified names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        names.sort_unstable();
        names
    }

    /// Immutable snapshot for steady-state lookups
    #[must_use]
    pub fn freeze(&self) -> FrozenRegistry {
        FrozenRegistry {
            entries: self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

impl Resolve for TypeRegistry {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        self.get(name)
    }
}

/// Read-only registry snapshot
#[derive(Debug, Clone, Default)]
pub struct FrozenRegistry {
    entries: HashMap<&'static str, TypeDescriptor>,
}

impl FrozenRegistry {
    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Resolve for FrozenRegistry {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        self.entries.get(name).copied()
    }
}

/// Register a list of message types, stopping at the first failure.
///
/// ```rust
/// use prodwire::{TypeRegistry, message, register_messages};
///
/// message! {
///     pub struct Ping in "health" as Json {
///         pub seq: u64,
///     }
/// }
///
/// let registry = TypeRegistry::new();
/// register_messages!(registry; Ping)?;
/// assert!(registry.contains("health.Ping"));
/// # Ok::<(), prodwire::Error>(())
/// ```
#[macro_export]
macro_rules! register_messages {
    ($registry:expr; $($message:ty),+ $(,)?) => {{
        let registry: &$crate::TypeRegistry = &$registry;
        let registered: $crate::Result<()> = 'register: {
            $(
                if let ::core::result::Result::Err(err) = registry.register_message::<$message>() {
                    break 'register ::core::result::Result::Err(err);
                }
            )+
            ::core::result::Result::Ok(())
        };
        registered
    }};
}
