//! Inbound dispatch
//!
//! Every object arriving from the host goes through [`Dispatcher::upgrade`]:
//! registered types come back as typed envelopes, everything else is handed
//! back untouched.

use std::fmt;

use tracing::{debug, instrument};

use super::{AnyEnvelope, Envelope, ExternalWrapper, Resolve, TypeRegistry};
use crate::protocol::metrics::Metrics;
use crate::protocol::{CodecConfig, Error, Payload, ProductionMessage, Result, read_stream};

/// Result of upgrading a raw host object
pub enum Upgraded {
    /// A registered type, already rehydrated
    Resolved(Box<dyn AnyEnvelope>),
    /// Not a registered type; the object is returned as received
    Passthrough(Box<dyn ExternalWrapper>),
}

impl Upgraded {
    /// Whether the object was a registered type
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Whether the object was passed through
    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }

    /// Qualified name of the underlying object
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        match self {
            Self::Resolved(envelope) => envelope.qualified_name(),
            Self::Passthrough(raw) => raw.qualified_name(),
        }
    }

    /// The envelope, if resolved
    #[must_use]
    pub fn into_resolved(self) -> Option<Box<dyn AnyEnvelope>> {
        match self {
            Self::Resolved(envelope) => Some(envelope),
            Self::Passthrough(_) => None,
        }
    }

    /// The raw object, if passed through
    #[must_use]
    pub fn into_passthrough(self) -> Option<Box<dyn ExternalWrapper>> {
        match self {
            Self::Resolved(_) => None,
            Self::Passthrough(raw) => Some(raw),
        }
    }
}

impl fmt::Debug for Upgraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(envelope) => f.debug_tuple("Resolved").field(envelope).finish(),
            Self::Passthrough(raw) => f.debug_tuple("Passthrough").field(raw).finish(),
        }
    }
}

/// Upgrades raw host objects against a registry
#[derive(Debug, Clone)]
pub struct Dispatcher<R> {
    registry: R,
    config: CodecConfig,
}

impl<R: Resolve> Dispatcher<R> {
    /// Dispatcher with default codec settings
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            config: CodecConfig::default(),
        }
    }

    /// Override the codec settings
    #[must_use]
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry consulted on every upgrade
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Codec settings used when reading streams
    pub const fn config(&self) -> CodecConfig {
        self.config
    }

    /// Turn a raw host object into a typed envelope when its type is
    /// registered.
    ///
    /// Resolution reads the object's whole stream and rehydrates at once.
    ///
    /// # Errors
    ///
    /// Stream and decoding failures of a registered type are returned as is;
    /// an unregistered type is never an error.
    #[instrument(level = "debug", skip_all, fields(name = raw.qualified_name()))]
    pub fn upgrade(&self, mut raw: Box<dyn ExternalWrapper>) -> Result<Upgraded> {
        let Some(descriptor) = self.registry.resolve(raw.qualified_name()) else {
            Metrics::record_passthrough();
            debug!("unregistered type; passing through");
            return Ok(Upgraded::Passthrough(raw));
        };

        self.config.validate()?;
        let payload = read_stream(raw.as_mut(), self.config.chunk_size)?;
        let envelope = descriptor.rehydrate(raw, Payload::Encoded(payload), self.config)?;
        debug!(encoding = %descriptor.encoding(), "rehydrated");
        Ok(Upgraded::Resolved(envelope))
    }

    /// Upgrade into a known type.
    ///
    /// # Errors
    ///
    /// - [`Error::Lookup`] if the object's type is not registered
    /// - [`Error::TypeMismatch`] if it is registered under another Rust type
    pub fn upgrade_as<M: ProductionMessage>(&self, raw: Box<dyn ExternalWrapper>) -> Result<Envelope<M>> {
        let descriptor = self.registry.lookup(raw.qualified_name())?;
        if !descriptor.is::<M>() {
            return Err(Error::TypeMismatch {
                expected: M::qualified_name(),
                found: descriptor.qualified_name().to_owned(),
            });
        }
        Envelope::receive(raw, self.config)
    }
}

impl Dispatcher<&'static TypeRegistry> {
    /// Dispatcher over the process-wide registry, with codec settings read
    /// from the environment.
    pub fn global() -> Result<Self> {
        Ok(Self::new(TypeRegistry::global()).with_config(CodecConfig::from_env()?))
    }
}

/// Upgrade against the process-wide registry.
pub fn upgrade(raw: Box<dyn ExternalWrapper>) -> Result<Upgraded> {
    Dispatcher::global()?.upgrade(raw)
}
