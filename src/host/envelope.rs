//! Message envelopes
//!
//! An [`Envelope`] pairs a typed message with the host wrapper that carries
//! it across the boundary. It is created in exactly one of three shapes:
//!
//! | Shape             | Inputs                      | Wrapper                 |
//! |-------------------|-----------------------------|-------------------------|
//! | fresh with values | positional / named values   | newly allocated         |
//! | fresh empty       | nothing                     | newly allocated         |
//! | rehydrate         | wrapper **and** payload     | the one supplied        |
//!
//! Any other combination is rejected with [`Error::InvalidConstruction`].

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{ExternalWrapper, WrapperFactory};
use crate::protocol::metrics::Metrics;
use crate::protocol::{
    CodecConfig, Encoding, Error, Origin, Payload, ProductionMessage, Result, SerialStream,
    decode_mapping, read_stream, write_stream,
};

/// Inputs to [`Envelope::construct`]
#[derive(Default)]
pub struct Construct {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
    wrapper: Option<Box<dyn ExternalWrapper>>,
    payload: Option<Payload>,
    config: CodecConfig,
}

impl Construct {
    /// No inputs at all: the fresh-empty shape
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value; it binds to the next declared field
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append several positional values
    #[must_use]
    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.positional.extend(values.into_iter().map(Into::into));
        self
    }

    /// Bind a value by field name
    #[must_use]
    pub fn named(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.push((field.into(), value.into()));
        self
    }

    /// Existing host wrapper to rehydrate from
    #[must_use]
    pub fn wrapper(mut self, wrapper: Box<dyn ExternalWrapper>) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    /// Payload accompanying the wrapper
    #[must_use]
    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Codec settings for the envelope
    #[must_use]
    pub const fn config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    fn has_values(&self) -> bool {
        !self.positional.is_empty() || !self.named.is_empty()
    }
}

impl fmt::Debug for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Construct")
            .field("positional", &self.positional)
            .field("named", &self.named)
            .field("wrapper", &self.wrapper)
            .field("payload", &self.payload)
            .field("config", &self.config)
            .finish()
    }
}

/// A typed message bound to its host wrapper
pub struct Envelope<M: ProductionMessage> {
    message: M,
    wrapper: Box<dyn ExternalWrapper>,
    origin: Origin,
    config: CodecConfig,
    stream: SerialStream,
}

impl<M: ProductionMessage> Envelope<M> {
    /// Build an envelope from whichever inputs are present.
    ///
    /// `factory` is only consulted for the two fresh shapes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConstruction`] for any combination outside the three shapes
    /// - [`Error::TooManyArguments`] / [`Error::UnexpectedArgument`] for bad values
    /// - [`Error::Deserialization`] if the payload cannot be decoded
    pub fn construct(args: Construct, factory: &dyn WrapperFactory) -> Result<Self> {
        let invalid = |reason| Error::InvalidConstruction {
            type_name: M::qualified_name(),
            reason,
        };

        let has_values = args.has_values();
        let Construct {
            positional,
            named,
            wrapper,
            payload,
            config,
        } = args;
        config.validate()?;

        match (wrapper, payload) {
            (None, None) => {
                let message = bind_values::<M>(positional, named)?;
                Self::fresh_with(message, factory, config)
            }
            (Some(_), Some(_)) if has_values => Err(invalid(
                "field values cannot be combined with a wrapper and payload",
            )),
            (Some(wrapper), Some(payload)) => Self::rehydrate_with(wrapper, payload, config),
            (Some(_), None) => Err(invalid("a wrapper requires a payload")),
            (None, Some(_)) => Err(invalid("a payload requires a wrapper")),
        }
    }

    /// Fresh envelope around an already-built message
    pub fn fresh(message: M, factory: &dyn WrapperFactory) -> Result<Self> {
        Self::fresh_with(message, factory, CodecConfig::default())
    }

    /// Fresh envelope with explicit codec settings
    pub fn fresh_with(message: M, factory: &dyn WrapperFactory, config: CodecConfig) -> Result<Self> {
        M::schema()?;
        config.validate()?;
        let wrapper = factory.allocate(M::qualified_name())?;
        debug!(message = M::qualified_name(), "allocated fresh wrapper");
        Ok(Self {
            message,
            wrapper,
            origin: Origin::Fresh,
            config,
            stream: SerialStream::new(M::ENCODING),
        })
    }

    /// Rebuild from a wrapper and its payload with default settings
    pub fn rehydrate(wrapper: Box<dyn ExternalWrapper>, payload: impl Into<Payload>) -> Result<Self> {
        Self::rehydrate_with(wrapper, payload.into(), CodecConfig::default())
    }

    /// Rebuild from a wrapper and its payload.
    ///
    /// An empty encoded payload means the wrapper was created host-side and
    /// never carried a serialized stream: column fields are copied from the
    /// wrapper's own values and every other field keeps its default.
    pub fn rehydrate_with(
        wrapper: Box<dyn ExternalWrapper>,
        payload: Payload,
        config: CodecConfig,
    ) -> Result<Self> {
        config.validate()?;
        let message = match payload {
            Payload::Mapping(map) => decode_mapping::<M>(map)?,
            Payload::Encoded(bytes) if bytes.is_empty() => from_columns::<M>(wrapper.as_ref())?,
            Payload::Encoded(bytes) => M::ENCODING.decode::<M>(&bytes)?,
        };
        Ok(Self {
            message,
            wrapper,
            origin: Origin::Rehydrated,
            config,
            stream: SerialStream::new(M::ENCODING),
        })
    }

    /// Read the wrapper's stream to the end and rehydrate from it
    pub fn receive(mut wrapper: Box<dyn ExternalWrapper>, config: CodecConfig) -> Result<Self> {
        config.validate()?;
        let payload = read_stream(wrapper.as_mut(), config.chunk_size)?;
        Self::rehydrate_with(wrapper, Payload::Encoded(payload), config)
    }

    /// Typed message
    #[must_use]
    pub const fn message(&self) -> &M {
        &self.message
    }

    /// Mutable typed message
    pub fn message_mut(&mut self) -> &mut M {
        &mut self.message
    }

    /// Read one field by name
    pub fn field(&self, name: &str) -> Result<Value> {
        self.message.field(name)
    }

    /// Write one field by name
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        self.message.set_field(name, value)
    }

    /// `(name, value)` pairs in schema order
    pub fn fields(&self) -> Result<Vec<(&'static str, Value)>> {
        self.message.fields()
    }

    /// How this envelope was created
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Wire encoding of `M`
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        M::ENCODING
    }

    /// Codec settings
    #[must_use]
    pub const fn config(&self) -> CodecConfig {
        self.config
    }

    /// The bound host wrapper
    #[must_use]
    pub fn wrapper(&self) -> &dyn ExternalWrapper {
        self.wrapper.as_ref()
    }

    /// The bound host wrapper, mutably
    pub fn wrapper_mut(&mut self) -> &mut dyn ExternalWrapper {
        self.wrapper.as_mut()
    }

    /// Whether a serialized copy is currently cached
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.stream.is_cached()
    }

    /// Bytes `[start, end)` of the serialized message.
    ///
    /// Iteration 0 serializes and caches; the cache is released once a slice
    /// reaches the end of the blob. JSON slices may come back shorter than
    /// asked so as not to split a character; the next slice starts at
    /// `start + chunk.len()`.
    pub fn to_chunks(&mut self, iteration: usize, start: usize, end: usize) -> Result<Bytes> {
        let message = &self.message;
        self.stream
            .chunk(iteration, start, end, || M::ENCODING.encode(message))
    }

    /// Stream the message into the wrapper, then copy every field the host
    /// declares back onto it.
    ///
    /// The serialized copy never outlives this call.
    #[instrument(level = "debug", skip(self), fields(message = M::qualified_name()))]
    pub fn push(&mut self) -> Result<()> {
        let encoding = M::ENCODING;
        let message = &self.message;
        let stream = &mut self.stream;
        let written = write_stream(
            self.wrapper.as_mut(),
            encoding,
            self.config.chunk_size,
            |iteration, start, end| stream.chunk(iteration, start, end, || encoding.encode(message)),
        );
        self.stream.clear();
        let chunks = written?;

        self.flush_fields()?;
        debug!(chunks, "pushed message into wrapper");
        Ok(())
    }

    fn flush_fields(&mut self) -> Result<()> {
        let schema = M::schema()?;
        for name in self.wrapper.declared_fields() {
            if schema.contains(&name) {
                let value = self.message.field(&name)?;
                self.wrapper.set_field(&name, value)?;
            }
        }
        Ok(())
    }

    /// Push, then hand the wrapper back for sending
    pub fn into_outbound(mut self) -> Result<Box<dyn ExternalWrapper>> {
        self.push()?;
        Ok(self.wrapper)
    }

    /// Split into the message and the wrapper without pushing
    #[must_use]
    pub fn into_parts(self) -> (M, Box<dyn ExternalWrapper>) {
        (self.message, self.wrapper)
    }
}

fn bind_values<M: ProductionMessage>(positional: Vec<Value>, named: Vec<(String, Value)>) -> Result<M> {
    let schema = M::schema()?;
    let fields = schema.all_fields();
    if positional.len() > fields.len() {
        return Err(Error::TooManyArguments {
            type_name: M::qualified_name(),
            max: fields.len(),
            got: positional.len(),
        });
    }
    if let Some((name, _)) = named.iter().find(|(name, _)| !schema.contains(name)) {
        return Err(Error::UnexpectedArgument {
            type_name: M::qualified_name(),
            field: name.clone(),
        });
    }

    let mut message = M::default();
    for (name, value) in fields.iter().zip(positional) {
        message.set_field(name, value)?;
    }
    for (name, value) in named {
        message.set_field(&name, value)?;
    }
    Ok(message)
}

fn from_columns<M: ProductionMessage>(wrapper: &dyn ExternalWrapper) -> Result<M> {
    let schema = M::schema()?;
    let mut message = M::default();
    for name in schema.column_fields() {
        match wrapper.field(name) {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) if text.is_empty() => {}
            Some(value) => message.set_field(name, value)?,
        }
    }
    Metrics::record_fallback();
    debug!(
        message = M::qualified_name(),
        columns = schema.column_fields().len(),
        "empty payload; populated columns from wrapper"
    );
    Ok(message)
}

impl<M: ProductionMessage> fmt::Display for Envelope<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::protocol::display_fields(&self.message, f)
    }
}

impl<M: ProductionMessage> fmt::Debug for Envelope<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("message", &self.message)
            .field("wrapper", &self.wrapper)
            .field("origin", &self.origin)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Type-erased envelope handed out by dispatch
pub trait AnyEnvelope: Send + fmt::Display + fmt::Debug {
    /// `package.ClassName` of the message
    fn qualified_name(&self) -> &'static str;

    /// Wire encoding of the message
    fn encoding(&self) -> Encoding;

    /// How the envelope was created
    fn origin(&self) -> Origin;

    /// `(name, value)` pairs in schema order
    fn fields(&self) -> Result<Vec<(&'static str, Value)>>;

    /// The bound host wrapper
    fn wrapper(&self) -> &dyn ExternalWrapper;

    /// Stream the message into its wrapper
    fn push(&mut self) -> Result<()>;

    /// Push, then hand the wrapper back
    fn into_outbound(self: Box<Self>) -> Result<Box<dyn ExternalWrapper>>;

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;

    #[doc(hidden)]
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<M: ProductionMessage> AnyEnvelope for Envelope<M> {
    fn qualified_name(&self) -> &'static str {
        M::qualified_name()
    }

    fn encoding(&self) -> Encoding {
        M::ENCODING
    }

    fn origin(&self) -> Origin {
        self.origin
    }

    fn fields(&self) -> Result<Vec<(&'static str, Value)>> {
        self.message.fields()
    }

    fn wrapper(&self) -> &dyn ExternalWrapper {
        self.wrapper.as_ref()
    }

    fn push(&mut self) -> Result<()> {
        Envelope::push(self)
    }

    fn into_outbound(self: Box<Self>) -> Result<Box<dyn ExternalWrapper>> {
        Envelope::into_outbound(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn AnyEnvelope {
    /// Whether the envelope carries an `M`
    #[must_use]
    pub fn is<M: ProductionMessage>(&self) -> bool {
        self.as_any().is::<Envelope<M>>()
    }

    /// Borrow as a typed envelope
    #[must_use]
    pub fn downcast_ref<M: ProductionMessage>(&self) -> Option<&Envelope<M>> {
        self.as_any().downcast_ref()
    }

    /// Convert into a typed envelope.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if the envelope carries another type.
    pub fn downcast<M: ProductionMessage>(self: Box<Self>) -> Result<Envelope<M>> {
        let found = self.qualified_name();
        self.into_any()
            .downcast::<Envelope<M>>()
            .map(|envelope| *envelope)
            .map_err(|_| Error::TypeMismatch {
                expected: M::qualified_name(),
                found: found.to_owned(),
            })
    }
}
