//! Handler results going back to the host

use std::fmt;

use super::{AnyEnvelope, Envelope, ExternalWrapper};
use crate::protocol::{ProductionMessage, Result};

/// Code the host uses for a successful status
pub const STATUS_OK: u32 = 1;

/// Code the host uses for a general error carrying free text
pub const STATUS_GENERAL_ERROR: u32 = 5001;

/// Host status value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: u32,
    text: Option<String>,
}

impl Status {
    /// Success
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            code: STATUS_OK,
            text: None,
        }
    }

    /// General error with a message
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            code: STATUS_GENERAL_ERROR,
            text: Some(text.into()),
        }
    }

    /// Status with an arbitrary host code
    #[must_use]
    pub fn with_code(code: u32, text: Option<String>) -> Self {
        Self { code, text }
    }

    /// Whether this is the success status
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code == STATUS_OK
    }

    /// Host status code
    #[must_use]
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// Error text, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "ERROR #{}: {text}", self.code),
            None if self.is_ok() => f.write_str("OK"),
            None => write!(f, "ERROR #{}", self.code),
        }
    }
}

impl From<crate::Error> for Status {
    fn from(err: crate::Error) -> Self {
        Self::error(err.to_string())
    }
}

/// Object returned alongside a status
#[derive(Debug, Default)]
pub enum Outbound {
    /// The host's empty value
    #[default]
    Empty,
    /// A typed envelope; pushed into its wrapper before sending
    Envelope(Box<dyn AnyEnvelope>),
    /// A host object sent as is
    Raw(Box<dyn ExternalWrapper>),
}

impl Outbound {
    /// Wrapper to hand to the host, pushing envelopes first
    pub fn into_wrapper(self) -> Result<Option<Box<dyn ExternalWrapper>>> {
        match self {
            Self::Empty => Ok(None),
            Self::Envelope(envelope) => envelope.into_outbound().map(Some),
            Self::Raw(raw) => Ok(Some(raw)),
        }
    }
}

impl<M: ProductionMessage> From<Envelope<M>> for Outbound {
    fn from(envelope: Envelope<M>) -> Self {
        Self::Envelope(Box::new(envelope))
    }
}

impl From<Box<dyn AnyEnvelope>> for Outbound {
    fn from(envelope: Box<dyn AnyEnvelope>) -> Self {
        Self::Envelope(envelope)
    }
}

impl From<Box<dyn ExternalWrapper>> for Outbound {
    fn from(raw: Box<dyn ExternalWrapper>) -> Self {
        Self::Raw(raw)
    }
}

/// What a handler returns: a bare status, or a status and a response
#[derive(Debug)]
pub enum Outcome {
    /// No response object
    Status(Status),
    /// Status plus a response object
    Respond(Status, Outbound),
}

impl From<Status> for Outcome {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

impl<O: Into<Outbound>> From<(Status, O)> for Outcome {
    fn from((status, response): (Status, O)) -> Self {
        Self::Respond(status, response.into())
    }
}

/// Normalized handler result handed back to the host
#[derive(Debug)]
pub struct Reply {
    /// Status value
    pub status: Status,
    /// Response object, already pushed if it was an envelope
    pub response: Option<Box<dyn ExternalWrapper>>,
    /// Whether the handler produced a response slot at all
    pub response_available: bool,
}

impl Reply {
    /// Normalize a handler outcome.
    ///
    /// # Errors
    ///
    /// Fails if an envelope response cannot be pushed into its wrapper.
    pub fn from_outcome(outcome: impl Into<Outcome>) -> Result<Self> {
        match outcome.into() {
            Outcome::Status(status) => Ok(Self {
                status,
                response: None,
                response_available: false,
            }),
            Outcome::Respond(status, response) => Ok(Self {
                status,
                response: response.into_wrapper()?,
                response_available: true,
            }),
        }
    }
}
