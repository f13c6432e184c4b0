//! prodwire - typed production messages over a host object boundary
//!
//! A host runtime hands the process opaque wrapper objects. This library turns
//! them into typed Rust messages and back: it extracts field schemas from
//! message declarations, registers them by qualified name, and streams the
//! serialized form through the wrapper in bounded chunks.
//!
//! # Quick Start
//!
//! ```rust
//! use prodwire::host::{Dispatcher, Envelope, MemoryHost};
//! use prodwire::{TypeRegistry, message, register_messages};
//!
//! message! {
//!     pub struct Order in "shop" as Binary {
//!         pub id: u8,
//!         #[column]
//!         pub amount: u8,
//!     }
//! }
//!
//! let registry = TypeRegistry::new();
//! register_messages!(registry; Order)?;
//!
//! // outbound: allocate a wrapper, stream the message into it
//! let host = MemoryHost::new().declare("shop.Order", ["amount"]);
//! let envelope = Envelope::fresh(Order { id: 7, amount: 100 }, &host)?;
//! let wrapper = envelope.into_outbound()?;
//!
//! // inbound: resolve the wrapper's class and rehydrate
//! let order = Dispatcher::new(&registry).upgrade_as::<Order>(wrapper)?;
//! assert_eq!(order.message(), &Order { id: 7, amount: 100 });
//! # Ok::<(), prodwire::Error>(())
//! ```
//!
//! # Features
//!
//! - **Declarative messages** - [`message!`] generates the struct, its schema and defaults
//! - **Two encodings** - JSON text, or bincode with an `XXHash3` checksum trailer
//! - **Chunked streaming** - serialize once, hand out bounded slices
//! - **Explicit dispatch** - unknown classes pass through untouched

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod host;
pub mod protocol;

pub use host::TypeRegistry;
pub use protocol::{
    CodecConfig, Encoding, Error, FieldDescriptor, FieldSchema, Payload, ProductionMessage, Result,
    SchemaError,
};

#[doc(hidden)]
pub mod __private {
    pub use crate::protocol::{display_fields, field_from_value, field_to_value, package_from_module};
    pub use serde_json::Value;
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
