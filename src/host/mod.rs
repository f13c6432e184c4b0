//! Host boundary
//!
//! Wrapper contracts, typed envelopes, the type registry, inbound dispatch
//! and reply glue. The
//! in-memory host stands in for the real runtime in tests and benchmarks.

mod dispatch;
mod envelope;
mod memory;
mod registry;
mod reply;
mod wrapper;

pub use dispatch::{Dispatcher, Upgraded, upgrade};
pub use envelope::{AnyEnvelope, Construct, Envelope};
pub use memory::{MemoryHost, MemoryWrapper};
pub use registry::{FrozenRegistry, RehydrateFn, Resolve, TypeDescriptor, TypeRegistry};
pub use reply::{Outbound, Outcome, Reply, STATUS_GENERAL_ERROR, STATUS_OK, Status};
pub use wrapper::{ExternalWrapper, WrapperFactory};
