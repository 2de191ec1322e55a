//! # DriftSync Protocol
//!
//! Operation log model and sync wire messages for DriftSync.
//!
//! This crate provides:
//! - [`Operation`] - the read/write vocabulary both engines share
//! - [`Mutation`] - an ordered, atomically-applied batch of operations
//! - [`DependencyToken`] and [`operations_to_dependencies`] - the keys
//!   live queries are invalidated by
//! - [`reverse_operations`] - exact mechanical undo of a write sequence
//! - Push/pull messages with CBOR codecs
//!
//! This is a pure data-model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dependency;
mod dump;
mod error;
mod messages;
mod mutation;
mod operation;

pub use dependency::{operations_to_dependencies, DependencyToken};
pub use dump::StoreDump;
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{PullRequest, PullResponse, PushRequest, PushResponse};
pub use mutation::Mutation;
pub use operation::{reverse_operations, Operation};
