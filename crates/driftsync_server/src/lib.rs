//! # DriftSync Server
//!
//! The authoritative reconciliation engine for DriftSync.
//!
//! This crate provides:
//! - [`ServerStore`] - idempotent mutation apply with per-object version
//!   stamping, and full-scan patch generation
//! - [`SyncHandler`] - CBOR request decode / response encode for serving
//!   the push and pull endpoints
//!
//! ## Key Invariants
//!
//! - The server is authoritative; conflicts resolve by arrival order
//! - The global version advances by exactly one per applied mutation
//! - Replaying an already-applied mutation has no effect
//! - A mutation id that skips ahead is refused, never applied

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handler;
mod store;

pub use error::{ServerError, ServerResult};
pub use handler::SyncHandler;
pub use store::ServerStore;
