//! # DriftSync Client
//!
//! The local-first client store for DriftSync.
//!
//! This crate provides:
//! - [`ClientStore`] - immediate local reads and writes over a pluggable
//!   storage backend, with an ordered log of unconfirmed mutations
//! - [`TrackedTransaction`] - operation recording for mutation logging
//!   and dependency tracking
//! - [`SubscriptionId`] / [`ClientStore::subscribe`] - reactive callbacks
//!   that rerun when data they read changes
//! - [`SyncTransport`] / [`HttpTransport`] - push/pull plumbing to a
//!   reconciliation server
//!
//! ## Key Invariants
//!
//! - Writes apply locally before any network traffic
//! - Mutation ids are dense per client, starting at 1
//! - A pull rebases in a single storage commit: undo the log, apply the
//!   server patch, replay unconfirmed mutations
//! - Subscriptions fire on write/read dependency overlap, for local
//!   writes and pulled patches alike

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod log;
mod store;
mod subscription;
mod tracked;
mod transport;

pub use config::{RetryConfig, SyncConfig};
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, HttpTransport, LoopbackClient, LoopbackServer};
pub use store::ClientStore;
pub use subscription::SubscriptionId;
pub use tracked::TrackedTransaction;
pub use transport::{MockTransport, SyncTransport};
