//! # DriftSync Storage
//!
//! Storage backend trait and implementations for DriftSync.
//!
//! This crate provides the keyed storage abstraction both sync engines sit
//! on top of: named partitions ("namespaces") of entities addressed by
//! string id, accessed through short-lived transactions.
//!
//! ## Design Principles
//!
//! - Backends are keyed stores; entity values are opaque JSON values
//! - Transactions buffer writes and apply them atomically on `commit`
//! - Transactions see their own uncommitted writes (read-your-writes)
//! - Backends must be `Send + Sync` for shared access
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - In-memory, for tests and ephemeral stores
//!
//! ## Example
//!
//! ```rust
//! use driftsync_storage::{MemoryBackend, StorageBackend};
//! use serde_json::json;
//!
//! let backend = MemoryBackend::new(["nodes"]);
//! let mut tx = backend.begin().unwrap();
//! tx.put("nodes", "1", json!({ "text": "hello" })).unwrap();
//! tx.commit().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;

pub use backend::{StorageBackend, StorageTransaction};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
