//! # Raw Storage Boundary
//!
//! This is THE contract between the composition engine and whatever graph
//! storage layer owns the underlying nodes and relationships. The engine
//! never persists anything itself: it reads and writes raw fields through a
//! handle the storage/transaction layer hands it.
//!
//! ## Implementations
//!
//! | Handle | Module | Description |
//! |--------|--------|-------------|
//! | `MemoryNode` | `memory` | In-memory node for testing/embedding |
//! | `MemoryRelationship` | `memory` | In-memory relationship for testing/embedding |

pub mod memory;

use crate::model::Value;
use crate::Result;

pub use memory::{MemoryNode, MemoryRelationship};

/// A raw node or relationship handle supplied by the storage layer.
///
/// The handle is shared, not owned: wrapping the same handle twice is safe,
/// and the surrounding transaction layer is responsible for serializing
/// conflicting writes. Implementations use interior mutability so dispatch
/// can write through a shared reference.
pub trait RawHandle: Send + Sync {
    /// Stable identifier of the underlying entity.
    fn uuid(&self) -> String;

    /// Read a raw field, bypassing all override chains.
    fn get_raw(&self, key: &str) -> Option<Value>;

    /// Write a raw field, bypassing all override chains.
    fn set_raw(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a raw field.
    fn remove_raw(&self, key: &str) -> Result<()>;

    /// Whether the underlying entity still exists in storage.
    fn exists(&self) -> bool;

    /// Names of all raw fields currently present.
    fn keys(&self) -> Vec<String>;
}
