//! In-memory raw handles.
//!
//! Reference implementation of `RawHandle`, backed by a `PropertyMap` behind
//! a `parking_lot::RwLock`.
//!
//! ## Limitations
//!
//! - **No transactions**: writes are applied immediately and are not undone.
//! - **No indexing**: the `indexed`/`unique` key flags are schema metadata
//!   only; nothing here enforces uniqueness across handles.
//!
//! Use these handles for:
//! - Testing trait compositions and override chains without a graph store
//! - Embedding the engine in applications that don't need persistence

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::model::{PropertyMap, Value};
use crate::{Error, Result};
use super::RawHandle;

// ============================================================================
// MemoryNode
// ============================================================================

/// In-memory node handle. Cheap to clone; clones share the same fields.
#[derive(Clone)]
pub struct MemoryNode {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    uuid: String,
    props: RwLock<PropertyMap>,
    deleted: AtomicBool,
}

impl HandleInner {
    fn new(uuid: String) -> Self {
        Self {
            uuid,
            props: RwLock::new(PropertyMap::new()),
            deleted: AtomicBool::new(false),
        }
    }
}

impl MemoryNode {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { inner: Arc::new(HandleInner::new(uuid.into())) }
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.props.write().insert(key.into(), value.into());
        self
    }

    /// Tombstone the node. Subsequent `exists()` returns false.
    pub fn mark_deleted(&self) {
        self.inner.deleted.store(true, Ordering::Release);
    }
}

impl RawHandle for MemoryNode {
    fn uuid(&self) -> String {
        self.inner.uuid.clone()
    }

    fn get_raw(&self, key: &str) -> Option<Value> {
        self.inner.props.read().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: Value) -> Result<()> {
        if self.inner.deleted.load(Ordering::Acquire) {
            return Err(Error::Storage(format!("node {} is deleted", self.inner.uuid)));
        }
        self.inner.props.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        self.inner.props.write().remove(key);
        Ok(())
    }

    fn exists(&self) -> bool {
        !self.inner.deleted.load(Ordering::Acquire)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.props.read().keys().cloned().collect()
    }
}

// ============================================================================
// MemoryRelationship
// ============================================================================

/// In-memory relationship handle with source and target endpoint uuids.
#[derive(Clone)]
pub struct MemoryRelationship {
    inner: Arc<HandleInner>,
    source_uuid: String,
    target_uuid: String,
}

impl MemoryRelationship {
    pub fn new(
        uuid: impl Into<String>,
        source_uuid: impl Into<String>,
        target_uuid: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner::new(uuid.into())),
            source_uuid: source_uuid.into(),
            target_uuid: target_uuid.into(),
        }
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.props.write().insert(key.into(), value.into());
        self
    }

    pub fn source_uuid(&self) -> &str {
        &self.source_uuid
    }

    pub fn target_uuid(&self) -> &str {
        &self.target_uuid
    }

    pub fn mark_deleted(&self) {
        self.inner.deleted.store(true, Ordering::Release);
    }
}

impl RawHandle for MemoryRelationship {
    fn uuid(&self) -> String {
        self.inner.uuid.clone()
    }

    fn get_raw(&self, key: &str) -> Option<Value> {
        self.inner.props.read().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: Value) -> Result<()> {
        if self.inner.deleted.load(Ordering::Acquire) {
            return Err(Error::Storage(format!("relationship {} is deleted", self.inner.uuid)));
        }
        self.inner.props.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        self.inner.props.write().remove(key);
        Ok(())
    }

    fn exists(&self) -> bool {
        !self.inner.deleted.load(Ordering::Acquire)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.props.read().keys().cloned().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_raw() {
        let node = MemoryNode::new("n1");
        node.set_raw("name", Value::from("Ada")).unwrap();
        assert_eq!(node.get_raw("name"), Some(Value::from("Ada")));
        assert_eq!(node.get_raw("missing"), None);
    }

    #[test]
    fn test_clones_share_fields() {
        let node = MemoryNode::new("n1");
        let alias = node.clone();
        node.set_raw("x", Value::Int(1)).unwrap();
        assert_eq!(alias.get_raw("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_deleted_node_rejects_writes() {
        let node = MemoryNode::new("n1");
        node.mark_deleted();
        assert!(!node.exists());
        assert!(node.set_raw("x", Value::Int(1)).is_err());
    }

    #[test]
    fn test_relationship_endpoints() {
        let rel = MemoryRelationship::new("r1", "a", "b");
        assert_eq!(rel.source_uuid(), "a");
        assert_eq!(rel.target_uuid(), "b");
        rel.set_raw("since", Value::Int(2025)).unwrap();
        assert_eq!(rel.get_raw("since"), Some(Value::Int(2025)));
    }
}
