//! # traitgraph — Runtime Trait Composition for Graph Entities
//!
//! Entity types are not compiled: they are assembled at runtime from an
//! ordered list of named **traits**, each contributing property keys, named
//! views, and behavior overrides for a fixed set of operations (property
//! get/set, permission checks, lifecycle notifications). The engine
//! reimplements multiple-inheritance-like layering — including explicit
//! super-delegation across any number of contributors — as plain data built
//! once per type.
//!
//! ## Design Principles
//!
//! 1. **Compose once, dispatch forever**: `compose()` is a pure function of
//!    (trait definitions, composition); the resulting `TypeDescriptor` is
//!    immutable and dispatch over it is lock-free.
//! 2. **Explicit super**: override chains are `Box`-linked lists built at
//!    composition time; "call super" is a capability passed into the active
//!    contribution, not implicit virtual dispatch.
//! 3. **Two dispatch shapes**: lifecycle events notify every contributor
//!    (ordered, fail-fast); value-producing operations run a single chain
//!    where exactly one result wins.
//! 4. **Two-phase registry**: register everything, seal, then read-only.
//!    Configuration errors are fatal at startup, never at request time.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use traitgraph::{
//!     entity, MemoryNode, PropertyKey, TraitDefinition, TraitRegistry, Value,
//! };
//!
//! # fn example() -> traitgraph::Result<()> {
//! let registry = TraitRegistry::new();
//! registry.register_trait(
//!     TraitDefinition::builder("Base")
//!         .property(PropertyKey::string("name"))
//!         .view("public", ["name"])
//!         .build()?,
//! )?;
//! registry.register_node_type("File", &["Base"])?;
//! registry.seal()?;
//!
//! let entity = entity::wrap(&registry, "File", Arc::new(MemoryNode::new("f1")))?;
//! entity.set("name", Value::from("readme.txt"))?;
//! assert_eq!(entity.get("name")?, Value::from("readme.txt"));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod dispatch;
pub mod entity;
pub mod storage;
pub mod script;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{PropertyMap, Value, ValueType};

// ============================================================================
// Re-exports: Schema
// ============================================================================

pub use schema::{
    compose, EntityKind, PropertyKey, ShadowedKey, TraitBuilder, TraitDefinition,
    TraitRegistry, TypeComposition, TypeDescriptor, ViewSpec,
};

// ============================================================================
// Re-exports: Dispatch
// ============================================================================

pub use dispatch::{
    Chain, DispatchContext, LifecycleEvent, LifecycleHook, OpInput, OpKind, Permission,
    SuperCall,
};

// ============================================================================
// Re-exports: Entities & boundaries
// ============================================================================

pub use entity::{Entity, EntityFactory, GenericEntity, WrappedEntity};
pub use script::ScriptEvaluator;
pub use storage::{MemoryNode, MemoryRelationship, RawHandle};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --- Configuration errors: fatal at registration/composition time ---
    #[error("Duplicate trait registration: {0}")]
    DuplicateTrait(String),

    #[error("Unknown trait '{trait_name}' referenced by type '{type_name}'")]
    UnknownTrait { trait_name: String, type_name: String },

    #[error("Duplicate type registration: {0}")]
    DuplicateType(String),

    #[error("Trait '{trait_name}' appears more than once in composition of type '{type_name}'")]
    DuplicateTraitInComposition { trait_name: String, type_name: String },

    #[error("Duplicate property key '{key}' in trait '{trait_name}'")]
    DuplicatePropertyKey { trait_name: String, key: String },

    #[error("Registry is sealed; registration refused")]
    RegistrySealed,

    // --- Lookup errors at call time ---
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("No such property '{property}' on type '{type_name}'")]
    NoSuchProperty { type_name: String, property: String },

    #[error("No such view '{view}' on type '{type_name}'")]
    NoSuchView { type_name: String, view: String },

    // --- Property constraint violations ---
    #[error("Property '{property}' on type '{type_name}' is read-only")]
    ReadOnlyProperty { type_name: String, property: String },

    #[error("Required property '{property}' missing on type '{type_name}'")]
    RequiredProperty { type_name: String, property: String },

    #[error("Type error for property '{property}': expected {expected}, got {got}")]
    TypeMismatch { property: String, expected: String, got: String },

    // --- Contribution / boundary failures: propagated verbatim ---
    #[error("Contribution of trait '{trait_name}' failed: {message}")]
    Hook { trait_name: String, message: String },

    #[error("Script error: {0}")]
    Script(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
