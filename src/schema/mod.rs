//! # Schema Layer
//!
//! Traits, compositions, and the composer that turns an ordered trait list
//! into an immutable [`TypeDescriptor`].
//!
//! Entity "types" are not compiled: they are assembled at runtime from an
//! ordered list of named traits, each contributing property keys, views, and
//! behavior overrides. The [`TraitRegistry`] holds the process-wide table of
//! trait definitions and declared compositions; [`compose`] is the pure,
//! deterministic linearization step.

pub mod property;
pub mod trait_def;
pub mod descriptor;
pub mod compose;
pub mod registry;

use serde::{Deserialize, Serialize};

pub use property::PropertyKey;
pub use trait_def::{TraitBuilder, TraitDefinition, ViewSpec};
pub use descriptor::{ShadowedKey, TypeDescriptor};
pub use compose::compose;
pub use registry::{TraitRegistry, TypeComposition};

/// Whether a composed type describes nodes or relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Relationship,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Relationship => "relationship",
        }
    }
}
