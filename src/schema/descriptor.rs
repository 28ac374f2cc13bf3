//! The immutable composed result for one type.

use std::fmt;

use hashbrown::HashMap;

use crate::dispatch::{Chain, LifecycleEvent, LifecycleHook, OpKind};
use crate::entity::EntityFactory;
use crate::schema::{EntityKind, PropertyKey};

/// A property-key collision recorded during composition.
///
/// Collisions are not errors: a later trait refining a shared field is the
/// expected path. They are kept observable here and logged as warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedKey {
    pub name: String,
    pub shadowed_trait: String,
    pub winning_trait: String,
}

/// Per-kind override chains. Every kind always has a valid chain — at
/// minimum the built-in default — so dispatch is total.
pub(crate) struct OpChains {
    pub get: Chain,
    pub set: Chain,
    pub is_granted: Chain,
}

/// The composed, immutable descriptor for one declared type: merged property
/// keys, merged views, and per-operation dispatch structures.
///
/// Descriptors are published as `Arc<TypeDescriptor>` and cached by the
/// registry; once composed they are never mutated, so concurrent readers
/// need no synchronization.
pub struct TypeDescriptor {
    type_name: String,
    kind: EntityKind,
    trait_names: Vec<String>,
    keys: HashMap<String, PropertyKey>,
    /// Ordered by first appearance across the composition.
    views: Vec<(String, Vec<String>)>,
    chains: OpChains,
    lifecycle: HashMap<LifecycleEvent, Vec<LifecycleHook>>,
    factory: Option<EntityFactory>,
    shadowed_keys: Vec<ShadowedKey>,
}

impl TypeDescriptor {
    #[allow(clippy::too_many_arguments, reason = "constructed by the composer only")]
    pub(crate) fn new(
        type_name: String,
        kind: EntityKind,
        trait_names: Vec<String>,
        keys: HashMap<String, PropertyKey>,
        views: Vec<(String, Vec<String>)>,
        chains: OpChains,
        lifecycle: HashMap<LifecycleEvent, Vec<LifecycleHook>>,
        factory: Option<EntityFactory>,
        shadowed_keys: Vec<ShadowedKey>,
    ) -> Self {
        Self { type_name, kind, trait_names, keys, views, chains, lifecycle, factory, shadowed_keys }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The composition's trait names, in declared order.
    pub fn trait_names(&self) -> &[String] {
        &self.trait_names
    }

    pub fn key(&self, name: &str) -> Option<&PropertyKey> {
        self.keys.get(name)
    }

    pub fn has_key(&self, name: &str) -> bool {
        self.keys.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.keys.values()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Ordered property names of a view, if declared.
    pub fn view(&self, name: &str) -> Option<&[String]> {
        self.views
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, props)| props.as_slice())
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.iter().map(|(n, _)| n.as_str())
    }

    /// The override chain for one operation kind. Always valid: composition
    /// guarantees at minimum the built-in default.
    pub fn chain(&self, kind: OpKind) -> &Chain {
        match kind {
            OpKind::GetProperty => &self.chains.get,
            OpKind::SetProperty => &self.chains.set,
            OpKind::IsGranted => &self.chains.is_granted,
        }
    }

    /// Lifecycle hooks for one event, in composition order. Empty when no
    /// trait contributes one.
    pub fn lifecycle(&self, event: LifecycleEvent) -> &[LifecycleHook] {
        self.lifecycle.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn factory(&self) -> Option<&EntityFactory> {
        self.factory.as_ref()
    }

    /// Property-key collisions observed during composition, in the order
    /// they occurred.
    pub fn shadowed_keys(&self) -> &[ShadowedKey] {
        &self.shadowed_keys
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("traits", &self.trait_names)
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .field("views", &self.views.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>())
            .field("shadowed_keys", &self.shadowed_keys)
            .finish()
    }
}
