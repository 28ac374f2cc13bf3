//! Process-wide trait and type-composition registry.
//!
//! Populated during startup, then sealed and read-mostly afterward. The
//! intended discipline is two-phase: register every trait first, then every
//! composition (so module load order cannot break resolution), then call
//! [`TraitRegistry::seal`]. Sealing eagerly composes every declared type, so
//! configuration errors are fatal at startup and never surface at request
//! time.
//!
//! Registration takes the write lock; steady-state reads after sealing take
//! the read lock only and never contend with writers.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::schema::{compose, EntityKind, TraitDefinition, TypeDescriptor};
use crate::schema::compose::resolve;
use crate::{Error, Result};

/// A declared type: its name, kind, and ordered trait list.
///
/// The order is caller-supplied and authoritative; later entries are more
/// specific and layer on top of earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeComposition {
    pub type_name: String,
    pub kind: EntityKind,
    pub trait_names: Vec<String>,
}

/// The process-wide table of trait definitions and declared compositions,
/// plus the cache of composed descriptors.
pub struct TraitRegistry {
    inner: RwLock<Inner>,
}

struct Inner {
    traits: HashMap<String, Arc<TraitDefinition>>,
    compositions: HashMap<String, TypeComposition>,
    cache: HashMap<String, Arc<TypeDescriptor>>,
    sealed: bool,
}

impl Default for TraitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                traits: HashMap::new(),
                compositions: HashMap::new(),
                cache: HashMap::new(),
                sealed: false,
            }),
        }
    }

    // ========================================================================
    // Registration (startup phase)
    // ========================================================================

    /// Register a trait definition under its name.
    ///
    /// Re-registration is never silently accepted, even with identical
    /// content — modules must be idempotent on their side.
    pub fn register_trait(&self, def: TraitDefinition) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Err(Error::RegistrySealed);
        }
        let name = def.name().to_string();
        if inner.traits.contains_key(&name) {
            return Err(Error::DuplicateTrait(name));
        }
        debug!(trait_name = %name, "registered trait");
        inner.traits.insert(name, Arc::new(def));
        Ok(())
    }

    /// Declare a node type as an ordered list of trait names.
    pub fn register_node_type<S: AsRef<str>>(&self, name: &str, traits: &[S]) -> Result<()> {
        self.register_composition(name, EntityKind::Node, traits)
    }

    /// Declare a relationship type as an ordered list of trait names.
    pub fn register_relationship_type<S: AsRef<str>>(&self, name: &str, traits: &[S]) -> Result<()> {
        self.register_composition(name, EntityKind::Relationship, traits)
    }

    fn register_composition<S: AsRef<str>>(
        &self,
        name: &str,
        kind: EntityKind,
        traits: &[S],
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Err(Error::RegistrySealed);
        }
        if inner.compositions.contains_key(name) {
            return Err(Error::DuplicateType(name.to_string()));
        }

        let trait_names: Vec<String> = traits.iter().map(|s| s.as_ref().to_string()).collect();
        for (i, t) in trait_names.iter().enumerate() {
            if !inner.traits.contains_key(t) {
                return Err(Error::UnknownTrait {
                    trait_name: t.clone(),
                    type_name: name.to_string(),
                });
            }
            if trait_names[..i].contains(t) {
                return Err(Error::DuplicateTraitInComposition {
                    trait_name: t.clone(),
                    type_name: name.to_string(),
                });
            }
        }

        debug!(type_name = name, kind = kind.label(), ?trait_names, "registered type");
        inner.compositions.insert(
            name.to_string(),
            TypeComposition { type_name: name.to_string(), kind, trait_names },
        );
        Ok(())
    }

    /// Seal the registry: eagerly compose every declared type, then refuse
    /// all further registration. Idempotent — sealing twice is a no-op.
    pub fn seal(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Ok(());
        }

        let pending: Vec<TypeComposition> = inner
            .compositions
            .values()
            .filter(|c| !inner.cache.contains_key(&c.type_name))
            .cloned()
            .collect();
        for comp in pending {
            let defs = resolve(&comp.type_name, &comp.trait_names, &inner.traits)?;
            let descriptor = compose(&comp.type_name, comp.kind, &defs);
            inner.cache.insert(comp.type_name.clone(), Arc::new(descriptor));
        }

        inner.sealed = true;
        debug!(types = inner.cache.len(), "registry sealed");
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.read().sealed
    }

    // ========================================================================
    // Lookup (steady-state phase)
    // ========================================================================

    /// The composed descriptor for a declared type.
    ///
    /// After sealing every descriptor is cached, so this is a read-lock
    /// lookup. Before sealing the descriptor is composed lazily on first
    /// access.
    pub fn get(&self, type_name: &str) -> Result<Arc<TypeDescriptor>> {
        {
            let inner = self.inner.read();
            if let Some(descriptor) = inner.cache.get(type_name) {
                return Ok(descriptor.clone());
            }
            if !inner.compositions.contains_key(type_name) {
                return Err(Error::UnknownType(type_name.to_string()));
            }
        }

        // Lazy path: compose under the write lock so a half-built descriptor
        // is never visible. Re-check the cache after reacquiring.
        let mut inner = self.inner.write();
        if let Some(descriptor) = inner.cache.get(type_name) {
            return Ok(descriptor.clone());
        }
        let comp = inner
            .compositions
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?
            .clone();
        let defs = resolve(&comp.type_name, &comp.trait_names, &inner.traits)?;
        let descriptor = Arc::new(compose(&comp.type_name, comp.kind, &defs));
        inner.cache.insert(comp.type_name, descriptor.clone());
        Ok(descriptor)
    }

    /// Whether a trait name is registered.
    pub fn has_trait(&self, name: &str) -> bool {
        self.inner.read().traits.contains_key(name)
    }

    /// Whether a type name is declared.
    pub fn has_type(&self, name: &str) -> bool {
        self.inner.read().compositions.contains_key(name)
    }

    /// All declared type names (unordered).
    pub fn type_names(&self) -> Vec<String> {
        self.inner.read().compositions.keys().cloned().collect()
    }

    /// The declared composition for a type, if any.
    pub fn composition(&self, type_name: &str) -> Option<TypeComposition> {
        self.inner.read().compositions.get(type_name).cloned()
    }

    // ========================================================================
    // Invalidation (explicit recomposition path)
    // ========================================================================

    /// Drop one cached descriptor so the next `get` recomposes it. Refused
    /// while sealed: reopen with [`unseal_for_reload`](Self::unseal_for_reload)
    /// first.
    pub fn invalidate(&self, type_name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Err(Error::RegistrySealed);
        }
        inner.cache.remove(type_name);
        Ok(())
    }

    /// Drop every cached descriptor. Refused while sealed.
    pub fn invalidate_all(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Err(Error::RegistrySealed);
        }
        inner.cache.clear();
        Ok(())
    }

    /// Reopen a sealed registry for schema reload. Clears the descriptor
    /// cache; callers must re-seal before serving steady-state traffic.
    pub fn unseal_for_reload(&self) {
        let mut inner = self.inner.write();
        if !inner.sealed {
            return;
        }
        warn!("registry unsealed for schema reload; descriptor cache cleared");
        inner.sealed = false;
        inner.cache.clear();
    }
}
