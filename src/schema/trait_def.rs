//! Trait definitions — named, immutable bundles of fields and behavior.

use std::fmt;

use hashbrown::HashMap;

use crate::dispatch::{ChainableFn, DispatchContext, LifecycleEvent, LifecycleFn, OpInput, OpKind, SuperCall};
use crate::entity::{Entity, EntityFactory, WrappedEntity};
use crate::model::Value;
use crate::schema::PropertyKey;
use crate::{Error, Result};

/// An ordered subset of property names exposed under a view name.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpec {
    pub properties: Vec<String>,
    /// An exclusive view replaces what earlier traits accumulated under the
    /// same name instead of appending to it.
    pub exclusive: bool,
}

/// A named, reusable bundle of property keys, views, and behavior overrides.
///
/// Immutable once built; the registry publishes definitions as
/// `Arc<TraitDefinition>` and never mutates them. Construct through
/// [`TraitDefinition::builder`].
pub struct TraitDefinition {
    name: String,
    keys: Vec<PropertyKey>,
    /// Declaration order matters: view merging across traits preserves it.
    views: Vec<(String, ViewSpec)>,
    chainable: HashMap<OpKind, ChainableFn>,
    lifecycle: HashMap<LifecycleEvent, LifecycleFn>,
    factory: Option<EntityFactory>,
}

impl TraitDefinition {
    pub fn builder(name: impl Into<String>) -> TraitBuilder {
        TraitBuilder {
            name: name.into(),
            keys: Vec::new(),
            views: Vec::new(),
            chainable: HashMap::new(),
            lifecycle: HashMap::new(),
            factory: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[PropertyKey] {
        &self.keys
    }

    pub fn views(&self) -> &[(String, ViewSpec)] {
        &self.views
    }

    pub fn chainable(&self, kind: OpKind) -> Option<&ChainableFn> {
        self.chainable.get(&kind)
    }

    pub fn lifecycle(&self, event: LifecycleEvent) -> Option<&LifecycleFn> {
        self.lifecycle.get(&event)
    }

    pub fn factory(&self) -> Option<&EntityFactory> {
        self.factory.as_ref()
    }
}

impl fmt::Debug for TraitDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitDefinition")
            .field("name", &self.name)
            .field("keys", &self.keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>())
            .field("views", &self.views.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>())
            .field("chainable", &self.chainable.keys().collect::<Vec<_>>())
            .field("lifecycle", &self.lifecycle.keys().collect::<Vec<_>>())
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`TraitDefinition`]. `build()` rejects duplicate property
/// names within the trait — that is a configuration error, not a merge case.
pub struct TraitBuilder {
    name: String,
    keys: Vec<PropertyKey>,
    views: Vec<(String, ViewSpec)>,
    chainable: HashMap<OpKind, ChainableFn>,
    lifecycle: HashMap<LifecycleEvent, LifecycleFn>,
    factory: Option<EntityFactory>,
}

impl TraitBuilder {
    pub fn property(mut self, key: PropertyKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn view<I, S>(mut self, name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.views.push((
            name.into(),
            ViewSpec {
                properties: properties.into_iter().map(Into::into).collect(),
                exclusive: false,
            },
        ));
        self
    }

    /// A view that replaces, rather than extends, what earlier traits in a
    /// composition accumulated under the same name.
    pub fn exclusive_view<I, S>(mut self, name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.views.push((
            name.into(),
            ViewSpec {
                properties: properties.into_iter().map(Into::into).collect(),
                exclusive: true,
            },
        ));
        self
    }

    /// Contribute a chainable override for one operation kind. At most one
    /// per kind per trait; a later call replaces the earlier one.
    pub fn on<F>(mut self, kind: OpKind, f: F) -> Self
    where
        F: Fn(&DispatchContext<'_>, &OpInput, SuperCall<'_>) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.chainable.insert(kind, std::sync::Arc::new(f));
        self
    }

    /// Contribute a lifecycle hook for one event.
    pub fn lifecycle<F>(mut self, event: LifecycleEvent, f: F) -> Self
    where
        F: Fn(&DispatchContext<'_>, LifecycleEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.lifecycle.insert(event, std::sync::Arc::new(f));
        self
    }

    /// Contribute a pre-built lifecycle hook (e.g. a script-backed one).
    pub fn lifecycle_fn(mut self, event: LifecycleEvent, f: LifecycleFn) -> Self {
        self.lifecycle.insert(event, f);
        self
    }

    /// Supply a custom wrapper factory. In a composition, the last-declared
    /// trait supplying one wins.
    pub fn factory<F>(mut self, f: F) -> Self
    where
        F: Fn(WrappedEntity) -> Box<dyn Entity> + Send + Sync + 'static,
    {
        self.factory = Some(std::sync::Arc::new(f));
        self
    }

    pub fn build(self) -> Result<TraitDefinition> {
        for (i, key) in self.keys.iter().enumerate() {
            if self.keys[..i].iter().any(|k| k.name == key.name) {
                return Err(Error::DuplicatePropertyKey {
                    trait_name: self.name,
                    key: key.name.clone(),
                });
            }
        }
        Ok(TraitDefinition {
            name: self.name,
            keys: self.keys,
            views: self.views,
            chainable: self.chainable,
            lifecycle: self.lifecycle,
            factory: self.factory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_trait() {
        let def = TraitDefinition::builder("Base")
            .property(PropertyKey::string("name"))
            .view("public", ["name"])
            .build()
            .unwrap();

        assert_eq!(def.name(), "Base");
        assert_eq!(def.keys().len(), 1);
        assert_eq!(def.views().len(), 1);
        assert!(def.chainable(OpKind::GetProperty).is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = TraitDefinition::builder("Broken")
            .property(PropertyKey::string("name"))
            .property(PropertyKey::int("name"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::DuplicatePropertyKey { .. }));
    }

    #[test]
    fn test_chainable_contribution_registered() {
        let def = TraitDefinition::builder("Masked")
            .on(OpKind::GetProperty, |_ctx, _input, _sup| Ok(Value::from("***")))
            .build()
            .unwrap();

        assert!(def.chainable(OpKind::GetProperty).is_some());
        assert!(def.chainable(OpKind::SetProperty).is_none());
    }
}
