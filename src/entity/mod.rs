//! # Entity Wrappers
//!
//! Binds a raw storage handle to a composed [`TypeDescriptor`], producing
//! the object callers interact with. Wrappers are request/transaction-scoped
//! value objects: wrapping the same handle twice is safe and the wrappers
//! are interchangeable.
//!
//! Every typed operation routes through the descriptor's dispatch
//! structures — property get/set and permission checks through the override
//! chains, lifecycle events through the ordered hook lists. Downstream
//! layers never see trait internals.

use std::sync::Arc;

use tracing::trace;

use crate::dispatch::{self, DispatchContext, LifecycleEvent, OpInput, OpKind, Permission};
use crate::model::Value;
use crate::schema::{TraitRegistry, TypeDescriptor};
use crate::script::ScriptEvaluator;
use crate::storage::RawHandle;
use crate::{Error, Result};

// ============================================================================
// WrappedEntity
// ============================================================================

/// A short-lived binding of a raw graph handle to a type descriptor.
#[derive(Clone)]
pub struct WrappedEntity {
    descriptor: Arc<TypeDescriptor>,
    handle: Arc<dyn RawHandle>,
    evaluator: Option<Arc<dyn ScriptEvaluator>>,
}

impl WrappedEntity {
    pub fn new(descriptor: Arc<TypeDescriptor>, handle: Arc<dyn RawHandle>) -> Self {
        Self { descriptor, handle, evaluator: None }
    }

    /// Bind a script evaluator for script-backed lifecycle contributions.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn uuid(&self) -> String {
        self.handle.uuid()
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.type_name()
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn handle(&self) -> &Arc<dyn RawHandle> {
        &self.handle
    }

    fn ctx(&self) -> DispatchContext<'_> {
        DispatchContext {
            handle: &*self.handle,
            descriptor: &self.descriptor,
            evaluator: self.evaluator.as_deref(),
        }
    }

    // ========================================================================
    // Property access (chainable dispatch)
    // ========================================================================

    /// Read a property through the GetProperty override chain.
    pub fn get(&self, name: &str) -> Result<Value> {
        if !self.descriptor.has_key(name) {
            return Err(Error::NoSuchProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            });
        }
        trace!(type_name = self.type_name(), property = name, "get");
        self.descriptor
            .chain(OpKind::GetProperty)
            .invoke(&self.ctx(), &OpInput::Get { property: name.to_string() })
    }

    /// Write a property through the SetProperty override chain.
    ///
    /// Enforces the key's declared type and its `read_only` flag before any
    /// contribution runs.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let key = self.descriptor.key(name).ok_or_else(|| Error::NoSuchProperty {
            type_name: self.type_name().to_string(),
            property: name.to_string(),
        })?;
        if key.read_only {
            return Err(Error::ReadOnlyProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            });
        }
        if !key.accepts(&value) {
            return Err(Error::TypeMismatch {
                property: name.to_string(),
                expected: key.value_type.name().to_string(),
                got: value.type_name().to_string(),
            });
        }
        trace!(type_name = self.type_name(), property = name, "set");
        self.descriptor
            .chain(OpKind::SetProperty)
            .invoke(&self.ctx(), &OpInput::Set { property: name.to_string(), value })?;
        Ok(())
    }

    // ========================================================================
    // Permission checks (chainable dispatch)
    // ========================================================================

    /// Check a permission for a principal through the IsGranted chain.
    pub fn is_granted(&self, permission: Permission, principal: &str) -> Result<bool> {
        let verdict = self.descriptor.chain(OpKind::IsGranted).invoke(
            &self.ctx(),
            &OpInput::Permission { permission, principal: principal.to_string() },
        )?;
        Ok(verdict.is_truthy())
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Serialize a named view: the view's ordered property list, each value
    /// read through per-property get dispatch.
    pub fn view(&self, view_name: &str) -> Result<Vec<(String, Value)>> {
        let properties = self.descriptor.view(view_name).ok_or_else(|| Error::NoSuchView {
            type_name: self.type_name().to_string(),
            view: view_name.to_string(),
        })?;
        let mut out = Vec::with_capacity(properties.len());
        // Views may list names no trait declares as keys (computed or
        // storage-only fields); those fall through to raw access.
        for name in properties {
            let value = if self.descriptor.has_key(name) {
                self.get(name)?
            } else {
                self.handle.get_raw(name).unwrap_or(Value::Null)
            };
            out.push((name.clone(), value));
        }
        Ok(out)
    }

    /// Render a named view as a JSON object, preserving property order.
    pub fn view_json(&self, view_name: &str) -> Result<serde_json::Value> {
        let pairs = self.view(view_name)?;
        let mut map = serde_json::Map::with_capacity(pairs.len());
        for (name, value) in pairs {
            map.insert(name, value.to_json());
        }
        Ok(serde_json::Value::Object(map))
    }

    // ========================================================================
    // Lifecycle (aggregated dispatch)
    // ========================================================================

    /// Fire a lifecycle event: every contributing trait's hook runs in
    /// composition order, fail-fast.
    pub fn fire(&self, event: LifecycleEvent) -> Result<()> {
        dispatch::run_lifecycle(&self.ctx(), self.descriptor.lifecycle(event), event)
    }

    /// Materialize declared defaults for absent fields, then check that
    /// every `required` key is present.
    pub fn validate(&self) -> Result<()> {
        for key in self.descriptor.keys() {
            if self.handle.get_raw(&key.name).is_none() {
                if let Some(default) = &key.default_value {
                    self.handle.set_raw(&key.name, default.clone())?;
                } else if key.required {
                    return Err(Error::RequiredProperty {
                        type_name: self.type_name().to_string(),
                        property: key.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Entity trait + generic wrapper
// ============================================================================

/// The surface downstream consumers program against. Custom wrapper types
/// produced by a trait's factory implement this and add their own
/// convenience accessors on top.
pub trait Entity: Send + Sync {
    fn core(&self) -> &WrappedEntity;

    fn uuid(&self) -> String {
        self.core().uuid()
    }

    fn type_name(&self) -> &str {
        self.core().type_name()
    }

    fn get(&self, name: &str) -> Result<Value> {
        self.core().get(name)
    }

    fn set(&self, name: &str, value: Value) -> Result<()> {
        self.core().set(name, value)
    }

    fn is_granted(&self, permission: Permission, principal: &str) -> Result<bool> {
        self.core().is_granted(permission, principal)
    }

    fn view(&self, view_name: &str) -> Result<Vec<(String, Value)>> {
        self.core().view(view_name)
    }

    fn fire(&self, event: LifecycleEvent) -> Result<()> {
        self.core().fire(event)
    }
}

/// The wrapper used when no trait in a composition supplies a factory.
pub struct GenericEntity {
    core: WrappedEntity,
}

impl GenericEntity {
    pub fn new(core: WrappedEntity) -> Self {
        Self { core }
    }
}

impl Entity for GenericEntity {
    fn core(&self) -> &WrappedEntity {
        &self.core
    }
}

/// Produces a specialized wrapper from the core binding. Exactly one factory
/// is consulted per type: the last-declared contributor in the composition.
pub type EntityFactory = Arc<dyn Fn(WrappedEntity) -> Box<dyn Entity> + Send + Sync>;

// ============================================================================
// Wrapping entry points
// ============================================================================

/// Bind a raw handle to a declared type, consulting the winning factory.
pub fn wrap(
    registry: &TraitRegistry,
    type_name: &str,
    handle: Arc<dyn RawHandle>,
) -> Result<Box<dyn Entity>> {
    let descriptor = registry.get(type_name)?;
    let core = WrappedEntity::new(descriptor.clone(), handle);
    Ok(match descriptor.factory() {
        Some(factory) => factory(core),
        None => Box::new(GenericEntity::new(core)),
    })
}

/// Like [`wrap`], with a script evaluator bound for script-backed hooks.
pub fn wrap_with_evaluator(
    registry: &TraitRegistry,
    type_name: &str,
    handle: Arc<dyn RawHandle>,
    evaluator: Arc<dyn ScriptEvaluator>,
) -> Result<Box<dyn Entity>> {
    let descriptor = registry.get(type_name)?;
    let core = WrappedEntity::new(descriptor.clone(), handle).with_evaluator(evaluator);
    Ok(match descriptor.factory() {
        Some(factory) => factory(core),
        None => Box::new(GenericEntity::new(core)),
    })
}

/// Creation flow: wrap, fire BeforeCreate, validate (materializing declared
/// defaults), fire AfterCreate.
pub fn create(
    registry: &TraitRegistry,
    type_name: &str,
    handle: Arc<dyn RawHandle>,
) -> Result<Box<dyn Entity>> {
    let entity = wrap(registry, type_name, handle)?;
    entity.core().fire(LifecycleEvent::BeforeCreate)?;
    entity.core().validate()?;
    entity.core().fire(LifecycleEvent::AfterCreate)?;
    Ok(entity)
}

/// Deletion flow: fire BeforeDelete, run the caller's removal action against
/// the storage layer, fire AfterDelete.
pub fn delete<F>(entity: &dyn Entity, remove: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    entity.core().fire(LifecycleEvent::BeforeDelete)?;
    remove()?;
    entity.core().fire(LifecycleEvent::AfterDelete)
}
