//! The type composer (linearizer).
//!
//! Turns an ordered list of resolved trait definitions into a
//! [`TypeDescriptor`]: merged property keys (last-wins with a recorded
//! diagnostic), merged views (append, de-dup, exclusive replace), ordered
//! lifecycle hook lists, and per-kind override chains linked
//! most-specific-first and terminated by a built-in default.
//!
//! `compose` is a pure function of its inputs: composing the same trait list
//! twice against an unchanged registry yields element-wise identical
//! descriptors. Name resolution and duplicate checks happen earlier, at
//! registration time, so composition itself cannot fail.

use std::sync::Arc;

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::dispatch::{Chain, DefaultFn, LifecycleEvent, LifecycleHook, OpInput, OpKind};
use crate::model::Value;
use crate::schema::descriptor::OpChains;
use crate::schema::{EntityKind, PropertyKey, ShadowedKey, TraitDefinition, TypeDescriptor};
use crate::{Error, Result};

/// Compose a descriptor from resolved trait definitions in declared order.
pub fn compose(
    type_name: &str,
    kind: EntityKind,
    defs: &[Arc<TraitDefinition>],
) -> TypeDescriptor {
    debug!(
        type_name,
        kind = kind.label(),
        traits = defs.len(),
        "composing type descriptor"
    );

    let trait_names: Vec<String> = defs.iter().map(|d| d.name().to_string()).collect();

    // Property keys: composition order, last declaration wins. Shadowing is
    // a compatibility warning, not an error.
    let mut keys: HashMap<String, PropertyKey> = HashMap::new();
    let mut owner: HashMap<String, String> = HashMap::new();
    let mut shadowed_keys = Vec::new();
    for def in defs {
        for key in def.keys() {
            if let Some(previous_owner) = owner.insert(key.name.clone(), def.name().to_string()) {
                warn!(
                    type_name,
                    property = %key.name,
                    shadowed_trait = %previous_owner,
                    winning_trait = def.name(),
                    "property key shadowed by later trait in composition"
                );
                shadowed_keys.push(ShadowedKey {
                    name: key.name.clone(),
                    shadowed_trait: previous_owner,
                    winning_trait: def.name().to_string(),
                });
            }
            keys.insert(key.name.clone(), key.clone());
        }
    }

    // Views: append in order, first-seen order preserved, de-dup by name.
    // An exclusive spec replaces what earlier traits accumulated.
    let mut views: Vec<(String, Vec<String>)> = Vec::new();
    for def in defs {
        for (view_name, spec) in def.views() {
            match views.iter_mut().find(|(n, _)| n == view_name) {
                Some((_, props)) => {
                    if spec.exclusive {
                        props.clear();
                    }
                    for p in &spec.properties {
                        if !props.contains(p) {
                            props.push(p.clone());
                        }
                    }
                }
                None => {
                    let mut props: Vec<String> = Vec::new();
                    for p in &spec.properties {
                        if !props.contains(p) {
                            props.push(p.clone());
                        }
                    }
                    views.push((view_name.clone(), props));
                }
            }
        }
    }

    // Lifecycle: every contributing trait, in composition order.
    let mut lifecycle: HashMap<LifecycleEvent, Vec<LifecycleHook>> = HashMap::new();
    for event in LifecycleEvent::ALL {
        let hooks: Vec<LifecycleHook> = defs
            .iter()
            .filter_map(|def| {
                def.lifecycle(event)
                    .map(|f| LifecycleHook::new(def.name(), f.clone()))
            })
            .collect();
        if !hooks.is_empty() {
            lifecycle.insert(event, hooks);
        }
    }

    // Chains: walking in composition order and prepending puts the
    // last-declared trait at the head, so the most specific contribution
    // runs first and `super` descends toward the built-in default.
    let build_chain = |kind: OpKind| {
        let mut chain = Chain::new(builtin_default(kind));
        for def in defs {
            if let Some(f) = def.chainable(kind) {
                chain.push_front(def.name().to_string(), f.clone());
            }
        }
        chain
    };
    let chains = OpChains {
        get: build_chain(OpKind::GetProperty),
        set: build_chain(OpKind::SetProperty),
        is_granted: build_chain(OpKind::IsGranted),
    };

    // Factory: the most specific (last-declared) contributor wins, like a
    // chain head.
    let factory = defs.iter().rev().find_map(|def| def.factory().cloned());

    TypeDescriptor::new(
        type_name.to_string(),
        kind,
        trait_names,
        keys,
        views,
        chains,
        lifecycle,
        factory,
        shadowed_keys,
    )
}

// ============================================================================
// Built-in defaults
// ============================================================================

/// The terminal behavior of every chain. Never absent: a composition with no
/// contributors for a kind dispatches straight here.
fn builtin_default(kind: OpKind) -> DefaultFn {
    use crate::dispatch::DispatchContext;
    match kind {
        OpKind::GetProperty => Arc::new(|ctx: &DispatchContext<'_>, input: &OpInput| match input {
            OpInput::Get { property } => {
                if let Some(v) = ctx.handle.get_raw(property) {
                    return Ok(v);
                }
                if let Some(d) = ctx.descriptor.key(property).and_then(|k| k.default_value.clone()) {
                    return Ok(d);
                }
                Ok(Value::Null)
            }
            _ => Err(mismatched(OpKind::GetProperty, input)),
        }),
        OpKind::SetProperty => Arc::new(|ctx: &DispatchContext<'_>, input: &OpInput| match input {
            OpInput::Set { property, value } => {
                ctx.handle.set_raw(property, value.clone())?;
                Ok(Value::Null)
            }
            _ => Err(mismatched(OpKind::SetProperty, input)),
        }),
        // Permissive base: restricting traits layer denials on top.
        OpKind::IsGranted => Arc::new(|_ctx: &DispatchContext<'_>, input: &OpInput| match input {
            OpInput::Permission { .. } => Ok(Value::Bool(true)),
            _ => Err(mismatched(OpKind::IsGranted, input)),
        }),
    }
}

fn mismatched(kind: OpKind, input: &OpInput) -> Error {
    Error::Dispatch(format!(
        "input {:?} does not match operation kind {}",
        input,
        kind.label()
    ))
}

// Convenience used by the registry to resolve-and-compose in one step.
pub(crate) fn resolve(
    type_name: &str,
    trait_names: &[String],
    lookup: &hashbrown::HashMap<String, Arc<TraitDefinition>>,
) -> Result<SmallVec<[Arc<TraitDefinition>; 8]>> {
    let mut defs: SmallVec<[Arc<TraitDefinition>; 8]> = SmallVec::new();
    for name in trait_names {
        let def = lookup.get(name).ok_or_else(|| Error::UnknownTrait {
            trait_name: name.clone(),
            type_name: type_name.to_string(),
        })?;
        defs.push(def.clone());
    }
    Ok(defs)
}
