//! # Operation Dispatch
//!
//! The two calling conventions the engine supports:
//!
//! - **Chainable dispatch** (`Chain`): exactly one result wins per call.
//!   Contributions are linked most-specific-first at composition time; each
//!   invocation receives a [`SuperCall`] capability that runs the next link
//!   (or the built-in default at the end of the chain). A contribution may
//!   skip super entirely, call it first, or call it last — the engine only
//!   provides the linkage.
//! - **Lifecycle dispatch** (`run_lifecycle`): every contributing trait is
//!   notified, in composition order, fail-fast. The first failure propagates
//!   verbatim and later hooks never run.
//!
//! Chains and hook lists are built once per type by the composer and are
//! immutable afterward, so dispatch itself is lock-free.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::Value;
use crate::schema::TypeDescriptor;
use crate::script::ScriptEvaluator;
use crate::storage::RawHandle;
use crate::Result;

// ============================================================================
// Operation kinds
// ============================================================================

/// The value-producing operations a trait may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    GetProperty,
    SetProperty,
    IsGranted,
}

impl OpKind {
    pub const ALL: [OpKind; 3] = [OpKind::GetProperty, OpKind::SetProperty, OpKind::IsGranted];

    pub fn label(&self) -> &'static str {
        match self {
            OpKind::GetProperty => "getProperty",
            OpKind::SetProperty => "setProperty",
            OpKind::IsGranted => "isGranted",
        }
    }
}

/// The entity-lifecycle events a trait may hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    BeforeCreate,
    AfterCreate,
    BeforeModify,
    AfterModify,
    BeforeDelete,
    AfterDelete,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 6] = [
        LifecycleEvent::BeforeCreate,
        LifecycleEvent::AfterCreate,
        LifecycleEvent::BeforeModify,
        LifecycleEvent::AfterModify,
        LifecycleEvent::BeforeDelete,
        LifecycleEvent::AfterDelete,
    ];

    /// Event label as used in script bindings, e.g. `"afterCreate"`.
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleEvent::BeforeCreate => "beforeCreate",
            LifecycleEvent::AfterCreate => "afterCreate",
            LifecycleEvent::BeforeModify => "beforeModify",
            LifecycleEvent::AfterModify => "afterModify",
            LifecycleEvent::BeforeDelete => "beforeDelete",
            LifecycleEvent::AfterDelete => "afterDelete",
        }
    }
}

/// Permissions checked through the `IsGranted` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Read,
    Write,
    Delete,
    AccessControl,
}

// ============================================================================
// Dispatch arguments
// ============================================================================

/// Arguments for one chainable invocation.
#[derive(Debug, Clone)]
pub enum OpInput {
    Get { property: String },
    Set { property: String, value: Value },
    Permission { permission: Permission, principal: String },
}

impl OpInput {
    /// The property name this input addresses, if any.
    pub fn property(&self) -> Option<&str> {
        match self {
            OpInput::Get { property } | OpInput::Set { property, .. } => Some(property),
            OpInput::Permission { .. } => None,
        }
    }
}

/// Everything a contribution may touch during one invocation.
///
/// Holds references only — contexts are built per call on the wrapper's
/// stack and never outlive it.
#[derive(Clone, Copy)]
pub struct DispatchContext<'a> {
    pub handle: &'a dyn RawHandle,
    pub descriptor: &'a TypeDescriptor,
    pub evaluator: Option<&'a dyn ScriptEvaluator>,
}

// ============================================================================
// Contribution signatures
// ============================================================================

/// A value-producing contribution that may delegate to its super.
pub type ChainableFn =
    Arc<dyn Fn(&DispatchContext<'_>, &OpInput, SuperCall<'_>) -> Result<Value> + Send + Sync>;

/// The built-in terminal behavior of a chain. Cannot delegate further.
pub type DefaultFn = Arc<dyn Fn(&DispatchContext<'_>, &OpInput) -> Result<Value> + Send + Sync>;

/// A fail-fast lifecycle hook.
pub type LifecycleFn = Arc<dyn Fn(&DispatchContext<'_>, LifecycleEvent) -> Result<()> + Send + Sync>;

// ============================================================================
// Override chain
// ============================================================================

/// One contributor in an override chain, owning its successor exclusively.
pub struct ChainLink {
    trait_name: String,
    f: ChainableFn,
    next: Option<Box<ChainLink>>,
}

/// A fully linked override chain for one operation kind.
///
/// The head is the most specific (last-declared) contributor; the terminal
/// default is always present and never absent. `len()` counts contributor
/// links only.
pub struct Chain {
    head: Option<Box<ChainLink>>,
    default: DefaultFn,
}

impl Chain {
    /// A chain with no contributors: every call goes straight to `default`.
    pub fn new(default: DefaultFn) -> Self {
        Self { head: None, default }
    }

    /// Prepend a contributor, making it the new most-specific head.
    ///
    /// The composer calls this while walking traits in composition order, so
    /// the last-declared trait ends up at the head.
    pub(crate) fn push_front(&mut self, trait_name: String, f: ChainableFn) {
        let link = ChainLink { trait_name, f, next: self.head.take() };
        self.head = Some(Box::new(link));
    }

    /// Number of contributor links (the terminal default is not counted).
    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head.as_deref();
        while let Some(link) = cur {
            n += 1;
            cur = link.next.as_deref();
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Contributing trait names, most-specific first.
    pub fn trait_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut cur = self.head.as_deref();
        while let Some(link) = cur {
            names.push(link.trait_name.as_str());
            cur = link.next.as_deref();
        }
        names
    }

    /// Invoke the chain head (or the default if no trait contributes).
    pub fn invoke(&self, ctx: &DispatchContext<'_>, input: &OpInput) -> Result<Value> {
        match &self.head {
            Some(link) => {
                trace!(trait_name = %link.trait_name, "chain head invoke");
                (link.f)(ctx, input, SuperCall {
                    next: link.next.as_deref(),
                    default: &self.default,
                })
            }
            None => (self.default)(ctx, input),
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("contributors", &self.trait_names())
            .finish()
    }
}

/// Capability handed to a chain contribution, allowing it to run the next
/// (less specific) contribution — or the built-in default at the end of the
/// chain — with arguments of its choosing.
pub struct SuperCall<'a> {
    next: Option<&'a ChainLink>,
    default: &'a DefaultFn,
}

impl SuperCall<'_> {
    /// Run the next link in the chain, or the terminal default.
    pub fn invoke(&self, ctx: &DispatchContext<'_>, input: &OpInput) -> Result<Value> {
        match self.next {
            Some(link) => {
                trace!(trait_name = %link.trait_name, "super invoke");
                (link.f)(ctx, input, SuperCall {
                    next: link.next.as_deref(),
                    default: self.default,
                })
            }
            None => (self.default)(ctx, input),
        }
    }

    /// Whether another trait contribution remains below this one.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

// ============================================================================
// Lifecycle dispatch
// ============================================================================

/// One trait's lifecycle contribution, tagged with its origin for diagnostics.
pub struct LifecycleHook {
    trait_name: String,
    f: LifecycleFn,
}

impl LifecycleHook {
    pub fn new(trait_name: impl Into<String>, f: LifecycleFn) -> Self {
        Self { trait_name: trait_name.into(), f }
    }

    pub fn trait_name(&self) -> &str {
        &self.trait_name
    }

    pub fn call(&self, ctx: &DispatchContext<'_>, event: LifecycleEvent) -> Result<()> {
        (self.f)(ctx, event)
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHook")
            .field("trait_name", &self.trait_name)
            .finish()
    }
}

/// Run every hook in composition order, fail-fast.
///
/// The first failure propagates verbatim; hooks after it never run. An empty
/// list is a successful no-op.
pub fn run_lifecycle(
    ctx: &DispatchContext<'_>,
    hooks: &[LifecycleHook],
    event: LifecycleEvent,
) -> Result<()> {
    for hook in hooks {
        trace!(trait_name = %hook.trait_name, event = event.label(), "lifecycle hook");
        hook.call(ctx, event)?;
    }
    Ok(())
}
