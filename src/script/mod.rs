//! # Script Evaluator Boundary
//!
//! Lifecycle contributions may execute user-authored scripts. The evaluator
//! itself is an external collaborator; this module only defines its contract
//! and the adapter that turns a script source into a lifecycle hook.
//!
//! The engine never interprets script-level errors — it forwards them to the
//! dispatch caller as contribution failures.

use std::sync::Arc;

use crate::dispatch::{DispatchContext, LifecycleEvent, LifecycleFn};
use crate::model::Value;
use crate::storage::RawHandle;
use crate::{Error, Result};

/// Contract of the external scripting/expression evaluator.
///
/// `event_label` is the qualified event name the script was registered for,
/// e.g. `"File.afterCreate"`.
pub trait ScriptEvaluator: Send + Sync {
    fn execute(
        &self,
        entity: &dyn RawHandle,
        source: &str,
        event_label: &str,
    ) -> Result<Value>;
}

/// Adapt a script source into a lifecycle contribution.
///
/// The hook resolves the evaluator from the dispatch context at call time
/// and labels the event `"<Type>.<event>"`. A context without an evaluator
/// bound is a script error; evaluator failures propagate verbatim.
pub fn script_hook(source: impl Into<String>) -> LifecycleFn {
    let source = source.into();
    Arc::new(move |ctx: &DispatchContext<'_>, event: LifecycleEvent| {
        let label = format!("{}.{}", ctx.descriptor.type_name(), event.label());
        let evaluator = ctx
            .evaluator
            .ok_or_else(|| Error::Script(format!("no evaluator bound for {label}")))?;
        evaluator.execute(ctx.handle, &source, &label)?;
        Ok(())
    })
}
