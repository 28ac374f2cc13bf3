//! End-to-end tests for the entity wrapper surface: typed property access,
//! views, validation, custom factories, and script-backed lifecycle hooks.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use traitgraph::{
    entity, Entity, Error, LifecycleEvent, MemoryNode, OpKind, Permission, PropertyKey,
    RawHandle, ScriptEvaluator, TraitDefinition, TraitRegistry, Value, WrappedEntity,
};

/// The pass-through base trait: declares fields and delegates both accessors
/// straight to super.
fn base_trait() -> TraitDefinition {
    TraitDefinition::builder("Base")
        .property(PropertyKey::string("name"))
        .property(PropertyKey::string("secret"))
        .view("public", ["name"])
        .on(OpKind::GetProperty, |ctx, input, sup| sup.invoke(ctx, input))
        .on(OpKind::SetProperty, |ctx, input, sup| sup.invoke(ctx, input))
        .build()
        .unwrap()
}

/// Masks `secret` behind a fixed sentinel, delegating everything else.
fn hidden_trait() -> TraitDefinition {
    TraitDefinition::builder("Hidden")
        .on(OpKind::GetProperty, |ctx, input, sup| {
            if input.property() == Some("secret") {
                return Ok(Value::from("***"));
            }
            sup.invoke(ctx, input)
        })
        .build()
        .unwrap()
}

// ============================================================================
// 1. The masking scenario: raw "abc" reads back as "***", others pass through
// ============================================================================

#[test]
fn test_masked_get_returns_sentinel() {
    let registry = TraitRegistry::new();
    registry.register_trait(base_trait()).unwrap();
    registry.register_trait(hidden_trait()).unwrap();
    registry.register_node_type("T", &["Base", "Hidden"]).unwrap();
    registry.seal().unwrap();

    let node = Arc::new(MemoryNode::new("n1"));
    node.set_raw("secret", Value::from("abc")).unwrap();

    let wrapped = entity::wrap(&registry, "T", node.clone()).unwrap();
    assert_eq!(wrapped.get("secret").unwrap(), Value::from("***"));

    // Unmasked names pass through Base's delegation to the raw field.
    wrapped.set("name", Value::from("Ada")).unwrap();
    assert_eq!(wrapped.get("name").unwrap(), Value::from("Ada"));
    // The raw field still holds the real value; only dispatch masks it.
    assert_eq!(node.get_raw("secret"), Some(Value::from("abc")));
}

// ============================================================================
// 2. Set-then-get round trip through the chains
// ============================================================================

#[test]
fn test_set_get_round_trip() {
    let registry = TraitRegistry::new();
    registry.register_trait(base_trait()).unwrap();
    registry.register_node_type("T", &["Base"]).unwrap();
    registry.seal().unwrap();

    let wrapped = entity::wrap(&registry, "T", Arc::new(MemoryNode::new("n1"))).unwrap();
    wrapped.set("name", Value::from("readme.txt")).unwrap();
    assert_eq!(wrapped.get("name").unwrap(), Value::from("readme.txt"));
}

// ============================================================================
// 3. Typed access: unknown names, read-only keys, type mismatches
// ============================================================================

#[test]
fn test_property_constraints() {
    let registry = TraitRegistry::new();
    registry
        .register_trait(
            TraitDefinition::builder("Typed")
                .property(PropertyKey::string("uuid").read_only())
                .property(PropertyKey::int("age"))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_node_type("T", &["Typed"]).unwrap();
    registry.seal().unwrap();

    let wrapped = entity::wrap(&registry, "T", Arc::new(MemoryNode::new("n1"))).unwrap();

    assert!(matches!(
        wrapped.get("nope"),
        Err(Error::NoSuchProperty { property, .. }) if property == "nope"
    ));
    assert!(matches!(
        wrapped.set("uuid", Value::from("x")),
        Err(Error::ReadOnlyProperty { .. })
    ));
    assert!(matches!(
        wrapped.set("age", Value::from("three")),
        Err(Error::TypeMismatch { .. })
    ));
    wrapped.set("age", Value::from(3)).unwrap();
}

// ============================================================================
// 4. Views: composition-ordered serialization, per-property dispatch
// ============================================================================

#[test]
fn test_view_serialization_order_and_masking() {
    let registry = TraitRegistry::new();
    registry.register_trait(base_trait()).unwrap();
    registry
        .register_trait(
            TraitDefinition::builder("Contact")
                .property(PropertyKey::string("email"))
                .view("public", ["email", "secret"])
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_trait(hidden_trait()).unwrap();
    registry.register_node_type("Person", &["Base", "Contact", "Hidden"]).unwrap();
    registry.seal().unwrap();

    let node = Arc::new(MemoryNode::new("n1"));
    node.set_raw("secret", Value::from("abc")).unwrap();
    let wrapped = entity::wrap(&registry, "Person", node).unwrap();
    wrapped.set("name", Value::from("Ada")).unwrap();
    wrapped.set("email", Value::from("ada@example.org")).unwrap();

    // Appended across traits, first-seen order preserved.
    let pairs = wrapped.view("public").unwrap();
    let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["name", "email", "secret"]);

    // Each view entry goes through get dispatch, so masking applies.
    assert_eq!(pairs[2].1, Value::from("***"));

    assert!(matches!(
        wrapped.view("admin"),
        Err(Error::NoSuchView { view, .. }) if view == "admin"
    ));

    let json = wrapped.core().view_json("public").unwrap();
    assert_eq!(json["name"], serde_json::json!("Ada"));
    assert_eq!(json["secret"], serde_json::json!("***"));
}

// ============================================================================
// 5. Validation: declared defaults materialize, required keys enforced
// ============================================================================

#[test]
fn test_validate_defaults_and_required() {
    let registry = TraitRegistry::new();
    registry
        .register_trait(
            TraitDefinition::builder("Strict")
                .property(PropertyKey::string("name").required())
                .property(PropertyKey::string("visibility").with_default("private"))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_node_type("T", &["Strict"]).unwrap();
    registry.seal().unwrap();

    let node = Arc::new(MemoryNode::new("n1"));
    let wrapped = entity::wrap(&registry, "T", node.clone()).unwrap();

    let err = wrapped.core().validate().unwrap_err();
    assert!(matches!(err, Error::RequiredProperty { property, .. } if property == "name"));

    wrapped.set("name", Value::from("x")).unwrap();
    wrapped.core().validate().unwrap();
    // The declared default was materialized into the raw field.
    assert_eq!(node.get_raw("visibility"), Some(Value::from("private")));
}

// ============================================================================
// 6. Creation and deletion flows fire the right events around the action
// ============================================================================

#[test]
fn test_create_and_delete_flows() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let registry = TraitRegistry::new();

    let tag = log.clone();
    registry
        .register_trait(
            TraitDefinition::builder("Audited")
                .property(PropertyKey::string("name"))
                .lifecycle(LifecycleEvent::BeforeCreate, {
                    let log = tag.clone();
                    move |_ctx, event| {
                        log.lock().push(event.label().to_string());
                        Ok(())
                    }
                })
                .lifecycle(LifecycleEvent::AfterCreate, {
                    let log = tag.clone();
                    move |_ctx, event| {
                        log.lock().push(event.label().to_string());
                        Ok(())
                    }
                })
                .lifecycle(LifecycleEvent::BeforeDelete, {
                    let log = tag.clone();
                    move |_ctx, event| {
                        log.lock().push(event.label().to_string());
                        Ok(())
                    }
                })
                .lifecycle(LifecycleEvent::AfterDelete, {
                    let log = tag.clone();
                    move |_ctx, event| {
                        log.lock().push(event.label().to_string());
                        Ok(())
                    }
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_node_type("T", &["Audited"]).unwrap();
    registry.seal().unwrap();

    let node = Arc::new(MemoryNode::new("n1"));
    let created = entity::create(&registry, "T", node.clone()).unwrap();
    assert_eq!(*log.lock(), vec!["beforeCreate", "afterCreate"]);

    log.lock().clear();
    entity::delete(created.as_ref(), || {
        node.mark_deleted();
        Ok(())
    })
    .unwrap();
    assert_eq!(*log.lock(), vec!["beforeDelete", "afterDelete"]);
    assert!(!node.exists());
}

// ============================================================================
// 7. Custom factory: specialized wrapper, last-declared factory wins
// ============================================================================

struct FileEntity {
    core: WrappedEntity,
}

impl FileEntity {
    fn file_name(&self) -> Option<String> {
        self.core.get("name").ok().and_then(|v| v.as_str().map(str::to_owned))
    }
}

impl Entity for FileEntity {
    fn core(&self) -> &WrappedEntity {
        &self.core
    }
}

#[test]
fn test_custom_factory_last_wins() {
    let registry = TraitRegistry::new();

    registry
        .register_trait(
            TraitDefinition::builder("Generic")
                .property(PropertyKey::string("name"))
                .factory(|core| Box::new(traitgraph::GenericEntity::new(core)))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_trait(
            TraitDefinition::builder("File")
                .factory(|core| Box::new(FileEntity { core }))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_node_type("File", &["Generic", "File"]).unwrap();
    registry.seal().unwrap();

    let node = Arc::new(MemoryNode::new("f1").with_property("name", "readme.txt"));
    let wrapped = entity::wrap(&registry, "File", node).unwrap();

    // The wrapper still exposes the shared surface regardless of subtype.
    assert_eq!(wrapped.get("name").unwrap(), Value::from("readme.txt"));
    assert_eq!(wrapped.type_name(), "File");
    assert!(wrapped.is_granted(Permission::Read, "alice").unwrap());
}

// ============================================================================
// 8. Script-backed lifecycle hooks go through the evaluator boundary
// ============================================================================

struct StubEvaluator {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl ScriptEvaluator for StubEvaluator {
    fn execute(
        &self,
        _entity: &dyn RawHandle,
        source: &str,
        event_label: &str,
    ) -> traitgraph::Result<Value> {
        if self.fail {
            return Err(Error::Script(format!("syntax error in {event_label}")));
        }
        self.calls.lock().push((source.to_string(), event_label.to_string()));
        Ok(Value::Null)
    }
}

#[test]
fn test_script_hook_labels_and_forwards() {
    let registry = TraitRegistry::new();
    registry
        .register_trait(
            TraitDefinition::builder("Scripted")
                .lifecycle_fn(
                    LifecycleEvent::AfterCreate,
                    traitgraph::script::script_hook("log.info('created')"),
                )
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_node_type("File", &["Scripted"]).unwrap();
    registry.seal().unwrap();

    let evaluator = Arc::new(StubEvaluator { calls: Mutex::new(Vec::new()), fail: false });
    let wrapped = entity::wrap_with_evaluator(
        &registry,
        "File",
        Arc::new(MemoryNode::new("f1")),
        evaluator.clone(),
    )
    .unwrap();

    wrapped.fire(LifecycleEvent::AfterCreate).unwrap();
    assert_eq!(
        *evaluator.calls.lock(),
        vec![("log.info('created')".to_string(), "File.afterCreate".to_string())]
    );

    // Without an evaluator bound, the hook fails as a script error.
    let bare = entity::wrap(&registry, "File", Arc::new(MemoryNode::new("f2"))).unwrap();
    assert!(matches!(
        bare.fire(LifecycleEvent::AfterCreate),
        Err(Error::Script(_))
    ));
}

#[test]
fn test_script_failure_propagates_verbatim() {
    let registry = TraitRegistry::new();
    registry
        .register_trait(
            TraitDefinition::builder("Scripted")
                .lifecycle_fn(
                    LifecycleEvent::BeforeModify,
                    traitgraph::script::script_hook("broken("),
                )
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_node_type("Doc", &["Scripted"]).unwrap();
    registry.seal().unwrap();

    let evaluator = Arc::new(StubEvaluator { calls: Mutex::new(Vec::new()), fail: true });
    let wrapped = entity::wrap_with_evaluator(
        &registry,
        "Doc",
        Arc::new(MemoryNode::new("d1")),
        evaluator,
    )
    .unwrap();

    let err = wrapped.fire(LifecycleEvent::BeforeModify).unwrap_err();
    assert!(matches!(err, Error::Script(msg) if msg.contains("Doc.beforeModify")));
}
