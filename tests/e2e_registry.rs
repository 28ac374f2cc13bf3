//! End-to-end tests for registry lifecycle and composition determinism.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use traitgraph::{
    compose, entity, EntityKind, Error, MemoryNode, OpKind, PropertyKey, TraitDefinition,
    TraitRegistry, Value,
};

// ============================================================================
// 1. Two-phase module load: traits from every module, then compositions
// ============================================================================

#[test]
fn test_two_phase_module_load() {
    let registry = TraitRegistry::new();

    // Phase 1: every module registers its traits, in arbitrary order.
    registry
        .register_trait(
            TraitDefinition::builder("Timestamped")
                .property(PropertyKey::datetime("created_at"))
                .property(PropertyKey::datetime("modified_at"))
                .view("meta", ["created_at", "modified_at"])
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_trait(
            TraitDefinition::builder("Base")
                .property(PropertyKey::string("name").indexed())
                .view("public", ["name"])
                .build()
                .unwrap(),
        )
        .unwrap();

    // Phase 2: compositions may reference traits from any module.
    registry.register_node_type("File", &["Base", "Timestamped"]).unwrap();
    registry.register_node_type("Folder", &["Base", "Timestamped"]).unwrap();
    registry.register_relationship_type("CONTAINS", &["Timestamped"]).unwrap();
    registry.seal().unwrap();

    let file = registry.get("File").unwrap();
    assert_eq!(file.kind(), EntityKind::Node);
    assert_eq!(file.trait_names(), &["Base", "Timestamped"]);
    assert_eq!(file.key_count(), 3);

    let contains = registry.get("CONTAINS").unwrap();
    assert_eq!(contains.kind(), EntityKind::Relationship);

    assert!(matches!(registry.get("Nope"), Err(Error::UnknownType(_))));
}

// ============================================================================
// 2. Sealing discipline
// ============================================================================

#[test]
fn test_sealed_registry_is_read_only() {
    let registry = TraitRegistry::new();
    registry
        .register_trait(TraitDefinition::builder("Base").build().unwrap())
        .unwrap();
    registry.register_node_type("T", &["Base"]).unwrap();

    registry.seal().unwrap();
    registry.seal().unwrap(); // idempotent

    assert!(matches!(
        registry.register_trait(TraitDefinition::builder("Late").build().unwrap()),
        Err(Error::RegistrySealed)
    ));

    // Identical content does not make re-registration acceptable.
    let registry2 = TraitRegistry::new();
    registry2
        .register_trait(TraitDefinition::builder("Base").build().unwrap())
        .unwrap();
    assert!(matches!(
        registry2.register_trait(TraitDefinition::builder("Base").build().unwrap()),
        Err(Error::DuplicateTrait(_))
    ));
}

// ============================================================================
// 3. Composing twice yields element-wise identical results
// ============================================================================

#[test]
fn test_composition_deterministic_across_registries() {
    let build = || {
        let registry = TraitRegistry::new();
        registry
            .register_trait(
                TraitDefinition::builder("A")
                    .property(PropertyKey::string("id"))
                    .property(PropertyKey::string("name"))
                    .view("public", ["id", "name"])
                    .on(OpKind::GetProperty, |ctx, input, sup| sup.invoke(ctx, input))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register_trait(
                TraitDefinition::builder("B")
                    .property(PropertyKey::string("id").unique())
                    .view("public", ["owner"])
                    .on(OpKind::GetProperty, |ctx, input, sup| sup.invoke(ctx, input))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry.register_node_type("T", &["A", "B"]).unwrap();
        registry.seal().unwrap();
        registry.get("T").unwrap()
    };

    let x = build();
    let y = build();

    assert_eq!(x.trait_names(), y.trait_names());
    assert_eq!(x.key_count(), y.key_count());
    assert_eq!(x.view("public"), y.view("public"));
    assert_eq!(
        x.chain(OpKind::GetProperty).trait_names(),
        y.chain(OpKind::GetProperty).trait_names()
    );
    assert_eq!(x.shadowed_keys(), y.shadowed_keys());
    // B's refinement of "id" won in both.
    assert!(x.key("id").unwrap().unique);
    assert!(y.key("id").unwrap().unique);
}

// ============================================================================
// 4. Wrappers over the same handle are interchangeable
// ============================================================================

#[test]
fn test_wrappers_are_interchangeable() {
    let registry = TraitRegistry::new();
    registry
        .register_trait(
            TraitDefinition::builder("Base")
                .property(PropertyKey::string("name"))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry.register_node_type("T", &["Base"]).unwrap();
    registry.seal().unwrap();

    let node = Arc::new(MemoryNode::new("n1"));
    let a = entity::wrap(&registry, "T", node.clone()).unwrap();
    let b = entity::wrap(&registry, "T", node).unwrap();

    a.set("name", Value::from("shared")).unwrap();
    assert_eq!(b.get("name").unwrap(), Value::from("shared"));
    assert_eq!(a.uuid(), b.uuid());
}

// ============================================================================
// 5. Property: key merge is last-wins for any overlap, order-stable
// ============================================================================

fn key_names() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-e]", 1..6).prop_map(|mut v: Vec<String>| {
        v.sort();
        v.dedup();
        v
    })
}

proptest! {
    #[test]
    fn prop_key_merge_last_wins(first in key_names(), second in key_names()) {
        let a = Arc::new({
            let mut b = TraitDefinition::builder("A");
            for name in &first {
                b = b.property(PropertyKey::string(name));
            }
            b.build().unwrap()
        });
        let b = Arc::new({
            let mut builder = TraitDefinition::builder("B");
            for name in &second {
                builder = builder.property(PropertyKey::int(name));
            }
            builder.build().unwrap()
        });

        let td = compose("T", EntityKind::Node, &[a, b]);

        // Union of names, no more, no less.
        let mut expected: Vec<&String> = first.iter().chain(second.iter()).collect();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(td.key_count(), expected.len());

        // Every key declared by B (the later trait) carries B's type.
        for name in &second {
            prop_assert_eq!(td.key(name).unwrap().value_type, traitgraph::ValueType::Int);
        }
        // Keys only A declared keep A's type.
        for name in first.iter().filter(|n| !second.contains(n)) {
            prop_assert_eq!(td.key(name).unwrap().value_type, traitgraph::ValueType::String);
        }

        // The recorded shadow diagnostics are exactly the overlap.
        let overlap = first.iter().filter(|n| second.contains(n)).count();
        prop_assert_eq!(td.shadowed_keys().len(), overlap);
    }
}
