use std::sync::Arc;

use josh_core::{AttributeIndex, EntityId};
use josh_entity::{AttributeStoreBuilder, EntityType};
use josh_handler::{
    AttributeRefExpression, ConstantExpression, Expression, Handler, HandlerError, HandlerGroup, HandlerRegistry,
    HandlerResult, Scope,
};
use josh_units::Units;
use josh_value::{DecimalMode, OperandCache, Value};

use crate::error::ResolveError;
use crate::shadow::{NoWorld, ShadowingEntity, WorldView};

fn grass_descriptor() -> Arc<EntityType> {
    Arc::new(EntityType::new(
        "Grass",
        vec!["height".into(), "growth_rate".into(), "alias".into()],
    ))
}

/// A handler body that doubles another attribute's current value, exercising
/// the resolver's recursive `get` path rather than just a constant body.
struct DoubleExpression(AttributeIndex);

impl Expression for DoubleExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        let base = scope.current(self.0)?;
        let cache = OperandCache::new();
        base.multiply(&Value::Int64(2, Units::unitless()), &cache, DecimalMode::Float)
            .map_err(HandlerError::from)
    }
}

/// A handler body that reads its own attribute, inducing a cycle when it is
/// registered as that attribute's own handler.
struct SelfReferentialExpression(AttributeIndex);

impl Expression for SelfReferentialExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        scope.current(self.0)
    }
}

#[test]
fn pass_through_attribute_resolves_to_prior_value() {
    let descriptor = grass_descriptor();
    let height = descriptor.attribute_index("height").unwrap();
    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    store.set_current(entity, height, Value::Int64(10, Units::unitless()));
    store.freeze();

    let registry = HandlerRegistry::new();
    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");

    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(10, Units::unitless())));
}

#[test]
fn matching_handler_supplies_value_and_is_memoized() {
    let mut descriptor = EntityType::new("Grass", vec!["height".into()]);
    let height = descriptor.attribute_index("height").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(99, Units::unitless())))));
    let group_id = registry.insert(group);
    descriptor.add_handler_group(height, "grow", None, group_id);
    let descriptor = Arc::new(descriptor);

    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    store.set_current(entity, height, Value::Int64(10, Units::unitless()));
    store.freeze();

    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");

    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(99, Units::unitless())));
    // second call must hit the memo rather than re-evaluate the handler.
    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(99, Units::unitless())));
}

#[test]
fn no_matching_handler_falls_back_to_prior() {
    let mut descriptor = EntityType::new("Grass", vec!["height".into()]);
    let height = descriptor.attribute_index("height").unwrap();
    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::conditional(
        Box::new(ConstantExpression(Value::Bool(false))),
        Box::new(ConstantExpression(Value::Int64(99, Units::unitless()))),
    ));
    let group_id = registry.insert(group);
    descriptor.add_handler_group(height, "grow", None, group_id);
    let descriptor = Arc::new(descriptor);

    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    store.set_current(entity, height, Value::Int64(7, Units::unitless()));
    store.freeze();

    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");

    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(7, Units::unitless())));
}

#[test]
fn state_specific_handler_wins_over_wildcard() {
    let mut descriptor = EntityType::new("Grass", vec!["height".into()]);
    let height = descriptor.attribute_index("height").unwrap();
    let mut registry = HandlerRegistry::new();

    let mut wildcard = HandlerGroup::new();
    wildcard.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(1, Units::unitless())))));
    let wildcard_id = registry.insert(wildcard);

    let mut dormant = HandlerGroup::new();
    dormant.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(0, Units::unitless())))));
    let dormant_id = registry.insert(dormant);

    descriptor.add_handler_group(height, "grow", None, wildcard_id);
    descriptor.add_handler_group(height, "grow", Some("dormant".into()), dormant_id);
    let descriptor = Arc::new(descriptor);

    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    store.freeze();

    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");
    shadow.set_state(Some("dormant".into()));

    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(0, Units::unitless())));
}

#[test]
fn unknown_state_falls_back_to_wildcard_handler() {
    let mut descriptor = EntityType::new("Grass", vec!["height".into()]);
    let height = descriptor.attribute_index("height").unwrap();
    let mut registry = HandlerRegistry::new();

    let mut wildcard = HandlerGroup::new();
    wildcard.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(1, Units::unitless())))));
    let wildcard_id = registry.insert(wildcard);
    descriptor.add_handler_group(height, "grow", None, wildcard_id);
    let descriptor = Arc::new(descriptor);

    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    store.freeze();

    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");
    shadow.set_state(Some("flowering".into()));

    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(1, Units::unitless())));
}

#[test]
fn circular_dependency_is_detected() {
    let mut descriptor = EntityType::new("Grass", vec!["height".into()]);
    let height = descriptor.attribute_index("height").unwrap();
    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(SelfReferentialExpression(height))));
    let group_id = registry.insert(group);
    descriptor.add_handler_group(height, "grow", None, group_id);
    let descriptor = Arc::new(descriptor);

    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");

    match shadow.get(height) {
        Err(ResolveError::CircularDependency(i)) => assert_eq!(i, height),
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[test]
fn handler_reading_another_attribute_recurses_through_resolver() {
    let mut descriptor = EntityType::new("Grass", vec!["height".into(), "growth_rate".into()]);
    let height = descriptor.attribute_index("height").unwrap();
    let growth_rate = descriptor.attribute_index("growth_rate").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(DoubleExpression(growth_rate))));
    let group_id = registry.insert(group);
    descriptor.add_handler_group(height, "grow", None, group_id);
    let descriptor = Arc::new(descriptor);

    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    store.set_current(entity, growth_rate, Value::Int64(4, Units::unitless()));
    store.freeze();

    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");

    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(8, Units::unitless())));
}

#[test]
fn set_outside_open_substep_fails() {
    let descriptor = grass_descriptor();
    let height = descriptor.attribute_index("height").unwrap();
    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    let registry = HandlerRegistry::new();
    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);

    match shadow.set(height, Value::Int64(1, Units::unitless())) {
        Err(ResolveError::InvalidPath(_)) => {}
        other => panic!("expected InvalidPath, got {other:?}"),
    }
}

#[test]
fn set_then_get_returns_the_written_value_without_resolving() {
    let descriptor = grass_descriptor();
    let height = descriptor.attribute_index("height").unwrap();
    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    let registry = HandlerRegistry::new();
    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");

    shadow.set(height, Value::Int64(42, Units::unitless())).unwrap();
    assert_eq!(shadow.get(height).unwrap(), Some(Value::Int64(42, Units::unitless())));
}

#[test]
fn get_outside_open_substep_fails() {
    let descriptor = grass_descriptor();
    let height = descriptor.attribute_index("height").unwrap();
    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    let registry = HandlerRegistry::new();
    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);

    match shadow.get(height) {
        Err(ResolveError::InvalidPath(_)) => {}
        other => panic!("expected InvalidPath, got {other:?}"),
    }
}

#[test]
fn ending_and_restarting_a_substep_clears_the_memo() {
    let descriptor = grass_descriptor();
    let height = descriptor.attribute_index("height").unwrap();
    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    let registry = HandlerRegistry::new();
    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);

    shadow.start_substep("grow");
    shadow.set(height, Value::Int64(1, Units::unitless())).unwrap();
    shadow.end_substep();

    shadow.start_substep("decay");
    // the memo from "grow" must not leak into "decay" — with no prior value
    // set and no handler registered for "decay", height resolves to None.
    assert_eq!(shadow.get(height).unwrap(), None);
}

#[test]
fn no_world_rejects_every_cross_entity_path() {
    let world = NoWorld;
    assert!(world.patch_of(EntityId(0)).is_err());
    assert!(world.entities_on(EntityId(0), "Tree").is_err());
    assert!(world.simulation_meta().is_err());
}

#[test]
fn path_parsing_resolves_this_entity_forms() {
    let descriptor = grass_descriptor();
    let height = descriptor.attribute_index("height").unwrap();

    assert_eq!(crate::parse("height", &descriptor).unwrap(), crate::PathForm::This(height));
    assert_eq!(crate::parse("prior.height", &descriptor).unwrap(), crate::PathForm::Prior(height));
    assert_eq!(crate::parse("current.height", &descriptor).unwrap(), crate::PathForm::Current(height));
}

#[test]
fn path_parsing_leaves_cross_entity_forms_string_keyed() {
    let descriptor = grass_descriptor();
    assert_eq!(
        crate::parse("here.elevation", &descriptor).unwrap(),
        crate::PathForm::Here("elevation".to_string())
    );
    assert_eq!(
        crate::parse("here.Tree.count", &descriptor).unwrap(),
        crate::PathForm::HereCollection("Tree".to_string(), "count".to_string())
    );
    assert_eq!(
        crate::parse("meta.step", &descriptor).unwrap(),
        crate::PathForm::Meta("step".to_string())
    );
}

#[test]
fn path_parsing_rejects_malformed_paths() {
    let descriptor = grass_descriptor();
    assert!(crate::parse("a.b.c.d", &descriptor).is_err());
}

#[test]
fn attribute_ref_expression_reads_by_name() {
    let mut descriptor = EntityType::new("Grass", vec!["height".into(), "alias".into()]);
    let height = descriptor.attribute_index("height").unwrap();
    let alias = descriptor.attribute_index("alias").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(AttributeRefExpression("height".to_string()))));
    let group_id = registry.insert(group);
    descriptor.add_handler_group(alias, "grow", None, group_id);
    let descriptor = Arc::new(descriptor);

    let (mut store, _rngs) = AttributeStoreBuilder::new(descriptor, 1, 0).build();
    let entity = EntityId(0);
    store.set_current(entity, height, Value::Int64(3, Units::unitless()));
    store.freeze();

    let world = NoWorld;
    let shadow = ShadowingEntity::new(&mut store, entity, &registry, &world);
    shadow.start_substep("grow");

    assert_eq!(shadow.get(alias).unwrap(), Some(Value::Int64(3, Units::unitless())));
}
