use std::sync::Arc;

use josh_core::{AttributeIndex, EntityId};
use josh_units::Units;
use josh_value::Value;

use crate::{AttributeStoreBuilder, EntityType};

fn patch_descriptor() -> Arc<EntityType> {
    Arc::new(EntityType::new(
        "Patch",
        vec!["elevation".into(), "moisture".into()],
    ))
}

#[test]
fn new_defaults_kind_to_agent() {
    let d = EntityType::new("Wolf", vec!["energy".into()]);
    assert_eq!(d.kind, josh_core::EntityKind::Agent);
}

#[test]
fn with_kind_sets_an_explicit_kind() {
    let d = EntityType::with_kind("Cell", josh_core::EntityKind::Patch, vec!["elevation".into()]);
    assert_eq!(d.kind, josh_core::EntityKind::Patch);
}

#[test]
fn attribute_names_are_sorted_and_deduped() {
    let d = EntityType::new("Patch", vec!["b".into(), "a".into(), "a".into()]);
    assert_eq!(d.attribute_count(), 2);
    assert_eq!(d.attribute_index("a"), Some(AttributeIndex(0)));
    assert_eq!(d.attribute_index("b"), Some(AttributeIndex(1)));
}

#[test]
fn unhandled_attribute_defaults_to_pass_through() {
    let d = patch_descriptor();
    let elevation = d.attribute_index("elevation").unwrap();
    assert!(d.is_pass_through(elevation, "grow"));
}

#[test]
fn adding_a_handler_group_clears_pass_through_for_its_substep_only() {
    let mut d = EntityType::new("Patch", vec!["elevation".into()]);
    let elevation = d.attribute_index("elevation").unwrap();
    d.add_handler_group(elevation, "grow", None, josh_core::HandlerGroupId(0));
    assert!(!d.is_pass_through(elevation, "grow"));
    assert!(d.is_pass_through(elevation, "erode"));
    assert_eq!(d.handler_groups_for(elevation, "grow", None), &[josh_core::HandlerGroupId(0)]);
}

#[test]
fn state_specific_group_falls_back_to_wildcard() {
    let mut d = EntityType::new("Patch", vec!["elevation".into()]);
    let elevation = d.attribute_index("elevation").unwrap();
    d.add_handler_group(elevation, "grow", None, josh_core::HandlerGroupId(0));
    d.add_handler_group(elevation, "grow", Some("flooded".into()), josh_core::HandlerGroupId(1));

    assert_eq!(d.handler_groups_for(elevation, "grow", Some("flooded")), &[josh_core::HandlerGroupId(1)]);
    assert_eq!(d.handler_groups_for(elevation, "grow", Some("dry")), &[josh_core::HandlerGroupId(0)]);
    assert_eq!(d.handler_groups_for(elevation, "grow", None), &[josh_core::HandlerGroupId(0)]);
}

#[test]
fn builder_allocates_empty_current_and_prior_slots() {
    let (store, rngs) = AttributeStoreBuilder::new(patch_descriptor(), 10, 42).build();
    assert_eq!(store.count, 10);
    assert_eq!(rngs.len(), 10);
    let elevation = store.descriptor.attribute_index("elevation").unwrap();
    assert!(store.current(EntityId(0), elevation).is_none());
    assert!(store.prior(EntityId(0), elevation).is_none());
}

#[test]
fn set_current_then_freeze_moves_values_to_prior() {
    let (mut store, _rngs) = AttributeStoreBuilder::new(patch_descriptor(), 1, 0).build();
    let elevation = store.descriptor.attribute_index("elevation").unwrap();
    let entity = EntityId(0);

    store.set_current(entity, elevation, Value::Int64(100, Units::unitless()));
    assert!(store.has_current(entity, elevation));

    store.freeze();

    assert_eq!(store.prior(entity, elevation), Some(&Value::Int64(100, Units::unitless())));
    assert!(store.current(entity, elevation).is_none());
    assert!(!store.has_current(entity, elevation));
}

#[test]
fn only_on_prior_marking_is_queryable() {
    let (mut store, _rngs) = AttributeStoreBuilder::new(patch_descriptor(), 1, 0).build();
    let moisture = store.descriptor.attribute_index("moisture").unwrap();
    assert!(!store.is_only_on_prior(moisture));
    store.mark_only_on_prior(moisture);
    assert!(store.is_only_on_prior(moisture));
}

#[test]
fn entity_ids_are_ascending() {
    let (store, _rngs) = AttributeStoreBuilder::new(patch_descriptor(), 5, 0).build();
    let ids: Vec<_> = store.entity_ids().collect();
    assert_eq!(ids, vec![EntityId(0), EntityId(1), EntityId(2), EntityId(3), EntityId(4)]);
}

#[test]
fn extension_registration_and_access() {
    #[derive(Default, Clone, Copy, PartialEq, Debug)]
    struct BucketCoord(i32, i32);

    let (store, _rngs) = AttributeStoreBuilder::new(patch_descriptor(), 3, 0)
        .register_extension::<BucketCoord>()
        .build();

    let slice = store.extension::<BucketCoord>().unwrap();
    assert_eq!(slice.len(), 3);
    assert_eq!(slice[0], BucketCoord::default());
}

#[test]
fn get_many_mut_returns_distinct_rngs() {
    let (_store, mut rngs) = AttributeStoreBuilder::new(patch_descriptor(), 4, 7).build();
    let refs = rngs.get_many_mut(&[EntityId(0), EntityId(2), EntityId(3)]);
    assert_eq!(refs.len(), 3);
}

#[test]
fn all_entities_start_alive() {
    let (store, _rngs) = AttributeStoreBuilder::new(patch_descriptor(), 3, 0).build();
    assert_eq!(store.alive_entity_ids().count(), 3);
    assert!(store.is_alive(EntityId(1)));
}

#[test]
fn mark_removed_excludes_from_alive_but_keeps_the_id() {
    let (mut store, _rngs) = AttributeStoreBuilder::new(patch_descriptor(), 3, 0).build();
    store.mark_removed(EntityId(1));
    assert!(!store.is_alive(EntityId(1)));
    assert_eq!(
        store.alive_entity_ids().collect::<Vec<_>>(),
        vec![EntityId(0), EntityId(2)]
    );
    // still present in the full id list, just not alive
    assert_eq!(store.entity_ids().count(), 3);
}

#[test]
fn push_entity_extends_store_and_rngs_together() {
    let (mut store, mut rngs) = AttributeStoreBuilder::new(patch_descriptor(), 2, 11).build();
    let new_id = store.push_entity();
    let rng_id = rngs.push();
    assert_eq!(new_id, EntityId(2));
    assert_eq!(rng_id, EntityId(2));
    assert_eq!(store.count, 3);
    assert!(store.is_alive(new_id));
    let elevation = store.descriptor.attribute_index("elevation").unwrap();
    assert!(store.current(new_id, elevation).is_none());
}

#[test]
fn freeze_entity_snapshots_resolved_attributes_only() {
    let (mut store, _rngs) = AttributeStoreBuilder::new(patch_descriptor(), 1, 0).build();
    let entity = EntityId(0);
    let elevation = store.descriptor.attribute_index("elevation").unwrap();
    store.set_current(entity, elevation, Value::Int64(7, Units::unitless()));

    let frozen = store.freeze_entity(entity);
    assert_eq!(frozen.entity, entity);
    assert_eq!(frozen.type_name.as_ref(), "Patch");
    assert_eq!(frozen.attribute("elevation"), Some(&Value::Int64(7, Units::unitless())));
    assert_eq!(frozen.attribute("moisture"), None);
}
