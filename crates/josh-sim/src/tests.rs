use std::sync::Arc;
use std::time::Duration;

use josh_core::{AttributeIndex, EntityId, EntityKind, RunConfig};
use josh_entity::EntityType;
use josh_handler::{
    AttributeRefExpression, ConstantExpression, Expression, Handler, HandlerError, HandlerGroup, HandlerRegistry, HandlerResult, Scope,
};
use josh_resolver::ResolveError;
use josh_units::Units;
use josh_value::{DecimalMode, DecimalValue, OperandCache, Value};

use crate::builder::ReplicateBuilder;
use crate::error::SimError;
use crate::observer::NoopObserver;
use crate::replicate::{run_test_replicate, CancellationToken};

fn config(total_steps: u64) -> RunConfig {
    RunConfig {
        start_unix_secs: 0,
        step_duration_secs: 1,
        substeps_per_step: 1,
        total_steps,
        seed: 1,
        replicates: 1,
        num_threads: None,
        output_interval_steps: 1,
    }
}

/// `prior.<attr> + 1` — the simplest handler body that recurses through
/// `Scope::prior` rather than `Scope::current`.
struct IncrementExpression(AttributeIndex);

impl Expression for IncrementExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        let prior = scope.prior(self.0)?;
        let cache = OperandCache::new();
        prior
            .add(&Value::Int64(1, Units::unitless()), &cache, DecimalMode::Float)
            .map_err(HandlerError::from)
    }
}

/// `prior.<attr> * 2` — doubles the previous substep's value.
struct DoublePriorExpression(AttributeIndex);

impl Expression for DoublePriorExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        let prior = scope.prior(self.0)?;
        let cache = OperandCache::new();
        prior
            .multiply(&Value::Int64(2, Units::unitless()), &cache, DecimalMode::Float)
            .map_err(HandlerError::from)
    }
}

/// `cast_unit(current.<attr>, target)`.
struct CastExpression(AttributeIndex, Units);

impl Expression for CastExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        let current = scope.current(self.0)?;
        Value::cast_unit(&current, self.1).map_err(HandlerError::from)
    }
}

/// `here.<attr>`.
struct HereExpression(&'static str);

impl Expression for HereExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        scope.here(self.0)
    }
}

/// `here.<collection>.<attr>`.
struct HereCollectionExpression(&'static str, &'static str);

impl Expression for HereCollectionExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        scope.here_collection(self.0, self.1)
    }
}

/// `<Kind>.<attr>`.
struct KindExpression(&'static str, &'static str);

impl Expression for KindExpression {
    fn evaluate(&self, scope: &dyn Scope) -> HandlerResult<Value> {
        scope.kind(self.0, self.1)
    }
}

#[test]
fn identity_step_increments_prior_each_step() {
    let mut descriptor = EntityType::new("Counter", vec!["age".into()]);
    let age = descriptor.attribute_index("age").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(IncrementExpression(age))));
    let group_id = registry.insert(group);
    // Registered for every substep so the attribute never falls back to a
    // bare pass-through copy of last commit's value mid-step.
    for substep in ["init", "step", "end"] {
        descriptor.add_handler_group(age, substep, None, group_id);
    }
    let descriptor = Arc::new(descriptor);

    let mut replicate = ReplicateBuilder::new(config(4), registry).add_type(descriptor, 1, vec![None]).build();

    let handle = replicate.world().type_handle("Counter").unwrap();
    replicate.world_mut().store_mut(handle).set_current(EntityId(0), age, Value::Int64(0, Units::unitless()));
    replicate.world_mut().store_mut(handle).freeze();

    let frozen = run_test_replicate(replicate).unwrap();
    assert_eq!(frozen.len(), 4);
    for (i, snapshot) in frozen.iter().enumerate() {
        assert_eq!(snapshot.entity.attribute("age").unwrap(), &Value::Int64(i as i64 + 1, Units::unitless()));
    }
}

#[test]
fn unit_conversion_casts_between_compatible_units() {
    let mut descriptor = EntityType::new("Rod", vec!["length_cm".into(), "length_m".into()]);
    let length_cm = descriptor.attribute_index("length_cm").unwrap();
    let length_m = descriptor.attribute_index("length_m").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(CastExpression(length_cm, Units::meters()))));
    let group_id = registry.insert(group);
    descriptor.add_handler_group(length_m, "step", None, group_id);
    let descriptor = Arc::new(descriptor);

    // `config(1)` would run only `["init", "end"]` (no first-timestep `step`,
    // see `substep_order`) and never invoke a "step"-only handler, so this
    // needs a second timestep for "step" to actually run.
    let mut replicate = ReplicateBuilder::new(config(2), registry).add_type(descriptor, 1, vec![None]).build();

    let handle = replicate.world().type_handle("Rod").unwrap();
    replicate
        .world_mut()
        .store_mut(handle)
        .set_current(EntityId(0), length_cm, Value::Int64(250, Units::parse("cm").unwrap()));
    replicate.world_mut().store_mut(handle).freeze();

    let frozen = run_test_replicate(replicate).unwrap();
    let converted = frozen[1].entity.attribute("length_m").unwrap();
    assert_eq!(*converted, Value::Decimal(DecimalValue::F64(2.5), Units::meters()));
}

#[test]
fn init_substep_seeds_the_value_step_then_doubles_each_timestep() {
    let mut descriptor = EntityType::new("Cell", vec!["x".into()]);
    let x = descriptor.attribute_index("x").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut init_group = HandlerGroup::new();
    init_group.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(10, Units::unitless())))));
    let init_group_id = registry.insert(init_group);
    descriptor.add_handler_group(x, "init", None, init_group_id);

    let mut step_group = HandlerGroup::new();
    step_group.push(Handler::unconditional(Box::new(DoublePriorExpression(x))));
    let step_group_id = registry.insert(step_group);
    // Registered for "step" and "end" both: at the final timestep both
    // substeps run (see `substep_order`), and leaving `x` pass-through on
    // "end" would have it fall back to the *stale* prior (last commit's
    // value, not what "step" just computed this timestep) and silently
    // revert the final value.
    descriptor.add_handler_group(x, "step", None, step_group_id);
    descriptor.add_handler_group(x, "end", None, step_group_id);
    let descriptor = Arc::new(descriptor);

    let replicate = ReplicateBuilder::new(config(4), registry).add_type(descriptor, 1, vec![None]).build();

    let frozen = run_test_replicate(replicate).unwrap();
    assert_eq!(frozen.len(), 4);
    let expected = [10, 20, 40, 80];
    for (snapshot, want) in frozen.iter().zip(expected) {
        assert_eq!(snapshot.entity.attribute("x").unwrap(), &Value::Int64(want, Units::unitless()));
    }
}

#[test]
fn cycle_detection_reports_circular_dependency() {
    let mut descriptor = EntityType::new("Pair", vec!["a".into(), "b".into()]);
    let a = descriptor.attribute_index("a").unwrap();
    let b = descriptor.attribute_index("b").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut group_a = HandlerGroup::new();
    group_a.push(Handler::unconditional(Box::new(AttributeRefExpression("b".to_string()))));
    let group_a_id = registry.insert(group_a);

    let mut group_b = HandlerGroup::new();
    group_b.push(Handler::unconditional(Box::new(AttributeRefExpression("a".to_string()))));
    let group_b_id = registry.insert(group_b);

    descriptor.add_handler_group(a, "step", None, group_a_id);
    descriptor.add_handler_group(b, "step", None, group_b_id);
    let descriptor = Arc::new(descriptor);

    // `config(1)` only ever runs `["init", "end"]` (see `substep_order`),
    // never "step", so this needs a second timestep to exercise "step".
    let replicate = ReplicateBuilder::new(config(2), registry).add_type(descriptor, 1, vec![None]).build();

    // The cycle is raised as a raw `CircularDependency` deep inside the
    // recursive `get(a) -> handler -> get(b) -> handler -> get(a)` chain,
    // but it crosses a `Scope::current` boundary (the handler expressions
    // read each other through `Scope`, not direct `get` calls) on its way
    // back out, and `Scope::current` folds every `ResolveError` it sees
    // into `HandlerError`'s one free-text variant — so by the time it
    // reaches here it is a `Handler`-wrapped error, not the bare variant.
    match run_test_replicate(replicate) {
        Err(SimError::Resolve(ResolveError::Handler(err))) => {
            assert!(err.to_string().contains("circular dependency"), "unexpected message: {err}");
        }
        other => panic!("expected a circular dependency error, got {other:?}"),
    }
}

#[test]
fn entities_created_mid_run_become_alive_the_following_step() {
    let mut descriptor = EntityType::new("Seed", vec!["gen".into()]);
    let gen = descriptor.attribute_index("gen").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut init_group = HandlerGroup::new();
    init_group.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(100, Units::unitless())))));
    let init_group_id = registry.insert(init_group);
    descriptor.add_handler_group(gen, "init", None, init_group_id);

    let mut step_group = HandlerGroup::new();
    step_group.push(Handler::unconditional(Box::new(IncrementExpression(gen))));
    let step_group_id = registry.insert(step_group);
    descriptor.add_handler_group(gen, "step", None, step_group_id);
    descriptor.add_handler_group(gen, "end", None, step_group_id);
    let descriptor = Arc::new(descriptor);

    let mut replicate = ReplicateBuilder::new(config(3), registry).add_type(descriptor, 1, vec![None]).build();

    let handle = replicate.world().type_handle("Seed").unwrap();
    replicate.queue_create(handle, None);

    let frozen = run_test_replicate(replicate).unwrap();
    // step 0: the one original entity; steps 1-2: the original plus the
    // entity created at step 0's commit.
    assert_eq!(frozen.len(), 1 + 2 + 2);
    assert_eq!(frozen[0].entity.attribute("gen").unwrap(), &Value::Int64(100, Units::unitless()));

    // The entity created mid-run must have gotten its own `init` substep
    // (seeding `gen = 100`) before its first `step`, exactly like the
    // original entity — not start out with an empty `prior[]`.
    let at_step1: Vec<_> = frozen[1..3].iter().map(|s| s.entity.attribute("gen").unwrap().clone()).collect();
    assert_eq!(at_step1, vec![Value::Int64(101, Units::unitless()); 2]);
    let at_step2: Vec<_> = frozen[3..5].iter().map(|s| s.entity.attribute("gen").unwrap().clone()).collect();
    assert_eq!(at_step2, vec![Value::Int64(102, Units::unitless()); 2]);
}

#[test]
fn entities_removed_mid_run_stop_appearing() {
    let descriptor = Arc::new(EntityType::new("Seed", vec![]));
    let registry = HandlerRegistry::new();

    let mut replicate = ReplicateBuilder::new(config(2), registry).add_type(descriptor, 2, vec![None, None]).build();

    let handle = replicate.world().type_handle("Seed").unwrap();
    let doomed = replicate.world().global_id(handle, EntityId(1));
    replicate.queue_remove(doomed);

    let frozen = run_test_replicate(replicate).unwrap();
    // step 0: both entities; step 1: only the survivor.
    assert_eq!(frozen.len(), 2 + 1);
}

#[test]
fn cancellation_token_aborts_before_the_first_step() {
    let descriptor = Arc::new(EntityType::new("Seed", vec![]));
    let registry = HandlerRegistry::new();
    let mut replicate = ReplicateBuilder::new(config(5), registry).add_type(descriptor, 1, vec![None]).build();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut observer = NoopObserver;

    match replicate.run(&mut observer, &cancel, None) {
        Err(SimError::Cancelled) => {}
        other => panic!("expected Cancelled, got {other:?}"),
    }
}

#[test]
fn deadline_exceeded_aborts_the_run() {
    let descriptor = Arc::new(EntityType::new("Seed", vec![]));
    let registry = HandlerRegistry::new();
    let mut replicate = ReplicateBuilder::new(config(5), registry).add_type(descriptor, 1, vec![None]).build();

    let cancel = CancellationToken::new();
    let mut observer = NoopObserver;

    match replicate.run(&mut observer, &cancel, Some(Duration::from_secs(0))) {
        Err(SimError::DeadlineExceeded) => {}
        other => panic!("expected DeadlineExceeded, got {other:?}"),
    }
}

#[test]
fn here_reads_the_owning_patchs_current_value_this_substep() {
    // The patch's own `elevation` handler rewrites it to 999 every "step".
    // If `here.elevation` read `prior` (last commit's 50, per the old,
    // wrong behavior) instead of `current` (this substep's 999, per the
    // path-resolution table), this test would see 50.
    let mut patch_descriptor = EntityType::with_kind("Patch", EntityKind::Patch, vec!["elevation".into()]);
    let elevation = patch_descriptor.attribute_index("elevation").unwrap();
    let mut elevation_group = HandlerGroup::new();
    elevation_group.push(Handler::unconditional(Box::new(ConstantExpression(Value::Int64(999, Units::unitless())))));
    let mut registry = HandlerRegistry::new();
    let elevation_group_id = registry.insert(elevation_group);
    // Registered for "step" and "end" both — the final timestep runs both,
    // and leaving "end" pass-through would fall back to the stale prior
    // (50) and silently revert the value `here.elevation` just observed.
    patch_descriptor.add_handler_group(elevation, "step", None, elevation_group_id);
    patch_descriptor.add_handler_group(elevation, "end", None, elevation_group_id);
    let patch_descriptor = Arc::new(patch_descriptor);

    let mut agent_descriptor = EntityType::new("Organism", vec!["ground_level".into()]);
    let ground_level = agent_descriptor.attribute_index("ground_level").unwrap();
    let mut ground_group = HandlerGroup::new();
    ground_group.push(Handler::unconditional(Box::new(HereExpression("elevation"))));
    let ground_group_id = registry.insert(ground_group);
    agent_descriptor.add_handler_group(ground_level, "step", None, ground_group_id);
    let agent_descriptor = Arc::new(agent_descriptor);

    // `config(1)` only ever runs `["init", "end"]` (see `substep_order`),
    // never "step", so this needs a second timestep to exercise "step".
    let mut replicate = ReplicateBuilder::new(config(2), registry)
        .add_type(patch_descriptor, 1, vec![None])
        .add_type(agent_descriptor, 1, vec![None])
        .build();

    let patch_handle = replicate.world().type_handle("Patch").unwrap();
    let agent_handle = replicate.world().type_handle("Organism").unwrap();
    let patch_global = replicate.world().global_id(patch_handle, EntityId(0));
    let agent_global = replicate.world().global_id(agent_handle, EntityId(0));
    replicate.world_mut().attach_owner(agent_global, agent_handle, patch_global);

    replicate.world_mut().store_mut(patch_handle).set_current(EntityId(0), elevation, Value::Int64(50, Units::unitless()));
    replicate.world_mut().store_mut(patch_handle).freeze();

    let frozen = run_test_replicate(replicate).unwrap();
    let agent = frozen.iter().rev().find(|f| f.entity.type_name.as_ref() == "Organism").unwrap();
    assert_eq!(agent.entity.attribute("ground_level").unwrap(), &Value::Int64(999, Units::unitless()));
}

#[test]
fn here_collection_and_kind_aggregate_current_values_into_a_distribution() {
    let mut patch_descriptor = EntityType::with_kind("Patch", EntityKind::Patch, vec!["coll_avg".into(), "kind_avg".into()]);
    let coll_avg = patch_descriptor.attribute_index("coll_avg").unwrap();
    let kind_avg = patch_descriptor.attribute_index("kind_avg").unwrap();

    let organism_descriptor = Arc::new(EntityType::new("Organism", vec!["mass".into()]));
    let mass = organism_descriptor.attribute_index("mass").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut coll_group = HandlerGroup::new();
    coll_group.push(Handler::unconditional(Box::new(HereCollectionExpression("Organism", "mass"))));
    let coll_group_id = registry.insert(coll_group);
    patch_descriptor.add_handler_group(coll_avg, "step", None, coll_group_id);

    let mut kind_group = HandlerGroup::new();
    kind_group.push(Handler::unconditional(Box::new(KindExpression("Organism", "mass"))));
    let kind_group_id = registry.insert(kind_group);
    patch_descriptor.add_handler_group(kind_avg, "step", None, kind_group_id);
    let patch_descriptor = Arc::new(patch_descriptor);

    // `config(1)` only ever runs `["init", "end"]` (see `substep_order`),
    // never "step", so this needs a second timestep to exercise "step".
    let mut replicate = ReplicateBuilder::new(config(2), registry)
        .add_type(patch_descriptor, 1, vec![None])
        .add_type(organism_descriptor, 2, vec![None, None])
        .build();

    let patch_handle = replicate.world().type_handle("Patch").unwrap();
    let organism_handle = replicate.world().type_handle("Organism").unwrap();
    let patch_global = replicate.world().global_id(patch_handle, EntityId(0));
    for local in [0u32, 1] {
        let global = replicate.world().global_id(organism_handle, EntityId(local));
        replicate.world_mut().attach_owner(global, organism_handle, patch_global);
    }

    replicate.world_mut().store_mut(organism_handle).set_current(EntityId(0), mass, Value::Int64(10, Units::unitless()));
    replicate.world_mut().store_mut(organism_handle).set_current(EntityId(1), mass, Value::Int64(20, Units::unitless()));
    replicate.world_mut().store_mut(organism_handle).freeze();

    let frozen = run_test_replicate(replicate).unwrap();
    let patch = frozen.iter().rev().find(|f| f.entity.type_name.as_ref() == "Patch").unwrap();

    for attribute in ["coll_avg", "kind_avg"] {
        match patch.entity.attribute(attribute).unwrap() {
            Value::Distribution(d, _) => {
                assert_eq!(d.draws(), &[10.0, 20.0]);
                assert_eq!(d.mean(), 15.0);
            }
            other => panic!("expected {attribute} to be a Distribution, got {other:?}"),
        }
    }
}

#[test]
fn kind_read_of_its_own_active_type_is_rejected() {
    let mut descriptor = EntityType::new("Organism", vec!["mass".into(), "self_kind_avg".into()]);
    let self_kind_avg = descriptor.attribute_index("self_kind_avg").unwrap();

    let mut registry = HandlerRegistry::new();
    let mut group = HandlerGroup::new();
    group.push(Handler::unconditional(Box::new(KindExpression("Organism", "mass"))));
    let group_id = registry.insert(group);
    descriptor.add_handler_group(self_kind_avg, "step", None, group_id);
    let descriptor = Arc::new(descriptor);

    // `config(1)` only ever runs `["init", "end"]` (see `substep_order`),
    // never "step", so this needs a second timestep to exercise "step".
    let replicate = ReplicateBuilder::new(config(2), registry).add_type(descriptor, 2, vec![None, None]).build();

    match run_test_replicate(replicate) {
        Err(SimError::Resolve(ResolveError::Handler(_))) => {}
        other => panic!("expected a Handler-wrapped rejection, got {other:?}"),
    }
}

#[cfg(feature = "parallel")]
#[test]
fn run_replicates_parallel_runs_every_replicate_independently() {
    use crate::replicate::run_replicates_parallel;

    fn counter_replicate() -> crate::Replicate {
        let mut descriptor = EntityType::new("Counter", vec!["age".into()]);
        let age = descriptor.attribute_index("age").unwrap();

        let mut registry = HandlerRegistry::new();
        let mut group = HandlerGroup::new();
        group.push(Handler::unconditional(Box::new(IncrementExpression(age))));
        let group_id = registry.insert(group);
        for substep in ["init", "step", "end"] {
            descriptor.add_handler_group(age, substep, None, group_id);
        }
        let descriptor = Arc::new(descriptor);

        let mut replicate = ReplicateBuilder::new(config(2), registry).add_type(descriptor, 1, vec![None]).build();
        let handle = replicate.world().type_handle("Counter").unwrap();
        replicate.world_mut().store_mut(handle).set_current(EntityId(0), age, Value::Int64(0, Units::unitless()));
        replicate.world_mut().store_mut(handle).freeze();
        replicate
    }

    let replicates: Vec<_> = (0..3).map(|_| counter_replicate()).collect();
    let results = run_replicates_parallel(replicates, |_| NoopObserver);
    assert_eq!(results.len(), 3);
    for result in results {
        assert!(result.is_ok());
    }
}
