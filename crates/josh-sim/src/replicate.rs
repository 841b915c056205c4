//! `Replicate` — drives one deterministic run of a program across its full
//! timestep range.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use josh_core::{EntityId, EntityKind, RunClock, RunConfig, Timestep};
use josh_resolver::ShadowingEntity;
use tracing::{debug, instrument, warn};

use crate::error::{SimError, SimResult};
use crate::observer::{Observer, StepSnapshot};
use crate::world::{TypeHandle, World};

/// A cooperative cancellation flag, cheaply cloned and shared across
/// threads. Polled by the scheduler between entities and between substeps
/// (spec's cancellation contract); never forcibly interrupts work already
/// in flight.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Which named substeps run at timestep `t`. `init` *replaces* `step` at the
/// very first timestep — it does not precede it — since `step` handlers
/// typically read `prior.*`, and no prior has been committed yet at
/// `start_step` (spec §8 scenario 6: `x.init = 10 count; x.step = prior.x *
/// 2 count` must emit `10, 20, 40, 80`, not fail on a missing prior read
/// from `step` running at the same timestep as `init`). `end` is appended
/// after `step` at the very last timestep. A run of exactly one step gets
/// `["init", "end"]`.
fn substep_order(t: Timestep, start: Timestep, end: Timestep) -> Vec<&'static str> {
    if t == start {
        let mut order = vec!["init"];
        if t == end {
            order.push("end");
        }
        return order;
    }
    let mut order = vec!["step"];
    if t == end {
        order.push("end");
    }
    order
}

/// One deterministic run of a program under a fixed seed: the substep
/// scheduler (C7) driving a [`World`] through its configured timestep range.
pub struct Replicate {
    world: World,
    config: RunConfig,
    clock: RunClock,
    pending_create: Vec<(TypeHandle, Option<EntityId>)>,
    pending_remove: Vec<EntityId>,
    /// Entities (global ids) created at the last `commit_timestep`, not yet
    /// given their `init` substep. Drained by `run_init_for_new_entities` at
    /// the top of the timestep they first become alive.
    newly_created: Vec<EntityId>,
}

impl Replicate {
    pub fn new(world: World, config: RunConfig) -> Self {
        let clock = config.make_clock();
        Self {
            world,
            config,
            clock,
            pending_create: Vec::new(),
            pending_remove: Vec::new(),
            newly_created: Vec::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clock(&self) -> &RunClock {
        &self.clock
    }

    /// Queue a new entity of `handle`'s type, owned by `owner` (a patch, if
    /// any). Applied at the next `commit_timestep`; the entity becomes
    /// alive starting the following step, per spec's create/remove
    /// lifecycle ("new entities first become alive in the next step").
    pub fn queue_create(&mut self, handle: TypeHandle, owner: Option<EntityId>) {
        self.pending_create.push((handle, owner));
    }

    /// Queue `entity` (a global id) for removal at the next
    /// `commit_timestep`.
    pub fn queue_remove(&mut self, entity: EntityId) {
        self.pending_remove.push(entity);
    }

    fn check_cancel(&self, cancel: &CancellationToken, deadline: Option<Instant>) -> SimResult<()> {
        if cancel.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(SimError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Run one named substep across every registered, non-external entity
    /// type's alive entities, in type-registration order then ascending
    /// local-id order — a fixed, documented ordering that keeps `here.*`
    /// and `meta.*` reads safely disjoint from the entity currently open
    /// for mutation (see `world.rs` module docs).
    #[instrument(skip(self, cancel), fields(step = step.0, substep))]
    fn run_substep(&mut self, step: Timestep, substep: &str, cancel: &CancellationToken, deadline: Option<Instant>) -> SimResult<()> {
        for handle in self.world.type_handles() {
            if self.world.kind_of(handle) == EntityKind::External {
                continue;
            }
            let alive = self.world.alive_entities(handle);
            for global in alive {
                self.check_cancel(cancel, deadline)?;
                let (_, local) = self.world.split(global);
                if let Err(err) = self.resolve_entity_substep(handle, local, substep) {
                    warn!(%err, "substep aborted mid-resolution");
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Open a substep for one entity, resolve every one of its attributes
    /// through the shadowing resolver, then close it. Shared by
    /// `run_substep` (every alive entity, the substep the scheduler is
    /// currently driving) and `run_init_for_new_entities` (just the
    /// entities created at the last commit, forced through `init` before
    /// their first ordinary substep).
    fn resolve_entity_substep(&mut self, handle: TypeHandle, local: EntityId, substep: &str) -> SimResult<()> {
        let (store, registry, view) = self.world.store_and_view(handle);
        let attrs = store.descriptor.attribute_count();
        let shadow = ShadowingEntity::new(store, local, registry, &view);
        shadow.start_substep(substep);
        for i in 0..attrs {
            let idx = josh_core::AttributeIndex(i as u16);
            if let Err(err) = shadow.get(idx) {
                shadow.end_substep();
                return Err(err.into());
            }
        }
        shadow.end_substep();
        Ok(())
    }

    /// Give every entity created at the last `commit_timestep` its `init`
    /// substep, then seed its `prior[]` from the values `init` just
    /// produced — before this timestep's ordinary substep(s) run for it.
    /// Per spec §4.7: "new entities first become alive in the next step;
    /// their `prior[]` is populated from their `init` substep values."
    fn run_init_for_new_entities(&mut self, cancel: &CancellationToken, deadline: Option<Instant>) -> SimResult<()> {
        let newly_created = std::mem::take(&mut self.newly_created);
        for global in newly_created {
            self.check_cancel(cancel, deadline)?;
            let (handle, local) = self.world.split(global);
            self.resolve_entity_substep(handle, local, "init")?;
            self.world.seed_prior_from_current(handle, local);
        }
        Ok(())
    }

    /// Freeze every alive entity's resolved state, rotate `current` into
    /// `prior` for every type, and apply queued create/remove requests.
    /// Returns the frozen snapshots in type-registration then ascending
    /// local-id order (spec's export ordering guarantee).
    fn commit_timestep(&mut self) -> Vec<StepSnapshot> {
        let mut frozen = Vec::new();
        for handle in self.world.type_handles() {
            if self.world.kind_of(handle) == EntityKind::External {
                continue;
            }
            let alive = self.world.alive_entities(handle);
            {
                let store = self.world.store(handle);
                for global in &alive {
                    let (_, local) = self.world.split(*global);
                    let entity = store.freeze_entity(local);
                    let position = self.world.geometry(handle, local).map(|shape| shape.center());
                    frozen.push(StepSnapshot { entity, position });
                }
            }
            self.world.store_mut(handle).freeze();
        }

        for (handle, owner) in self.pending_create.drain(..) {
            let global = self.world.push_entity(handle, owner);
            self.newly_created.push(global);
        }
        for entity in self.pending_remove.drain(..) {
            self.world.mark_removed(entity);
        }

        frozen
    }

    /// Drive the replicate from step 0 to its configured final step.
    /// Returns `Err(SimError::Cancelled)` / `Err(SimError::DeadlineExceeded)`
    /// if `cancel` fires or `deadline` passes; the in-progress substep is
    /// abandoned without commit in either case, per spec's cancellation
    /// contract.
    #[instrument(skip(self, observer, cancel), fields(total_steps = self.config.total_steps))]
    pub fn run(&mut self, observer: &mut dyn Observer, cancel: &CancellationToken, timeout: Option<Duration>) -> SimResult<()> {
        let start_step = Timestep::ZERO;
        let end_step = self.config.end_step();
        let deadline = timeout.map(|d| Instant::now() + d);

        observer.on_replicate_start(self.config.total_steps);

        let mut step = start_step;
        loop {
            self.check_cancel(cancel, deadline)?;
            observer.on_step_start(step);

            self.run_init_for_new_entities(cancel, deadline)?;

            for substep in substep_order(step, start_step, end_step) {
                self.run_substep(step, substep, cancel, deadline)?;
                observer.on_substep(step, substep);
            }

            let frozen = self.commit_timestep();
            debug!(step = step.0, entities = frozen.len(), "committed timestep");
            observer.on_step_end(step, &frozen);
            self.clock.advance_step();

            if step == end_step {
                break;
            }
            step = step.offset(1);
        }

        observer.on_replicate_end(end_step);
        Ok(())
    }
}

/// Run `replicate` to completion with no observer and no cancellation,
/// returning every frozen snapshot from every step in commit order. The
/// entry point a `test` CLI invocation would call.
pub fn run_test_replicate(mut replicate: Replicate) -> SimResult<Vec<StepSnapshot>> {
    struct Collector {
        snapshots: Vec<StepSnapshot>,
    }
    impl Observer for Collector {
        fn on_step_end(&mut self, _step: Timestep, frozen: &[StepSnapshot]) {
            self.snapshots.extend(frozen.iter().cloned());
        }
    }

    let mut collector = Collector { snapshots: Vec::new() };
    let cancel = CancellationToken::new();
    replicate.run(&mut collector, &cancel, None)?;
    Ok(collector.snapshots)
}

/// Run many independent replicates concurrently on Rayon's thread pool.
/// Share-nothing across replicates: each `Replicate` owns its own `World`
/// and shadowing state; only read-only process-wide caches (units,
/// spatial offset tables) are shared.
#[cfg(feature = "parallel")]
pub fn run_replicates_parallel<O, F>(mut replicates: Vec<Replicate>, make_observer: F) -> Vec<SimResult<()>>
where
    O: Observer,
    F: Fn(usize) -> O + Sync,
{
    use rayon::prelude::*;

    replicates
        .par_iter_mut()
        .enumerate()
        .map(|(i, replicate)| {
            let mut observer = make_observer(i);
            let cancel = CancellationToken::new();
            replicate.run(&mut observer, &cancel, None)
        })
        .collect()
}
