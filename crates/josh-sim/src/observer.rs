//! Scheduler observer trait for progress reporting and export wiring.

use josh_core::Timestep;
use josh_entity::FrozenEntity;

/// One entity's frozen attribute state plus the grid position it was
/// committed at, if it carries geometry. `FrozenEntity` itself stays
/// attribute-only (`josh-entity` has no notion of geometry); `World` pairs
/// each entity with its registered `Shape`'s center when it hands a step's
/// snapshots to the observer, so `position.x`/`position.y` are never lost
/// between the scheduler and the export layer.
#[derive(Debug, Clone)]
pub struct StepSnapshot {
    pub entity: FrozenEntity,
    pub position: Option<(f64, f64)>,
}

/// Callbacks invoked by [`crate::Replicate::run`] at key points in the
/// timestep/substep loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about. `josh-export`'s bridge from a committed
/// snapshot stream to an `ExportSink` is one concrete implementor; tests and
/// callers that don't need progress callbacks use [`NoopObserver`].
pub trait Observer {
    /// Called once before the first step runs.
    fn on_replicate_start(&mut self, _total_steps: u64) {}

    /// Called at the start of each step, before its substeps run.
    fn on_step_start(&mut self, _step: Timestep) {}

    /// Called after each substep completes for every entity, across every
    /// registered entity type.
    fn on_substep(&mut self, _step: Timestep, _substep: &str) {}

    /// Called once per step after `commit_timestep`, with every entity
    /// frozen this step (across every entity type, in registration order).
    fn on_step_end(&mut self, _step: Timestep, _frozen: &[StepSnapshot]) {}

    /// Called once after the replicate reaches its terminal step (or is
    /// cancelled — check the `Result` from `run` to tell the two apart).
    fn on_replicate_end(&mut self, _final_step: Timestep) {}
}

/// An [`Observer`] that does nothing. Use when you need to call `run` but
/// don't want progress callbacks.
pub struct NoopObserver;

impl Observer for NoopObserver {}
