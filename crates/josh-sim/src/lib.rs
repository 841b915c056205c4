//! `josh-sim` — the substep scheduler for the Josh simulation engine.
//!
//! # Outer loop
//!
//! ```text
//! for t in start_step..=end_step:
//!   for substep in substep_order(t):   // usually "step" only; t==0 gets "init" first, the
//!                                      // final step gets "end" last
//!     for entity in alive_entities:    // every registered type, registration order, then
//!                                      // ascending local id
//!       shadow = ShadowingEntity(entity, registry, world_view)
//!       shadow.start_substep(substep)
//!       for i in entity.descriptor.indices():
//!         shadow.get(i)                // forces resolution/assignment if needed
//!       shadow.end_substep()
//!   commit_timestep()                  // freeze each entity, rotate current -> prior,
//!                                      // apply queued create/remove, emit snapshots
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                      |
//! |------------|---------------------------------------------------------------|
//! | `parallel` | `run_replicates_parallel` runs independent replicates on Rayon. |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use josh_sim::{NoopObserver, ReplicateBuilder};
//! use josh_handler::HandlerRegistry;
//!
//! let mut replicate = ReplicateBuilder::new(config, HandlerRegistry::new())
//!     .add_type(patch_descriptor, 100, geometry)
//!     .add_type(agent_descriptor, 20, vec![None; 20])
//!     .build();
//!
//! replicate.run(&mut NoopObserver, &CancellationToken::new(), None)?;
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod replicate;
pub mod world;

#[cfg(test)]
mod tests;

pub use builder::{ReplicateBuilder, TypeSeed};
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, Observer, StepSnapshot};
pub use replicate::{run_test_replicate, CancellationToken, Replicate};
pub use world::{TypeHandle, World, MAX_TYPES};

#[cfg(feature = "parallel")]
pub use replicate::run_replicates_parallel;
