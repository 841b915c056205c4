//! Fluent builder for constructing a [`Replicate`].

use std::sync::Arc;

use josh_core::RunConfig;
use josh_entity::{AttributeStoreBuilder, EntityType};
use josh_handler::HandlerRegistry;
use josh_spatial::Shape;

use crate::world::{TypeHandle, World};
use crate::Replicate;

/// One entity type to seed into the [`World`] a [`Replicate`] will run.
pub struct TypeSeed {
    pub descriptor: Arc<EntityType>,
    pub count: usize,
    pub geometry: Vec<Option<Shape>>,
}

/// Fluent builder for [`Replicate`].
///
/// # Required inputs
///
/// - [`RunConfig`] — step range, seed, replicate count, …
/// - `HandlerRegistry` — the compiled program's handler groups
/// - at least one [`TypeSeed`] — the entity types populating the world
///
/// # Example
///
/// ```rust,ignore
/// let mut builder = ReplicateBuilder::new(config, registry);
/// let patches = builder.add_type(patch_descriptor, 100, geometry);
/// let agents = builder.add_type(agent_descriptor, 20, vec![None; 20]);
/// let replicate = builder.build()?;
/// ```
pub struct ReplicateBuilder {
    config: RunConfig,
    registry: Option<HandlerRegistry>,
    seeds: Vec<TypeSeed>,
    simulation_type: Option<Arc<str>>,
}

impl ReplicateBuilder {
    pub fn new(config: RunConfig, registry: HandlerRegistry) -> Self {
        Self {
            config,
            registry: Some(registry),
            seeds: Vec::new(),
            simulation_type: None,
        }
    }

    /// Register one entity type. `geometry` must be length `count`; use
    /// `vec![None; count]` for non-spatial types (agents, disturbances
    /// without footprints, the simulation entity).
    pub fn add_type(mut self, descriptor: Arc<EntityType>, count: usize, geometry: Vec<Option<Shape>>) -> Self {
        self.seeds.push(TypeSeed { descriptor, count, geometry });
        self
    }

    /// Name the entity type whose sole instance is the `meta.*` target.
    /// Must have been registered via [`add_type`](Self::add_type) with
    /// `count == 1`.
    pub fn simulation_type(mut self, name: impl Into<Arc<str>>) -> Self {
        self.simulation_type = Some(name.into());
        self
    }

    /// Build the `World`, registering every seeded type and wiring its
    /// geometry, and return a ready-to-run `Replicate`.
    pub fn build(self) -> Replicate {
        let registry = self.registry.expect("registry always present");
        let mut world = World::new(registry);
        let mut handles: Vec<(Arc<str>, TypeHandle)> = Vec::new();

        for seed in self.seeds {
            let seed_count = seed.count;
            let (store, rngs) = AttributeStoreBuilder::new(seed.descriptor.clone(), seed_count, self.config.seed).build();
            let name = seed.descriptor.name.clone();
            let handle = world.register_type(store, rngs);
            for (i, shape) in seed.geometry.into_iter().enumerate() {
                if let Some(shape) = shape {
                    world.set_geometry(handle, josh_core::EntityId(i as u32), shape);
                }
            }
            handles.push((name, handle));
        }

        if let Some(sim_name) = self.simulation_type {
            if let Some((_, handle)) = handles.iter().find(|(n, _)| **n == *sim_name) {
                let global = world.global_id(*handle, josh_core::EntityId(0));
                world.set_simulation(global);
            }
        }

        Replicate::new(world, self.config)
    }
}
