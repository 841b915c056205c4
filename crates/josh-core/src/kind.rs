//! Entity kind discriminant.
//!
//! `EntityKind` tags which broad role an [`crate::EntityId`] plays in a
//! replicate — orthogonal to its `EntityType` descriptor, which only
//! describes its attribute schema. Two entity types can share a kind (e.g.
//! "Wolf" and "Sheep" are both `Agent`), and a program is free to define any
//! number of types per kind.

/// Which broad role an entity plays in the world.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    /// The single, program-wide meta entity addressed by `meta.*` paths.
    Simulation,
    /// A grid cell. Carries geometry and backs the spatial index.
    Patch,
    /// A mobile or stationary organism owned by a patch.
    Agent,
    /// A disturbance event (fire, flood, ...) with a footprint and lifetime.
    Disturbance,
    /// Addressed only through `josh-external::ExternalData`; never appears
    /// in `alive_entities()` and owns no attribute store of its own.
    External,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Simulation => "simulation",
            EntityKind::Patch => "patch",
            EntityKind::Agent => "agent",
            EntityKind::Disturbance => "disturbance",
            EntityKind::External => "external",
        };
        write!(f, "{s}")
    }
}
