//! `ShadowingEntity` — mediates every attribute read and write during one
//! open substep, enforcing memoized resolution and cycle detection.

use std::cell::RefCell;
use std::sync::Arc;

use josh_core::{AttributeIndex, EntityId, HandlerGroupId};
use josh_entity::AttributeStore;
use josh_handler::{HandlerError, HandlerRegistry, Scope};
use josh_value::{RealizedDistribution, Value};

use crate::error::{ResolveError, ResolveResult};

/// Cross-entity lookups a compiled expression may need beyond this entity's
/// own attributes: the patch containing an entity, the entities of a
/// collection on a patch, and the simulation-wide meta entity.
///
/// `josh-resolver` does not implement this trait — it has no notion of a
/// world with more than one entity type. `josh-sim` implements it over the
/// full set of per-type attribute stores and the spatial index.
pub trait WorldView {
    fn patch_of(&self, entity: EntityId) -> ResolveResult<EntityId>;
    fn entities_on(&self, patch: EntityId, kind: &str) -> ResolveResult<Vec<EntityId>>;
    fn simulation_meta(&self) -> ResolveResult<EntityId>;

    /// Every currently alive entity of the named type, irrespective of
    /// patch ownership — backs `Kind.attr` aggregation.
    fn entities_of_kind(&self, kind: &str) -> ResolveResult<Vec<EntityId>>;

    /// The prior (last completed timestep) value of `attribute` on
    /// `entity`, looked up by name against whatever entity type it belongs
    /// to. Cross-entity reads only ever observe `prior` — never `current`
    /// — so this never recurses into another entity's resolution and
    /// cannot introduce a cross-type cycle the single-entity `resolving[]`
    /// array has no way to detect.
    fn prior_attribute(&self, entity: EntityId, attribute: &str) -> ResolveResult<Option<Value>>;

    /// The value of `attribute` on `entity` for the substep currently open
    /// (`here.attr`, `here.Coll.attr`, `meta.attr`, `Kind.attr` all resolve
    /// against "this substep", per the path-resolution table). `entity`'s
    /// type is always different from the active one — the scheduler runs
    /// one type to completion before the next starts — so `current` has
    /// already been committed for the substep by the time this is called,
    /// and the read cannot recurse into a handler still being resolved.
    /// Falls back to `prior` when `current` is unresolved (e.g. `entity`
    /// has no handler for this substep and nothing has called `set` on it
    /// yet this substep).
    fn current_attribute(&self, entity: EntityId, attribute: &str) -> ResolveResult<Option<Value>>;
}

/// A `WorldView` for single-entity-type tests and standalone use: every
/// cross-entity query fails with [`ResolveError::InvalidPath`].
pub struct NoWorld;

impl WorldView for NoWorld {
    fn patch_of(&self, _entity: EntityId) -> ResolveResult<EntityId> {
        Err(ResolveError::InvalidPath("here".to_string()))
    }

    fn entities_on(&self, _patch: EntityId, kind: &str) -> ResolveResult<Vec<EntityId>> {
        Err(ResolveError::InvalidPath(format!("here.{kind}")))
    }

    fn simulation_meta(&self) -> ResolveResult<EntityId> {
        Err(ResolveError::InvalidPath("meta".to_string()))
    }

    fn entities_of_kind(&self, kind: &str) -> ResolveResult<Vec<EntityId>> {
        Err(ResolveError::InvalidPath(kind.to_string()))
    }

    fn prior_attribute(&self, _entity: EntityId, attribute: &str) -> ResolveResult<Option<Value>> {
        Err(ResolveError::InvalidPath(attribute.to_string()))
    }

    fn current_attribute(&self, _entity: EntityId, attribute: &str) -> ResolveResult<Option<Value>> {
        Err(ResolveError::InvalidPath(attribute.to_string()))
    }
}

/// Wraps one entity's row in an [`AttributeStore`] for the duration of an
/// open substep. Interior mutability (`RefCell`) lets this type
/// implement [`Scope`] (`&self` methods) while still memoizing resolution
/// state and committing values through the store — the same state a
/// `&mut self` API would hold, just reachable from recursive `get` calls
/// made while evaluating a handler expression's own `Scope` reads.
pub struct ShadowingEntity<'a> {
    store: RefCell<&'a mut AttributeStore>,
    entity: EntityId,
    registry: &'a HandlerRegistry,
    world: &'a dyn WorldView,
    resolving: RefCell<Vec<bool>>,
    resolved: RefCell<Vec<Option<Value>>>,
    /// The substep currently open, if any — `None` when no mutation window
    /// is open. Handler lookup is keyed by this name, so it
    /// must be known before any `get`/`set` call can proceed.
    substep: RefCell<Option<Arc<str>>>,
    /// The entity's current state name, if the program tracks one. `None`
    /// means only wildcard ("common handler") groups are consulted.
    state: RefCell<Option<Arc<str>>>,
}

impl<'a> ShadowingEntity<'a> {
    pub fn new(store: &'a mut AttributeStore, entity: EntityId, registry: &'a HandlerRegistry, world: &'a dyn WorldView) -> Self {
        let attrs = store.descriptor.attribute_count();
        Self {
            store: RefCell::new(store),
            entity,
            registry,
            world,
            resolving: RefCell::new(vec![false; attrs]),
            resolved: RefCell::new(vec![None; attrs]),
            substep: RefCell::new(None),
            state: RefCell::new(None),
        }
    }

    /// Open a mutation window for `substep`. Clears the scratch arrays in
    /// place (bulk `fill`, no reallocation) rather than rebuilding them.
    /// Handler lookup for every `get` call made before the matching
    /// `end_substep` is keyed by `substep`.
    pub fn start_substep(&self, substep: impl Into<Arc<str>>) {
        self.resolving.borrow_mut().iter_mut().for_each(|b| *b = false);
        self.resolved.borrow_mut().iter_mut().for_each(|v| *v = None);
        *self.substep.borrow_mut() = Some(substep.into());
    }

    /// Close the mutation window. Further `get`/`set` calls fail until the
    /// next `start_substep`.
    pub fn end_substep(&self) {
        *self.substep.borrow_mut() = None;
    }

    /// Set the entity's current state name, consulted by handler lookup
    /// alongside the open substep. `None` restricts lookup to wildcard
    /// ("common handler") groups.
    pub fn set_state(&self, state: Option<Arc<str>>) {
        *self.state.borrow_mut() = state;
    }

    pub fn world(&self) -> &'a dyn WorldView {
        self.world
    }

    /// Resolution protocol for attribute `i`:
    ///
    /// 1. Return the memoized value if `i` was already resolved this
    ///    substep.
    /// 2. Fail with [`ResolveError::CircularDependency`] if `i` is already
    ///    on the resolution stack.
    /// 3. Pass-through attributes resolve to `prior[i]` directly.
    /// 4. Otherwise try each handler group registered for `i`, in order;
    ///    the first one whose condition matches supplies the value.
    /// 5. With no handler group present or none matching, fall back to
    ///    `prior[i]` exactly as a pass-through attribute would.
    pub fn get(&self, i: AttributeIndex) -> ResolveResult<Option<Value>> {
        if let Some(value) = self.resolved.borrow()[i.index()].clone() {
            return Ok(Some(value));
        }
        if self.resolving.borrow()[i.index()] {
            return Err(ResolveError::CircularDependency(i));
        }
        let substep = self
            .substep
            .borrow()
            .clone()
            .ok_or_else(|| ResolveError::InvalidPath(format!("get({i:?}) outside an open substep")))?;
        let state = self.state.borrow().clone();

        self.resolving.borrow_mut()[i.index()] = true;

        let pass_through = self.store.borrow().descriptor.is_pass_through(i, &substep);
        let value = if pass_through {
            self.prior_value(i)
        } else {
            let groups: Vec<HandlerGroupId> = self
                .store
                .borrow()
                .descriptor
                .handler_groups_for(i, &substep, state.as_deref())
                .to_vec();
            let mut resolved = None;
            for group_id in groups {
                if let Some(v) = self.registry.get(group_id).resolve(self as &dyn Scope)? {
                    resolved = Some(v);
                    break;
                }
            }
            resolved.or_else(|| self.prior_value(i))
        };

        self.resolving.borrow_mut()[i.index()] = false;
        self.resolved.borrow_mut()[i.index()] = value.clone();
        if let Some(v) = &value {
            self.store.borrow_mut().set_current(self.entity, i, v.clone());
        }
        Ok(value)
    }

    fn prior_value(&self, i: AttributeIndex) -> Option<Value> {
        self.store.borrow().prior(self.entity, i).cloned()
    }

    /// Write protocol for `set(i, v)`: must be inside an
    /// open substep, sets both `current[i]` and the memoized `resolved[i]`.
    pub fn set(&self, i: AttributeIndex, value: Value) -> ResolveResult<()> {
        if self.substep.borrow().is_none() {
            return Err(ResolveError::InvalidPath(format!("set({i:?}) outside an open substep")));
        }
        self.store.borrow_mut().set_current(self.entity, i, value.clone());
        self.resolved.borrow_mut()[i.index()] = Some(value);
        Ok(())
    }
}

impl Scope for ShadowingEntity<'_> {
    fn current(&self, attribute: AttributeIndex) -> Result<Value, HandlerError> {
        match self.get(attribute) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(HandlerError::UnknownAttribute(attribute)),
            // `Scope`'s contract predates resolver-specific error kinds; a
            // cycle is reported through the one free-text variant available.
            Err(ResolveError::CircularDependency(a)) => {
                Err(HandlerError::Config(format!("circular dependency on attribute {a}")))
            }
            Err(ResolveError::InvalidPath(p)) => Err(HandlerError::Config(p)),
            Err(ResolveError::Handler(e)) => Err(e),
        }
    }

    fn prior(&self, attribute: AttributeIndex) -> Result<Value, HandlerError> {
        self.prior_value(attribute).ok_or(HandlerError::UnknownAttribute(attribute))
    }

    fn attribute_index(&self, name: &str) -> Option<AttributeIndex> {
        self.store.borrow().descriptor.attribute_index(name)
    }

    fn here(&self, attribute: &str) -> Result<Value, HandlerError> {
        let patch = self.world.patch_of(self.entity).map_err(resolve_to_handler)?;
        self.world
            .current_attribute(patch, attribute)
            .map_err(resolve_to_handler)?
            .ok_or_else(|| HandlerError::Config(format!("here.{attribute} has no value")))
    }

    fn here_collection(&self, collection: &str, attribute: &str) -> Result<Value, HandlerError> {
        let patch = self.world.patch_of(self.entity).map_err(resolve_to_handler)?;
        let members = self.world.entities_on(patch, collection).map_err(resolve_to_handler)?;
        collection_distribution(self.world, &members, attribute)
    }

    fn meta(&self, attribute: &str) -> Result<Value, HandlerError> {
        let sim = self.world.simulation_meta().map_err(resolve_to_handler)?;
        self.world
            .current_attribute(sim, attribute)
            .map_err(resolve_to_handler)?
            .ok_or_else(|| HandlerError::Config(format!("meta.{attribute} has no value")))
    }

    fn kind(&self, kind: &str, attribute: &str) -> Result<Value, HandlerError> {
        let entities = self.world.entities_of_kind(kind).map_err(resolve_to_handler)?;
        collection_distribution(self.world, &entities, attribute)
    }
}

/// Map a cross-entity `WorldView` failure onto the free-text `Scope` error
/// channel, same convention as `ShadowingEntity::current`.
fn resolve_to_handler(err: ResolveError) -> HandlerError {
    match err {
        ResolveError::CircularDependency(a) => HandlerError::Config(format!("circular dependency on attribute {a}")),
        ResolveError::InvalidPath(p) => HandlerError::Config(p),
        ResolveError::Handler(e) => e,
    }
}

/// Gather `attribute`'s current-substep value from each of `entities` into a
/// `RealizedDistribution`, widening every draw to `f64` — the
/// representation every query-layer and export consumer expects for
/// collection/kind aggregations. The resulting distribution carries the
/// units of the first entity that supplied a value (unitless if none did).
fn collection_distribution(world: &dyn WorldView, entities: &[EntityId], attribute: &str) -> Result<Value, HandlerError> {
    let mut draws = Vec::with_capacity(entities.len());
    let mut units = None;
    for &e in entities {
        if let Some(value) = world.current_attribute(e, attribute).map_err(resolve_to_handler)? {
            if units.is_none() {
                units = Some(value.units());
            }
            draws.push(value.as_f64()?);
        }
    }
    Ok(Value::Distribution(RealizedDistribution::from_draws(draws), units.unwrap_or_else(josh_units::Units::unitless)))
}
