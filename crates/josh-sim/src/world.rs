//! `World` — the multi-entity-type container the scheduler drives.
//!
//! Every other crate in the workspace is scoped to a single `EntityType`: one
//! `AttributeStore`, one descriptor. The scheduler, though, has to resolve
//! attributes across several types in the same replicate (a patch, the
//! organisms living on it, disturbances, the lone simulation entity) and
//! needs one flat `EntityId` namespace to address all of them through
//! `josh_resolver::WorldView`. `World` is where that namespace lives — it is
//! deliberately not pushed down into `josh-entity`, which has no concept of
//! "more than one type".
//!
//! # Addressing scheme
//!
//! A global [`EntityId`] packs an 8-bit [`TypeHandle`] index into its high
//! byte and a 24-bit local index (the same index `AttributeStore` uses
//! internally) into the rest. `TypeHandle(0xff)` is never assigned — it
//! collides with `EntityId::INVALID` (all bits set) by construction, so the
//! sentinel stays meaningful across the packing.

use std::sync::Arc;

use josh_core::{EntityId, EntityKind};
use josh_entity::{AttributeStore, EntityRngs};
use josh_handler::HandlerRegistry;
use josh_resolver::{ResolveError, ResolveResult, WorldView};
use josh_spatial::{Shape, SpatialIndex};
use josh_value::Value;

/// `owner`/`members`/`by_name` sit on the `here.*`/`Kind.*` hot path, resolved
/// hundreds of thousands of times per step. Feature `fx-hash` swaps the
/// default SipHash for FxHash on these lookups.
#[cfg(not(feature = "fx-hash"))]
type FastMap<K, V> = std::collections::HashMap<K, V>;
#[cfg(feature = "fx-hash")]
type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;

const LOCAL_BITS: u32 = 24;
const LOCAL_MASK: u32 = (1 << LOCAL_BITS) - 1;

/// Maximum number of entity types one `World` can register. Index `0xff` is
/// reserved (it would otherwise alias `EntityId::INVALID`).
pub const MAX_TYPES: usize = 0xff;

/// A registered entity type's slot in a [`World`]. Opaque; obtained from
/// [`World::register_type`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeHandle(u8);

fn pack(type_index: u8, local: u32) -> EntityId {
    debug_assert!(local <= LOCAL_MASK, "local entity index overflowed 24 bits");
    EntityId(((type_index as u32) << LOCAL_BITS) | (local & LOCAL_MASK))
}

fn unpack(id: EntityId) -> (u8, u32) {
    ((id.0 >> LOCAL_BITS) as u8, id.0 & LOCAL_MASK)
}

/// One entity type's storage plus the bookkeeping the scheduler needs to
/// iterate and freeze it: its attribute store, RNGs, and optional per-entity
/// geometry (patches have geometry; most agents don't).
struct TypeSlot {
    name: Arc<str>,
    kind: EntityKind,
    store: AttributeStore,
    rngs: EntityRngs,
    geometry: Vec<Option<Shape>>,
    spatial: Option<SpatialIndex>,
}

/// A sentinel `TypeHandle` that never matches a registered type (handles run
/// `0..MAX_TYPES`, which stops short of `0xff`) — used by [`World::view`] to
/// mean "no type is currently borrowed mutably elsewhere".
const NO_ACTIVE_TYPE: TypeHandle = TypeHandle(0xff);

/// Read-only cross-entity bookkeeping: who owns whom, which entity is the
/// simulation singleton, and — for every type except `active` — read-only
/// access to its `AttributeStore` for `prior`-only cross-entity lookups
/// (`here.*`, `meta.*`, `Kind.*`). `active`'s own store is deliberately
/// excluded: the scheduler holds it mutably elsewhere in the same `World`
/// for the duration of this view, so a same-type cross-entity read during
/// that window is rejected rather than aliased.
struct Rosters<'a> {
    owner: &'a FastMap<EntityId, EntityId>,
    members: &'a FastMap<(EntityId, TypeHandle), Vec<EntityId>>,
    by_name: &'a FastMap<Arc<str>, TypeHandle>,
    simulation: Option<EntityId>,
    active: TypeHandle,
    others: Vec<(u8, &'a AttributeStore)>,
}

impl Rosters<'_> {
    fn store_for(&self, handle: TypeHandle) -> Option<&AttributeStore> {
        self.others.iter().find(|(i, _)| *i == handle.0).map(|(_, s)| *s)
    }
}

impl WorldView for Rosters<'_> {
    fn patch_of(&self, entity: EntityId) -> ResolveResult<EntityId> {
        self.owner
            .get(&entity)
            .copied()
            .ok_or_else(|| ResolveError::InvalidPath(format!("here (entity {entity:?} has no owning patch)")))
    }

    fn entities_on(&self, patch: EntityId, kind: &str) -> ResolveResult<Vec<EntityId>> {
        let handle = self
            .by_name
            .get(kind)
            .copied()
            .ok_or_else(|| ResolveError::InvalidPath(format!("here.{kind}")))?;
        Ok(self.members.get(&(patch, handle)).cloned().unwrap_or_default())
    }

    fn simulation_meta(&self) -> ResolveResult<EntityId> {
        self.simulation.ok_or_else(|| ResolveError::InvalidPath("meta".to_string()))
    }

    fn entities_of_kind(&self, kind: &str) -> ResolveResult<Vec<EntityId>> {
        let handle = self.by_name.get(kind).copied().ok_or_else(|| ResolveError::InvalidPath(kind.to_string()))?;
        if handle == self.active {
            return Err(ResolveError::InvalidPath(format!(
                "{kind}.* cannot be read while {kind}'s own substep is open for mutation"
            )));
        }
        let store = self.store_for(handle).ok_or_else(|| ResolveError::InvalidPath(kind.to_string()))?;
        Ok(store.alive_entity_ids().map(|local| pack(handle.0, local.index() as u32)).collect())
    }

    fn prior_attribute(&self, entity: EntityId, attribute: &str) -> ResolveResult<Option<Value>> {
        let (type_index, local) = unpack(entity);
        if type_index == self.active.0 {
            return Err(ResolveError::InvalidPath(format!(
                "attribute {attribute:?} on entity {entity:?} cannot be read cross-entity while its own type is open for mutation"
            )));
        }
        let store = self
            .store_for(TypeHandle(type_index))
            .ok_or_else(|| ResolveError::InvalidPath(format!("entity {entity:?} has no registered type")))?;
        let index = store
            .descriptor
            .attribute_index(attribute)
            .ok_or_else(|| ResolveError::InvalidPath(attribute.to_string()))?;
        Ok(store.prior(EntityId(local), index).cloned())
    }

    fn current_attribute(&self, entity: EntityId, attribute: &str) -> ResolveResult<Option<Value>> {
        let (type_index, local) = unpack(entity);
        if type_index == self.active.0 {
            return Err(ResolveError::InvalidPath(format!(
                "attribute {attribute:?} on entity {entity:?} cannot be read cross-entity while its own type is open for mutation"
            )));
        }
        let store = self
            .store_for(TypeHandle(type_index))
            .ok_or_else(|| ResolveError::InvalidPath(format!("entity {entity:?} has no registered type")))?;
        let index = store
            .descriptor
            .attribute_index(attribute)
            .ok_or_else(|| ResolveError::InvalidPath(attribute.to_string()))?;
        let local = EntityId(local);
        Ok(store.current(local, index).or_else(|| store.prior(local, index)).cloned())
    }
}

/// The full multi-type entity universe for one replicate.
///
/// Holds one [`AttributeStore`] + [`EntityRngs`] pair per registered entity
/// type, the handler registry shared by all of them, and the ownership
/// rosters [`WorldView`] reads from.
pub struct World {
    types: Vec<TypeSlot>,
    by_name: FastMap<Arc<str>, TypeHandle>,
    owner: FastMap<EntityId, EntityId>,
    members: FastMap<(EntityId, TypeHandle), Vec<EntityId>>,
    simulation: Option<EntityId>,
    registry: HandlerRegistry,
}

impl World {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            types: Vec::new(),
            by_name: FastMap::default(),
            owner: FastMap::default(),
            members: FastMap::default(),
            simulation: None,
            registry,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Register one entity type's store. The store's own descriptor
    /// supplies its name and local entity count; geometry starts empty for
    /// every instance (set it with [`World::set_geometry`]).
    ///
    /// # Panics
    /// Panics if `MAX_TYPES` entity types are already registered, or if the
    /// type's name was already registered.
    pub fn register_type(&mut self, store: AttributeStore, rngs: EntityRngs) -> TypeHandle {
        assert!(self.types.len() < MAX_TYPES, "World can register at most {MAX_TYPES} entity types");
        let name = store.descriptor.name.clone();
        let kind = store.descriptor.kind;
        let count = store.count;
        assert!(!self.by_name.contains_key(&name), "entity type {name:?} registered twice");

        let handle = TypeHandle(self.types.len() as u8);
        self.types.push(TypeSlot {
            name: name.clone(),
            kind,
            store,
            rngs,
            geometry: vec![None; count],
            spatial: None,
        });
        self.by_name.insert(name, handle);
        handle
    }

    pub fn type_handle(&self, name: &str) -> Option<TypeHandle> {
        self.by_name.get(name).copied()
    }

    pub fn kind_of(&self, handle: TypeHandle) -> EntityKind {
        self.types[handle.0 as usize].kind
    }

    pub fn name_of(&self, handle: TypeHandle) -> &Arc<str> {
        &self.types[handle.0 as usize].name
    }

    pub fn global_id(&self, handle: TypeHandle, local: EntityId) -> EntityId {
        pack(handle.0, local.index() as u32)
    }

    /// Split a global id back into its type and local-store id.
    pub fn split(&self, global: EntityId) -> (TypeHandle, EntityId) {
        let (type_index, local) = unpack(global);
        (TypeHandle(type_index), EntityId(local))
    }

    pub fn store(&self, handle: TypeHandle) -> &AttributeStore {
        &self.types[handle.0 as usize].store
    }

    pub fn store_mut(&mut self, handle: TypeHandle) -> &mut AttributeStore {
        &mut self.types[handle.0 as usize].store
    }

    pub fn rngs_mut(&mut self, handle: TypeHandle) -> &mut EntityRngs {
        &mut self.types[handle.0 as usize].rngs
    }

    /// Declare `entity` (the sole instance of the simulation meta type) as
    /// the target of `meta.*` paths.
    pub fn set_simulation(&mut self, global: EntityId) {
        self.simulation = Some(global);
    }

    pub fn set_geometry(&mut self, handle: TypeHandle, local: EntityId, shape: Shape) {
        let slot = &mut self.types[handle.0 as usize];
        slot.geometry[local.index()] = Some(shape);
        slot.spatial = None; // invalidate: rebuilt lazily on next query
    }

    pub fn geometry(&self, handle: TypeHandle, local: EntityId) -> Option<Shape> {
        self.types[handle.0 as usize].geometry[local.index()]
    }

    /// Lazily (re)build and return the spatial index over `handle`'s
    /// registered geometry. Patches are the usual caller; nothing prevents
    /// indexing any other type that carries geometry.
    pub fn spatial_index(&mut self, handle: TypeHandle) -> &mut SpatialIndex {
        let slot = &mut self.types[handle.0 as usize];
        if slot.spatial.is_none() {
            let mut index = SpatialIndex::new(1.0);
            for (i, shape) in slot.geometry.iter().enumerate() {
                if let Some(shape) = shape {
                    index.insert(EntityId(i as u32), *shape);
                }
            }
            slot.spatial = Some(index);
        }
        slot.spatial.as_mut().unwrap()
    }

    /// Record that `member` (of type `member_handle`) lives on `patch` (a
    /// global id), for `here.*` / `Kind.*` lookups. Idempotent only in the
    /// sense that calling it twice appends a duplicate entry — callers are
    /// expected to call it exactly once per entity at creation time.
    pub fn attach_owner(&mut self, member: EntityId, member_handle: TypeHandle, patch: EntityId) {
        self.owner.insert(member, patch);
        self.members.entry((patch, member_handle)).or_default().push(member);
    }

    /// Create one new entity of `handle`'s type, mid-replicate. Extends the
    /// store/RNGs/geometry together and, if `owner` is given, registers it
    /// in the roster. Returns the new entity's global id.
    pub fn push_entity(&mut self, handle: TypeHandle, owner: Option<EntityId>) -> EntityId {
        let slot = &mut self.types[handle.0 as usize];
        let local = slot.store.push_entity();
        let rng_local = slot.rngs.push();
        debug_assert_eq!(local, rng_local, "store and RNG pool desynchronized");
        slot.geometry.push(None);
        slot.spatial = None;

        let global = pack(handle.0, local.index() as u32);
        if let Some(patch) = owner {
            self.attach_owner(global, handle, patch);
        }
        global
    }

    pub fn mark_removed(&mut self, global: EntityId) {
        let (type_index, local) = unpack(global);
        self.types[type_index as usize].store.mark_removed(EntityId(local));
    }

    /// Seed `local`'s `prior[]` from its just-resolved `current[]` and clear
    /// `current[]`, without touching any other entity. Used once, right
    /// after a freshly-created entity's `init` substep, so its first
    /// ordinary `step` substep sees `prior.*` already populated.
    pub fn seed_prior_from_current(&mut self, handle: TypeHandle, local: EntityId) {
        self.types[handle.0 as usize].store.seed_prior_from_current(local);
    }

    /// Every currently-alive global id for `handle`, in ascending local-id
    /// order — the order the scheduler commits in.
    pub fn alive_entities(&self, handle: TypeHandle) -> Vec<EntityId> {
        self.types[handle.0 as usize]
            .store
            .alive_entity_ids()
            .map(|local| pack(handle.0, local.index() as u32))
            .collect()
    }

    pub fn type_handles(&self) -> Vec<TypeHandle> {
        (0..self.types.len()).map(|i| TypeHandle(i as u8)).collect()
    }

    /// A [`WorldView`] implementation that borrows only the ownership
    /// rosters, never any `AttributeStore` — safe to hold alongside a
    /// `&mut AttributeStore` borrowed from the same `World` via
    /// [`World::store_mut`], because the two halves never overlap in memory.
    pub fn view(&self) -> impl WorldView + '_ {
        Rosters {
            owner: &self.owner,
            members: &self.members,
            by_name: &self.by_name,
            simulation: self.simulation,
            active: NO_ACTIVE_TYPE,
            others: self.types.iter().enumerate().map(|(i, s)| (i as u8, &s.store)).collect(),
        }
    }

    /// The hot-path accessor the scheduler uses to open a `ShadowingEntity`:
    /// a mutable borrow of one type's store, alongside the handler registry
    /// and a `WorldView` over the rosters plus every *other* type's store
    /// (read-only, `prior`-only) — obtained via `split_at_mut` so the
    /// borrow checker can see `handle`'s store and the rest of `types`
    /// never overlap.
    pub fn store_and_view(&mut self, handle: TypeHandle) -> (&mut AttributeStore, &HandlerRegistry, impl WorldView + '_) {
        let World { types, owner, members, by_name, simulation, registry } = self;
        let idx = handle.0 as usize;
        let (head, tail) = types.split_at_mut(idx);
        let (slot, tail) = tail.split_first_mut().expect("valid type handle");

        let mut others: Vec<(u8, &AttributeStore)> = Vec::with_capacity(head.len() + tail.len());
        others.extend(head.iter().enumerate().map(|(i, s)| (i as u8, &s.store)));
        others.extend(tail.iter().enumerate().map(|(i, s)| ((idx + 1 + i) as u8, &s.store)));

        let view = Rosters {
            owner: &*owner,
            members: &*members,
            by_name: &*by_name,
            simulation: *simulation,
            active: handle,
            others,
        };
        (&mut slot.store, &*registry, view)
    }
}
