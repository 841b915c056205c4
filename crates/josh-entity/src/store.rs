//! Core entity storage: [`AttributeStore`] (current/prior attribute values)
//! and [`EntityRngs`] (per-entity RNG).
//!
//! # Why two structs?
//!
//! The parallel intent phase needs `&mut EntityRngs` (exclusive mutable
//! access to each entity's RNG) and `&AttributeStore` (shared read access to
//! world state) simultaneously. Rust's borrow checker forbids this if both
//! live inside a single struct. Keeping RNGs in a separate `EntityRngs`
//! struct resolves the conflict cleanly:
//!
//! ```ignore
//! // josh-sim tick loop (simplified):
//! let store: &AttributeStore = &sim.store;
//! let intents = sim.rngs.inner
//!     .par_iter_mut()
//!     .enumerate()
//!     .map(|(i, rng)| resolve(EntityId(i as u32), store, rng))
//!     .collect::<Vec<_>>();
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use josh_core::{AttributeIndex, EntityId, EntityRng};
use josh_value::Value;

use crate::descriptor::EntityType;
use crate::extension::ExtensionMap;

// ── FrozenEntity ──────────────────────────────────────────────────────────────

/// An immutable, attribute-only snapshot of one entity's resolved state at a
/// point in time. Carries no geometry or timestep — the export layer (which
/// knows about both) wraps this into a richer row before writing it out.
#[derive(Debug, Clone)]
pub struct FrozenEntity {
    pub entity: EntityId,
    pub type_name: Arc<str>,
    pub attributes: Vec<(Arc<str>, Value)>,
}

impl FrozenEntity {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.iter().find(|(n, _)| n.as_ref() == name).map(|(_, v)| v)
    }
}

// ── EntityRngs ────────────────────────────────────────────────────────────────

/// Per-entity deterministic RNG state, separated from [`AttributeStore`] to
/// enable simultaneous `&mut EntityRngs` + `&AttributeStore` borrows in the
/// parallel intent phase.
///
/// `EntityRngs` is `Send` (the inner `SmallRng` is `Send`) but intentionally
/// not `Sync` — per-entity RNG state must never be shared between threads.
/// Rayon's `par_iter_mut()` handles the exclusive-per-thread access pattern.
pub struct EntityRngs {
    pub inner: Vec<EntityRng>,
    global_seed: u64,
}

impl EntityRngs {
    /// Allocate and seed `count` per-entity RNGs from `global_seed`.
    pub(crate) fn new(count: usize, global_seed: u64) -> Self {
        let inner = (0..count as u32)
            .map(|i| EntityRng::new(global_seed, EntityId(i)))
            .collect();
        Self { inner, global_seed }
    }

    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> &mut EntityRng {
        &mut self.inner[entity.index()]
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Allocate and seed one more RNG, deterministically derived from the
    /// run's global seed exactly as if it had existed since the start of the
    /// run. Returns the id of the newly allocated slot.
    ///
    /// Used when an entity is created mid-replicate.
    pub fn push(&mut self) -> EntityId {
        let id = EntityId(self.inner.len() as u32);
        self.inner.push(EntityRng::new(self.global_seed, id));
        id
    }

    /// Return mutable references to the RNGs for a set of entities.
    ///
    /// Used by josh-sim's parallel intent phase: the set of entities to wake
    /// this substep is zipped with the returned refs and processed with Rayon.
    ///
    /// # Precondition (enforced by caller)
    ///
    /// `entities` must contain no duplicate `EntityId`s and all indices must
    /// be in-bounds. Both invariants hold for entities drawn from the
    /// scheduler's wake set, which is keyed by `EntityId` and never contains
    /// an id `>= entity_count`.
    pub fn get_many_mut(&mut self, entities: &[EntityId]) -> Vec<&mut EntityRng> {
        let ptr = self.inner.as_mut_ptr();
        // SAFETY: every `EntityId` in `entities` is unique (caller invariant)
        // and within bounds (store invariant), so each pointer aliases a
        // distinct element of `self.inner` and no two references overlap.
        entities
            .iter()
            .map(|e| unsafe { &mut *ptr.add(e.index()) })
            .collect()
    }
}

// ── AttributeStore ────────────────────────────────────────────────────────────

/// Per-entity current/prior attribute storage for one [`EntityType`].
///
/// `current[e][a]` and `prior[e][a]` hold the value of attribute `a` for
/// entity `e` in this substep and the previous one, respectively.
/// `current[e][a]` is `None` until the resolver computes it for the first
/// time this substep; handlers read `prior` for dependencies that have not
/// yet been resolved this substep to break circular references
/// deterministically (see `josh-resolver`).
///
/// `only_on_prior` marks attributes that were removed from the type's
/// schema after data referencing them was frozen, and therefore have a
/// last-known value in `prior` but can never again appear in `current`.
pub struct AttributeStore {
    pub descriptor: Arc<EntityType>,
    pub count: usize,

    current: Vec<Vec<Option<Value>>>,
    prior: Vec<Vec<Option<Value>>>,
    only_on_prior: HashSet<AttributeIndex>,
    /// `alive[e]` is `false` once `mark_removed` has been called for `e`.
    /// Removed slots are never reused or compacted — their index stays
    /// reserved so `EntityId`s remain stable for the life of the replicate.
    alive: Vec<bool>,

    extensions: ExtensionMap,
}

impl AttributeStore {
    pub(crate) fn new(descriptor: Arc<EntityType>, count: usize, extensions: ExtensionMap) -> Self {
        let attrs = descriptor.attribute_count();
        Self {
            descriptor,
            count,
            current: (0..count).map(|_| vec![None; attrs]).collect(),
            prior: (0..count).map(|_| vec![None; attrs]).collect(),
            only_on_prior: HashSet::new(),
            alive: vec![true; count],
            extensions,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterator over all `EntityId`s in ascending index order, including
    /// removed ones. The apply phase always commits in this order so runs
    /// are deterministic regardless of how many worker threads computed the
    /// intents.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.count as u32).map(EntityId)
    }

    /// Iterator over `EntityId`s that have not been removed.
    pub fn alive_entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(i, _)| EntityId(i as u32))
    }

    #[inline]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.alive[entity.index()]
    }

    /// Append one new entity slot, extending `current`/`prior` with empty
    /// attribute rows and the extension map with its registered defaults.
    /// Returns the newly allocated id, always `count - 1` after the call
    /// since ids are dense and append-only.
    pub fn push_entity(&mut self) -> EntityId {
        let attrs = self.descriptor.attribute_count();
        self.current.push(vec![None; attrs]);
        self.prior.push(vec![None; attrs]);
        self.alive.push(true);
        self.extensions.push_defaults();
        self.count += 1;
        EntityId((self.count - 1) as u32)
    }

    /// Mark `entity` removed. Its slot and id stay allocated (so past
    /// `EntityId`s referenced by historical exports remain valid) but it no
    /// longer appears in `alive_entity_ids`.
    pub fn mark_removed(&mut self, entity: EntityId) {
        self.alive[entity.index()] = false;
    }

    // ── Attribute access ──────────────────────────────────────────────────

    #[inline]
    pub fn current(&self, entity: EntityId, attribute: AttributeIndex) -> Option<&Value> {
        self.current[entity.index()][attribute.index()].as_ref()
    }

    #[inline]
    pub fn prior(&self, entity: EntityId, attribute: AttributeIndex) -> Option<&Value> {
        self.prior[entity.index()][attribute.index()].as_ref()
    }

    /// Record a resolved value for `attribute` on `entity` for the substep
    /// in progress. Called once per attribute per substep, from the apply
    /// phase or directly by the resolver for pass-through attributes.
    #[inline]
    pub fn set_current(&mut self, entity: EntityId, attribute: AttributeIndex, value: Value) {
        self.current[entity.index()][attribute.index()] = Some(value);
    }

    /// `true` if `attribute` has already been resolved for `entity` this
    /// substep — the resolver's first line of cycle defense.
    #[inline]
    pub fn has_current(&self, entity: EntityId, attribute: AttributeIndex) -> bool {
        self.current[entity.index()][attribute.index()].is_some()
    }

    /// Mark `attribute` as having meaning only in historical (`prior`) data
    /// — e.g. a schema migration dropped it mid-run. Queries against
    /// `current` for this attribute are no longer expected to return data.
    pub fn mark_only_on_prior(&mut self, attribute: AttributeIndex) {
        self.only_on_prior.insert(attribute);
    }

    pub fn is_only_on_prior(&self, attribute: AttributeIndex) -> bool {
        self.only_on_prior.contains(&attribute)
    }

    /// Take an attribute-only snapshot of `entity`'s current values, for the
    /// export layer to enrich with geometry/timestep and write out. Missing
    /// (never-resolved) attributes are simply absent from the map rather
    /// than an error — an export backend decides how to render that.
    pub fn freeze_entity(&self, entity: EntityId) -> FrozenEntity {
        let idx = entity.index();
        let attributes = self
            .descriptor
            .attribute_names()
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                self.current[idx][i]
                    .clone()
                    .map(|v| (name.clone(), v))
            })
            .collect();
        FrozenEntity {
            entity,
            type_name: self.descriptor.name.clone(),
            attributes,
        }
    }

    /// Copy `entity`'s just-resolved `current` row into `prior` and clear
    /// its `current` row, without touching any other entity or waiting for
    /// the next full `freeze`. Used for entities created mid-replicate:
    /// their `init` substep result becomes their `prior` before their first
    /// ordinary `step` substep runs, per the entity-creation lifecycle.
    pub fn seed_prior_from_current(&mut self, entity: EntityId) {
        let idx = entity.index();
        self.prior[idx] = self.current[idx].clone();
        self.current[idx].iter_mut().for_each(|slot| *slot = None);
    }

    /// Commit the end of a substep: `current` becomes `prior` for the next
    /// one, and `current` is reset to empty slots ready to be resolved
    /// again. Called once per substep by the scheduler, never mid-substep.
    pub fn freeze(&mut self) {
        std::mem::swap(&mut self.current, &mut self.prior);
        for row in &mut self.current {
            row.iter_mut().for_each(|slot| *slot = None);
        }
    }

    // ── Extension access ──────────────────────────────────────────────────

    pub fn extension<T: Default + Send + Sync + 'static>(&self) -> Option<&[T]> {
        self.extensions.get::<T>()
    }

    pub fn extension_mut<T: Default + Send + Sync + 'static>(&mut self) -> Option<&mut Vec<T>> {
        self.extensions.get_mut::<T>()
    }

    pub fn extensions(&self) -> &ExtensionMap {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionMap {
        &mut self.extensions
    }
}
