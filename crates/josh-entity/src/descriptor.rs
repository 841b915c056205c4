//! `EntityType` descriptor: the immutable, shared metadata every instance of
//! a type points back to.
//!
//! One `EntityType` is built once per program load and shared (`Arc`) across
//! every entity instance and every replicate — it never changes during a
//! run, so replicates running in parallel can read it without locking.

use std::collections::HashMap;
use std::sync::Arc;

use josh_core::{AttributeIndex, EntityKind, HandlerGroupId};

/// Handler groups are addressed by the attribute they resolve and the
/// substep they fire in, optionally narrowed to an entity state. A `None`
/// state is the wildcard ("common handler") entry consulted when no
/// state-specific group exists for that `(attribute, substep)` pair.
type HandlerKey = (AttributeIndex, Arc<str>, Option<Arc<str>>);

/// Everything the store needs to know about one entity type: its attribute
/// names, handler groups, and precomputed lookup caches.
#[derive(Debug)]
pub struct EntityType {
    pub name: Arc<str>,
    /// The broad role entities of this type play. Used by the scheduler to
    /// decide membership in `meta`/spatial-index/create-remove bookkeeping.
    pub kind: EntityKind,
    /// Attribute names in sorted order; `AttributeIndex(i)` names
    /// `attribute_names[i]`.
    attribute_names: Vec<Arc<str>>,
    name_to_index: HashMap<Arc<str>, AttributeIndex>,
    /// Handler groups keyed by `(attribute, substep, state)`, in
    /// declaration order within each group.
    handlers: HashMap<HandlerKey, Vec<HandlerGroupId>>,
    /// Per-substep cache: attributes with no handler at all, in any state,
    /// for a given substep pass straight through from `prior` to `current`
    /// without going through the resolver. Maintained incrementally as
    /// handler groups are registered.
    pass_through: HashMap<Arc<str>, Vec<bool>>,
}

impl EntityType {
    /// Build a descriptor from an unsorted list of attribute names, defaulting
    /// its kind to [`EntityKind::Agent`]. Attribute names are sorted so that
    /// `AttributeIndex` ordering is stable and independent of program source
    /// order.
    pub fn new(name: impl Into<Arc<str>>, attribute_names: Vec<Arc<str>>) -> Self {
        Self::with_kind(name, EntityKind::Agent, attribute_names)
    }

    /// Build a descriptor with an explicit [`EntityKind`].
    pub fn with_kind(
        name: impl Into<Arc<str>>,
        kind: EntityKind,
        mut attribute_names: Vec<Arc<str>>,
    ) -> Self {
        attribute_names.sort();
        attribute_names.dedup();

        let name_to_index = attribute_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), AttributeIndex(i as u16)))
            .collect();

        Self {
            name: name.into(),
            kind,
            attribute_names,
            name_to_index,
            handlers: HashMap::new(),
            pass_through: HashMap::new(),
        }
    }

    pub fn attribute_count(&self) -> usize {
        self.attribute_names.len()
    }

    pub fn attribute_index(&self, name: &str) -> Option<AttributeIndex> {
        self.name_to_index.get(name).copied()
    }

    pub fn attribute_name(&self, index: AttributeIndex) -> &str {
        &self.attribute_names[index.index()]
    }

    pub fn attribute_names(&self) -> &[Arc<str>] {
        &self.attribute_names
    }

    /// Register that `group` can resolve `attribute` in `substep`, optionally
    /// narrowed to `state`. Declaration order is preserved — the resolver
    /// tries groups in this order and uses the first whose condition
    /// matches. Pass `state: None` to register a wildcard ("common handler")
    /// group consulted when no state-specific group exists.
    pub fn add_handler_group(
        &mut self,
        attribute: AttributeIndex,
        substep: impl Into<Arc<str>>,
        state: Option<Arc<str>>,
        group: HandlerGroupId,
    ) {
        let substep = substep.into();
        self.handlers
            .entry((attribute, substep.clone(), state))
            .or_default()
            .push(group);

        let slots = self
            .pass_through
            .entry(substep)
            .or_insert_with(|| vec![true; self.attribute_names.len()]);
        slots[attribute.index()] = false;
    }

    /// The handler groups that may resolve `attribute` in `substep`. Tries
    /// `state` first (if given), then falls back to the wildcard (`None`
    /// state) entry. Returns an empty slice if neither exists — the
    /// resolver treats that exactly like a pass-through attribute.
    pub fn handler_groups_for(
        &self,
        attribute: AttributeIndex,
        substep: &str,
        state: Option<&str>,
    ) -> &[HandlerGroupId] {
        if let Some(state) = state {
            if let Some(groups) = self.handlers.get(&(attribute, Arc::from(substep), Some(Arc::from(state)))) {
                return groups;
            }
        }
        self.handlers
            .get(&(attribute, Arc::from(substep), None))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `true` if `attribute` has no handler at all (in any state) for
    /// `substep`, meaning it can be copied from `prior` to `current`
    /// without invoking the resolver. A substep the program never
    /// registered any handler for is entirely pass-through.
    #[inline]
    pub fn is_pass_through(&self, attribute: AttributeIndex, substep: &str) -> bool {
        match self.pass_through.get(substep) {
            Some(slots) => slots[attribute.index()],
            None => true,
        }
    }
}
