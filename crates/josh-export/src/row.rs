//! Plain data row types written by export sink backends.

use std::sync::Arc;

use josh_core::{EntityId, Timestep};
use josh_entity::FrozenEntity;
use josh_value::Value;

/// A frozen entity enriched with the step it was committed at and its
/// geometric position, if any — the "richer row" the export layer wraps a
/// bare [`FrozenEntity`] into before handing it to a writer. `FrozenEntity`
/// itself carries neither, since `josh-entity` has no notion of a timestep
/// or of geometry (see `josh-entity::store`).
///
/// Attributes are already in sorted order (inherited from the descriptor),
/// one column per attribute when a CSV/SQLite backend widens this into a
/// fixed-schema row per entity type.
#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub step: u64,
    pub entity: EntityId,
    pub type_name: Arc<str>,
    pub position: Option<(f64, f64)>,
    pub attributes: Vec<(Arc<str>, Value)>,
}

impl SnapshotRow {
    pub fn from_frozen(frozen: &FrozenEntity, step: Timestep, position: Option<(f64, f64)>) -> Self {
        Self {
            step: step.0,
            entity: frozen.entity,
            type_name: frozen.type_name.clone(),
            position,
            attributes: frozen.attributes.clone(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.iter().find(|(n, _)| n.as_ref() == name).map(|(_, v)| v)
    }
}

/// Summary statistics for one committed step, across every entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSummaryRow {
    pub step: u64,
    pub unix_time_secs: i64,
    pub entity_count: u64,
}
