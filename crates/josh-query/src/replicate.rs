//! The per-replicate records the query layer summarizes across.

use josh_export::SnapshotRow;

/// How a replicate ended — mirrors the terminal states `josh-sim::Replicate`
/// can reach, without depending on `josh-sim` directly so `josh-query` only
/// needs the rows a replicate actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicateStatus {
    Completed,
    Cancelled,
    Failed(String),
}

/// One replicate's collected patch-level snapshot rows, the unit the query
/// layer (C8) gathers and aggregates over.
#[derive(Debug, Clone)]
pub struct ReplicateResult {
    pub status: ReplicateStatus,
    pub rows: Vec<SnapshotRow>,
}

impl ReplicateResult {
    pub fn new(status: ReplicateStatus, rows: Vec<SnapshotRow>) -> Self {
        Self { status, rows }
    }
}
