//! Process-wide interning of unit symbols ("meters", "kg", "count", ...).
//!
//! Symbols are interned separately from composed [`crate::Units`] values so
//! that the common case — the same handful of base symbols appearing in
//! thousands of composed unit expressions — costs one small integer per
//! occurrence instead of repeated string storage.

use std::sync::RwLock;

use dashmap::DashMap;

/// Index of an interned unit symbol (e.g. `"meters"`, `"count"`).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

struct SymbolTable {
    by_name: DashMap<Box<str>, SymbolId>,
    by_id: RwLock<Vec<Box<str>>>,
}

impl SymbolTable {
    fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            by_id: RwLock::new(Vec::new()),
        }
    }

    /// Intern `name`, returning its stable `SymbolId`.
    ///
    /// Insert-on-miss over a `DashMap`: a benign race on first insert of the
    /// same symbol from two threads is possible. The loser of that race
    /// discards its reservation and re-reads the winner's id, so the table
    /// never holds two ids for one name.
    fn intern(&self, name: &str) -> SymbolId {
        if let Some(existing) = self.by_name.get(name) {
            return *existing;
        }
        let mut table = self.by_id.write().expect("symbol table poisoned");
        // Re-check under the write lock in case another thread won the race
        // and already appended while we were waiting for the lock.
        if let Some(existing) = self.by_name.get(name) {
            return *existing;
        }
        let id = SymbolId(table.len() as u32);
        table.push(name.into());
        self.by_name.insert(name.into(), id);
        id
    }

    fn name(&self, id: SymbolId) -> Box<str> {
        self.by_id.read().expect("symbol table poisoned")[id.index()].clone()
    }
}

static TABLE: std::sync::OnceLock<SymbolTable> = std::sync::OnceLock::new();

fn table() -> &'static SymbolTable {
    TABLE.get_or_init(SymbolTable::new)
}

/// Intern a unit symbol name, returning a stable process-wide id.
pub fn intern(name: &str) -> SymbolId {
    table().intern(name)
}

/// Resolve a previously interned symbol back to its name.
pub fn resolve(id: SymbolId) -> Box<str> {
    table().name(id)
}
