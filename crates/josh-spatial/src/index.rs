//! The 2-D bucket grid and the circle radius offset-table cache.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use josh_core::EntityId;

use crate::error::{SpatialError, SpatialResult};
use crate::shape::{intersects, Shape};

/// Process-wide cache mapping an integer circle radius to the list of
/// `(dx, dy)` bucket offsets that can intersect a circle of that radius
/// centered anywhere within its own bucket. Shared across replicates —
/// insert-on-miss, benign races, loser discards its table.
fn offset_cache() -> &'static DashMap<u32, Arc<[(i32, i32)]>> {
    static CACHE: OnceLock<DashMap<u32, Arc<[(i32, i32)]>>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Return the cached offset table for `radius`, building it on first use.
///
/// `radius` is rounded up to the nearest integer bucket count; the table is
/// a conservative candidate set — callers still apply an exact shape test
/// per candidate cell.
pub fn circle_offsets(radius: f64) -> Arc<[(i32, i32)]> {
    let key = radius.ceil().max(0.0) as u32;
    if let Some(existing) = offset_cache().get(&key) {
        return existing.clone();
    }
    let built = build_offsets(key);
    offset_cache().entry(key).or_insert(built).clone()
}

fn build_offsets(radius: u32) -> Arc<[(i32, i32)]> {
    let r = radius as f64;
    let bound = radius as i32 + 1;
    let mut offsets = Vec::new();
    for dy in -bound..=bound {
        for dx in -bound..=bound {
            if min_sq_dist_between_unit_cells(dx, dy) <= r * r {
                offsets.push((dx, dy));
            }
        }
    }
    offsets.into()
}

/// Squared distance between the unit cell `[0,1) x [0,1)` and the unit cell
/// offset by `(dx, dy)`, treating the source circle's center as free to sit
/// anywhere within its own cell. Used to decide candidate membership
/// conservatively: a cell at `(0,0)` has zero gap to itself.
fn min_sq_dist_between_unit_cells(dx: i32, dy: i32) -> f64 {
    let gap_x = if dx > 0 { (dx - 1) as f64 } else if dx < 0 { (-dx - 1) as f64 } else { 0.0 };
    let gap_y = if dy > 0 { (dy - 1) as f64 } else if dy < 0 { (-dy - 1) as f64 } else { 0.0 };
    gap_x * gap_x + gap_y * gap_y
}

/// One patch registered in a [`SpatialIndex`]: its entity id and footprint.
#[derive(Clone, Copy)]
struct Entry {
    entity: EntityId,
    shape: Shape,
}

/// 2-D bucket grid over patch centers, bucket width one cell.
///
/// Built lazily on first query within a timestep; immutable after that —
/// every patch lives in exactly one bucket, keyed by the floor of its
/// center coordinates.
pub struct SpatialIndex {
    bucket_width: f64,
    entries: Vec<Entry>,
    buckets: std::collections::HashMap<(i32, i32), Vec<u32>>,
    built: bool,
}

impl SpatialIndex {
    /// An empty index over patches not yet registered. `bucket_width` is
    /// normally `1.0` (one cell); only non-grid geometries ever need a
    /// different value, and even then the index falls back to a linear
    /// scan rather than miscomputing bucket coordinates.
    pub fn new(bucket_width: f64) -> Self {
        Self {
            bucket_width,
            entries: Vec::new(),
            buckets: std::collections::HashMap::new(),
            built: false,
        }
    }

    /// Register a patch's entity id and footprint. Must be called before
    /// the first query; panics (via `debug_assert`) if called after build.
    pub fn insert(&mut self, entity: EntityId, shape: Shape) {
        debug_assert!(!self.built, "cannot insert into a SpatialIndex after it has been built");
        self.entries.push(Entry { entity, shape });
    }

    fn build(&mut self) {
        if self.built {
            return;
        }
        for (i, entry) in self.entries.iter().enumerate() {
            let (cx, cy) = entry.shape.center();
            let bucket = self.bucket_of(cx, cy);
            self.buckets.entry(bucket).or_default().push(i as u32);
        }
        self.built = true;
    }

    fn bucket_of(&self, x: f64, y: f64) -> (i32, i32) {
        ((x / self.bucket_width).floor() as i32, (y / self.bucket_width).floor() as i32)
    }

    /// Entities whose registered shape intersects `query`. Builds the
    /// index on first call. Circle queries use the radius offset table to
    /// visit only candidate buckets; every other shape falls back to the
    /// bounding-box bucket range.
    pub fn lookup(&mut self, query: &Shape) -> Vec<EntityId> {
        self.build();
        if self.buckets.is_empty() {
            return Vec::new();
        }

        let mut candidate_buckets: Vec<(i32, i32)> = Vec::new();
        match *query {
            Shape::Circle { cx, cy, radius } => {
                let origin = self.bucket_of(cx, cy);
                for (dx, dy) in circle_offsets(radius / self.bucket_width).iter() {
                    candidate_buckets.push((origin.0 + dx, origin.1 + dy));
                }
            }
            Shape::Square { cx, cy, half_extent } => {
                let min = self.bucket_of(cx - half_extent, cy - half_extent);
                let max = self.bucket_of(cx + half_extent, cy + half_extent);
                for by in min.1..=max.1 {
                    for bx in min.0..=max.0 {
                        candidate_buckets.push((bx, by));
                    }
                }
            }
            Shape::Point { x, y } => candidate_buckets.push(self.bucket_of(x, y)),
        }

        let mut hits = Vec::new();
        for bucket in candidate_buckets {
            let Some(indices) = self.buckets.get(&bucket) else { continue };
            for &i in indices {
                let entry = &self.entries[i as usize];
                if intersects(&entry.shape, query) {
                    hits.push(entry.entity);
                }
            }
        }
        hits
    }

    /// Like [`SpatialIndex::lookup`], but rejects the query outright if no
    /// patch has ever been registered rather than silently returning an
    /// empty result — callers that expect a populated grid can tell the
    /// two cases apart.
    pub fn try_lookup(&mut self, query: &Shape) -> SpatialResult<Vec<EntityId>> {
        if self.entries.is_empty() {
            return Err(SpatialError::EmptyIndex);
        }
        Ok(self.lookup(query))
    }

    /// Linear scan over every registered patch, bypassing bucketing
    /// entirely. Used for non-grid geometries where bucket coordinates
    /// would not be meaningful.
    pub fn lookup_linear(&self, query: &Shape) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|entry| intersects(&entry.shape, query))
            .map(|entry| entry.entity)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
