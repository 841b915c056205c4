//! `josh-spatial` — shape geometry and the patch grid's spatial index.
//!
//! # Crate layout
//!
//! | Module    | Contents                                                |
//! |-----------|-------------------------------------------------------------|
//! | [`shape`] | `Shape` (point/square/circle), pairwise intersection tests    |
//! | [`index`] | `SpatialIndex` bucket grid, circle radius offset-table cache  |
//! | [`error`] | `SpatialError`, `SpatialResult`                             |
//!
//! `GeoPoint` (haversine distance between lat/lon pairs) lives in
//! `josh-core` rather than here — it backs Earth-space shapes after an
//! external projection step, and has no bucket-grid or intersection logic
//! of its own.

pub mod error;
pub mod index;
pub mod shape;

#[cfg(test)]
mod tests;

pub use error::{SpatialError, SpatialResult};
pub use index::{circle_offsets, SpatialIndex};
pub use shape::{intersects, Shape};
