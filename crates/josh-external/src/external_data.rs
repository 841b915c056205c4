//! `ExternalData` — the read-only interface to geospatial data files the DSL
//! front-end's file readers supply values through.
//!
//! The core never writes through this interface and never interprets the
//! path it is given; it is an opaque string handed through from the parsed
//! program (a raster path, a NetCDF variable locator, …).

use josh_core::Timestep;
use josh_value::Value;

use crate::error::ExternalResult;

/// An opaque handle to one opened external data source, returned by
/// [`ExternalData::open`] and passed back into `read_variable`/`close`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Handle(pub u64);

/// Read-only access to externally supplied per-patch values.
///
/// Implemented by the external geospatial file readers (CSV grids,
/// NetCDF/GeoTIFF, …) — `josh-sim`/`josh-resolver` only ever call through
/// this trait, never a concrete backend, so swapping formats never touches
/// the core.
pub trait ExternalData {
    /// Open `path`, returning a handle for subsequent reads. What `path`
    /// means (a file path, a connection string) is entirely up to the
    /// implementation.
    fn open(&mut self, path: &str) -> ExternalResult<Handle>;

    /// Read `variable` at grid position `(x, y)` for `timestep`.
    ///
    /// Returns [`crate::error::ExternalError::NotFound`] when the source has
    /// no value there rather than treating it as a hard failure — callers
    /// decide whether a missing external read is fatal.
    fn read_variable(&self, handle: Handle, variable: &str, timestep: Timestep, x: f64, y: f64) -> ExternalResult<Value>;

    /// Release any resources associated with `handle`. Idempotent.
    fn close(&mut self, handle: Handle);
}
