//! `josh-units` — interned unit-of-measure algebra.
//!
//! Unit expressions (`meters`, `meters/second`, `count`, ...) are parsed
//! once and interned into a process-wide table shared via `dashmap`, so
//! after the first occurrence every subsequent reference to the same
//! expression is a `Copy`-able [`UnitsId`] comparison — no string work, no
//! allocation, on the hot path.
//!
//! | Module     | Contents                                   |
//! |------------|----------------------------------------------|
//! | [`units`]  | `Units`, parsing, compose, compatibility      |
//! | [`symbol`] | `SymbolId`, base-symbol interning              |
//! | [`error`]  | `UnitsError`, `UnitsResult`                   |

pub mod error;
pub mod symbol;
pub mod units;


pub use error::{UnitsError, UnitsResult};
pub use symbol::SymbolId;
pub use units::Units;
