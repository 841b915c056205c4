//! `josh-resolver` — the shadowing resolver: on-demand, memoized attribute
//! resolution with cycle detection.
//!
//! # Crate layout
//!
//! | Module    | Contents                                                  |
//! |-----------|-------------------------------------------------------------|
//! | [`shadow`]| `ShadowingEntity`, `WorldView`, `NoWorld`                    |
//! | [`path`]  | `PathForm`, `parse` — dotted-path parsing for expression compilation |
//! | [`error`] | `ResolveError`, `ResolveResult`                             |
//!
//! # Design notes
//!
//! `ShadowingEntity` is the heart of the engine: it mediates every read and
//! write to one entity's attributes during a single open substep, matching
//! a handler's first matching condition to a value, memoizing the result,
//! and falling back to the prior value when no handler fires or none is
//! registered. Two entities of the same type resolved in the same substep
//! never share scratch state — each gets its own `ShadowingEntity`.

pub mod error;
pub mod path;
pub mod shadow;

#[cfg(test)]
mod tests;

pub use error::{ResolveError, ResolveResult};
pub use path::{parse, PathForm};
pub use shadow::{NoWorld, ShadowingEntity, WorldView};
