//! `josh-core` — foundational types for the Josh simulation engine.
//!
//! This crate is a dependency of every other `josh-*` crate. It intentionally
//! has no `josh-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde` and `tracing-subscriber`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|------------------------------------------------------------|
//! | [`ids`]     | `EntityId`, `AttributeIndex`, `UnitsId`, `HandlerGroupId`, `ReplicateId` |
//! | [`kind`]    | `EntityKind` (Simulation/Patch/Agent/Disturbance/External) |
//! | [`geo`]     | `GeoPoint`, haversine distance (Earth-space shape support) |
//! | [`time`]    | `Timestep`, `RunClock`, `RunConfig`                       |
//! | [`rng`]     | `EntityRng` (per-entity), `ReplicateRng` (per-replicate)  |
//! | [`logging`] | Optional default `tracing-subscriber` bootstrap           |
//! | [`error`]   | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag            | Effect                                                |
//! |------------------|--------------------------------------------------------|
//! | `serde`          | Adds `Serialize`/`Deserialize` to all public types.    |
//! | `tracing-init`   | Pulls in `tracing-subscriber` and enables [`logging::init_default_subscriber`]. |

pub mod error;
pub mod geo;
pub mod ids;
pub mod kind;
pub mod logging;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{AttributeIndex, EntityId, HandlerGroupId, ReplicateId, UnitsId};
pub use kind::EntityKind;
pub use rng::{EntityRng, ReplicateRng};
pub use time::{RunClock, RunConfig, Timestep};
