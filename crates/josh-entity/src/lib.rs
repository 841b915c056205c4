//! `josh-entity` — Structure-of-Arrays entity storage for the Josh
//! simulation engine.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                |
//! |-----------------|-----------------------------------------------------------|
//! | [`descriptor`]  | `EntityType` — shared, immutable per-type metadata         |
//! | [`store`]       | `AttributeStore` (current/prior values), `EntityRngs`       |
//! | [`builder`]     | `AttributeStoreBuilder` (fluent construction)               |
//! | [`extension`]   | `ExtensionMap`, type-erased engine-internal side storage    |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on all public types.     |

pub mod builder;
pub mod descriptor;
pub mod extension;
pub mod store;

#[cfg(test)]
mod tests;

pub use builder::AttributeStoreBuilder;
pub use descriptor::EntityType;
pub use extension::ExtensionMap;
pub use store::{AttributeStore, EntityRngs, FrozenEntity};
