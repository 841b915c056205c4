//! Fluent builder for constructing an [`AttributeStore`] + [`EntityRngs`] in
//! one step.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use josh_entity::{AttributeStoreBuilder, EntityType};
//!
//! let descriptor = Arc::new(EntityType::new("Patch", vec!["elevation".into(), "moisture".into()]));
//! let (store, rngs) = AttributeStoreBuilder::new(descriptor, 100, /*seed=*/ 42).build();
//!
//! assert_eq!(store.count, 100);
//! assert_eq!(rngs.len(), 100);
//! ```

use std::sync::Arc;

use crate::descriptor::EntityType;
use crate::extension::ExtensionMap;
use crate::store::{AttributeStore, EntityRngs};

/// Fluent builder for [`AttributeStore`] + [`EntityRngs`].
///
/// All arrays are pre-allocated at construction time so later field writes
/// (from external data loaders, etc.) are simple indexed assignments, not
/// pushes.
pub struct AttributeStoreBuilder {
    descriptor: Arc<EntityType>,
    count: usize,
    seed: u64,
    extensions: ExtensionMap,
}

impl AttributeStoreBuilder {
    /// Create a builder for `count` entities of `descriptor`'s type, using
    /// `seed` as the run's global RNG seed.
    pub fn new(descriptor: Arc<EntityType>, count: usize, seed: u64) -> Self {
        Self {
            descriptor,
            count,
            seed,
            extensions: ExtensionMap::new(),
        }
    }

    /// Register an engine-internal extension type `T`.
    ///
    /// Every entity will start with `T::default()`. Must be called before
    /// [`build`](Self::build). Calling this twice for the same `T` is
    /// harmless (second call is a no-op).
    pub fn register_extension<T: Default + Send + Sync + 'static>(mut self) -> Self {
        self.extensions.register::<T>(0);
        self
    }

    /// Construct `AttributeStore` and `EntityRngs`.
    ///
    /// All attribute slots start `None`; applications populate initial state
    /// via `AttributeStore::set_current` (typically from external data).
    pub fn build(mut self) -> (AttributeStore, EntityRngs) {
        for _ in 0..self.count {
            self.extensions.push_defaults();
        }

        let store = AttributeStore::new(self.descriptor, self.count, self.extensions);
        let rngs = EntityRngs::new(self.count, self.seed);

        (store, rngs)
    }
}
