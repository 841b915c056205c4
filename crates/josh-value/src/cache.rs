//! Memoized widening decisions for operand type pairs.
//!
//! Handler expressions evaluate the same few operand-type combinations
//! (usually `Int64 op Int64`, sometimes `Int64 op Decimal`) many millions of
//! times over a run. [`OperandCache`] memoizes the widening target for each
//! `(TypeTag, TypeTag)` pair the first time it's seen so later lookups are a
//! single `DashMap` read instead of re-deriving the lattice position.
//!
//! Each pair is stored twice — once for `(a, b)` and once for `(b, a)` — so
//! that flipping operand order on a later call (e.g. `x - y` vs `y - x`)
//! still hits the cache instead of computing the same plan again from the
//! other direction.

use dashmap::DashMap;

use crate::error::{ValueError, ValueResult};
use crate::value::{TypeTag, common_numeric_rank};

/// The resolved widening target for a pair of operand types.
#[derive(Copy, Clone, Debug)]
pub struct WideningPlan {
    pub target: TypeTag,
}

/// Process-wide cache of `(TypeTag, TypeTag) -> WideningPlan` decisions.
pub struct OperandCache {
    plans: DashMap<(TypeTag, TypeTag), WideningPlan>,
}

impl Default for OperandCache {
    fn default() -> Self {
        Self::new()
    }
}

impl OperandCache {
    pub fn new() -> Self {
        Self { plans: DashMap::new() }
    }

    pub fn plan(&self, a: TypeTag, b: TypeTag) -> ValueResult<WideningPlan> {
        if let Some(plan) = self.plans.get(&(a, b)) {
            return Ok(*plan);
        }

        let target = common_numeric_rank(a, b)
            .or_else(|| (a == b).then_some(a))
            .ok_or(ValueError::TypeMismatch(a.name(), b.name()))?;
        let plan = WideningPlan { target };

        self.plans.insert((a, b), plan);
        self.plans.insert((b, a), plan);
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
