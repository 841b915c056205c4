//! Realized probability distributions.
//!
//! A [`RealizedDistribution`] is the *outcome* of sampling a distribution
//! expression some number of times, not the distribution's parameters — by
//! the time a handler assigns one to an attribute, the draws have already
//! happened (deterministically, from the owning entity's
//! [`josh_core::EntityRng`]). Keeping only the realized draws means every
//! downstream consumer (the query layer's probability metrics, export
//! snapshots) works with plain numbers and never needs to know which
//! distribution shape produced them.

use std::sync::Arc;

/// An immutable bag of sampled draws, shared cheaply (`Arc`) once produced.
#[derive(Clone, Debug)]
pub struct RealizedDistribution {
    draws: Arc<[f64]>,
}

impl RealizedDistribution {
    pub fn from_draws(draws: Vec<f64>) -> Self {
        Self { draws: draws.into() }
    }

    pub fn single(value: f64) -> Self {
        Self::from_draws(vec![value])
    }

    pub fn draws(&self) -> &[f64] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        self.draws.iter().sum::<f64>() / self.draws.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        if self.draws.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .draws
            .iter()
            .map(|d| (d - mean).powi(2))
            .sum::<f64>()
            / (self.draws.len() - 1) as f64;
        variance.sqrt()
    }

    /// Fraction of draws satisfying `predicate` — the basis for the query
    /// layer's probability-of-event metrics.
    pub fn probability<F: Fn(f64) -> bool>(&self, predicate: F) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let hits = self.draws.iter().filter(|d| predicate(**d)).count();
        hits as f64 / self.draws.len() as f64
    }

    pub fn min(&self) -> f64 {
        self.draws.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.draws.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Linear-interpolated median, sorting a scratch copy of the draws —
    /// the query layer's `SummarizedResult` calls this once per metric, not
    /// per draw, so an `O(n log n)` sort is cheap enough.
    pub fn median(&self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.draws.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }
}

impl PartialEq for RealizedDistribution {
    fn eq(&self, other: &Self) -> bool {
        self.draws.as_ref() == other.draws.as_ref()
    }
}

impl std::fmt::Display for RealizedDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dist(n={}, mean={:.4})", self.len(), self.mean())
    }
}
