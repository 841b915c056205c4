//! The metric and conditional strategy tables.

use std::str::FromStr;

use josh_value::RealizedDistribution;

use crate::error::QueryError;

/// Per-timestep / per-cell aggregate to compute over the gathered samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Mean,
    Median,
    Min,
    Max,
    Std,
    Probability,
}

impl FromStr for Metric {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Metric::Mean),
            "median" => Ok(Metric::Median),
            "min" => Ok(Metric::Min),
            "max" => Ok(Metric::Max),
            "std" => Ok(Metric::Std),
            "probability" => Ok(Metric::Probability),
            other => Err(QueryError::UnknownMetric(other.to_string())),
        }
    }
}

/// The comparison a `probability` metric tests each sample against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conditional {
    Exceeds,
    FallsBelow,
    IsBetween,
}

impl FromStr for Conditional {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exceeds" => Ok(Conditional::Exceeds),
            "falls_below" => Ok(Conditional::FallsBelow),
            "is_between" => Ok(Conditional::IsBetween),
            other => Err(QueryError::UnknownConditional(other.to_string())),
        }
    }
}

impl Metric {
    /// Reduce a bag of same-unit samples to a single number under this
    /// metric. `conditional`/`target_a`/`target_b` only matter for
    /// [`Metric::Probability`]; every other metric ignores them.
    pub fn apply(
        self,
        samples: &[f64],
        conditional: Option<Conditional>,
        target_a: Option<f64>,
        target_b: Option<f64>,
    ) -> Result<f64, QueryError> {
        let dist = RealizedDistribution::from_draws(samples.to_vec());
        match self {
            Metric::Mean => Ok(dist.mean()),
            Metric::Median => Ok(dist.median()),
            Metric::Min => Ok(dist.min()),
            Metric::Max => Ok(dist.max()),
            Metric::Std => Ok(dist.std_dev()),
            Metric::Probability => {
                // A caller that omits a conditional defaults to `exceeds`
                // against `target_a`, the only single-threshold form that
                // needs no second bound.
                let conditional = conditional.unwrap_or(Conditional::Exceeds);
                match conditional {
                    Conditional::Exceeds => {
                        let a = target_a.unwrap_or(0.0);
                        Ok(dist.probability(|v| v > a))
                    }
                    Conditional::FallsBelow => {
                        let a = target_a.unwrap_or(0.0);
                        Ok(dist.probability(|v| v < a))
                    }
                    Conditional::IsBetween => {
                        let a = target_a.unwrap_or(0.0);
                        let b = target_b.ok_or(QueryError::RangeMismatch)?;
                        if a > b {
                            // `is_between(a, b)` with `a > b` is vacuously
                            // true for no sample.
                            return Ok(0.0);
                        }
                        Ok(dist.probability(|v| v >= a && v <= b))
                    }
                }
            }
        }
    }
}
