//! Selectable-precision decimal representation.
//!
//! Most runs use plain `f64` arithmetic (`DecimalMode::Float`), which is
//! fast and matches the reference program's default numeric behavior. Runs
//! that need exact decimal accumulation (e.g. summing many small monetary
//! increments without float drift) opt into `DecimalMode::BigDecimal`, which
//! stores every numeric value as a `rust_decimal::Decimal` instead.
//!
//! The mode is chosen once per run and threaded through every arithmetic
//! call — `DecimalValue` itself is a plain sum type, not a trait object, so
//! there is no per-operation dispatch cost beyond the match.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Which representation numeric [`crate::Value`]s use for a given run.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum DecimalMode {
    #[default]
    Float,
    BigDecimal,
}

/// A numeric scalar in one of the two supported representations.
#[derive(Copy, Clone, Debug)]
pub enum DecimalValue {
    F64(f64),
    Big(Decimal),
}

impl DecimalValue {
    pub fn from_f64(mode: DecimalMode, v: f64) -> DecimalValue {
        match mode {
            DecimalMode::Float => DecimalValue::F64(v),
            DecimalMode::BigDecimal => {
                DecimalValue::Big(Decimal::from_f64_retain(v).unwrap_or(Decimal::ZERO))
            }
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            DecimalValue::F64(v) => v,
            DecimalValue::Big(d) => d.to_f64().unwrap_or(0.0),
        }
    }

    /// Widen `self` to `Big` form, converting through `f64` if needed.
    /// Used when combining a `Float`-mode value with a `BigDecimal`-mode one
    /// (e.g. a constant folded under the default mode flowing into a
    /// BigDecimal-mode attribute).
    pub fn to_big(self) -> Decimal {
        match self {
            DecimalValue::Big(d) => d,
            DecimalValue::F64(v) => Decimal::from_f64_retain(v).unwrap_or(Decimal::ZERO),
        }
    }

    pub fn mode(self) -> DecimalMode {
        match self {
            DecimalValue::F64(_) => DecimalMode::Float,
            DecimalValue::Big(_) => DecimalMode::BigDecimal,
        }
    }

    /// Combine two values, widening to `Big` if either side is `Big` —
    /// `BigDecimal` dominates `Float` in the widening lattice because it is
    /// strictly more precise.
    pub fn combine(self, other: DecimalValue, op: impl Fn(f64, f64) -> f64, big_op: impl Fn(Decimal, Decimal) -> Decimal) -> DecimalValue {
        match (self, other) {
            (DecimalValue::F64(a), DecimalValue::F64(b)) => DecimalValue::F64(op(a, b)),
            (a, b) => DecimalValue::Big(big_op(a.to_big(), b.to_big())),
        }
    }
}

impl PartialEq for DecimalValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DecimalValue::F64(a), DecimalValue::F64(b)) => a == b,
            _ => self.to_big() == other.to_big(),
        }
    }
}

impl std::fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecimalValue::F64(v) => write!(f, "{v}"),
            DecimalValue::Big(d) => write!(f, "{d}"),
        }
    }
}
