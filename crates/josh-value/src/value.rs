//! The tagged value type flowing through handler expressions and attribute
//! storage.
//!
//! # Widening lattice
//!
//! Numeric types widen in one direction only: `Bool -> Int64 -> Decimal`.
//! `String` and `EntityRef` are leaves — they only combine with another
//! value of the same tag. `Distribution` is also a leaf in the widening
//! lattice but broadcasts element-wise against a bare numeric (see
//! [`Value::add`] and friends) rather than rejecting the combination.

use std::sync::Arc;

use josh_core::EntityId;
use josh_units::Units;

use crate::cache::OperandCache;
use crate::decimal::{DecimalMode, DecimalValue};
use crate::distribution::RealizedDistribution;
use crate::error::{ValueError, ValueResult};

/// Discriminant used by the operand-pair cache and error messages — kept
/// separate from `Value` itself so the cache key never carries payload data.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeTag {
    Bool,
    Int64,
    Decimal,
    String,
    EntityRef,
    Distribution,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Bool => "bool",
            TypeTag::Int64 => "int64",
            TypeTag::Decimal => "decimal",
            TypeTag::String => "string",
            TypeTag::EntityRef => "entity_ref",
            TypeTag::Distribution => "distribution",
        }
    }

    /// Position in the numeric widening lattice. Non-numeric tags have no
    /// position and never widen.
    fn numeric_rank(self) -> Option<u8> {
        match self {
            TypeTag::Bool => Some(0),
            TypeTag::Int64 => Some(1),
            TypeTag::Decimal => Some(2),
            _ => None,
        }
    }
}

/// A typed, unit-carrying value.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int64(i64, Units),
    Decimal(DecimalValue, Units),
    String(Arc<str>),
    EntityRef(EntityId),
    Distribution(RealizedDistribution, Units),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::Bool,
            Value::Int64(..) => TypeTag::Int64,
            Value::Decimal(..) => TypeTag::Decimal,
            Value::String(_) => TypeTag::String,
            Value::EntityRef(_) => TypeTag::EntityRef,
            Value::Distribution(..) => TypeTag::Distribution,
        }
    }

    pub fn units(&self) -> Units {
        match self {
            Value::Int64(_, u) | Value::Decimal(_, u) | Value::Distribution(_, u) => *u,
            Value::Bool(_) | Value::String(_) | Value::EntityRef(_) => Units::unitless(),
        }
    }

    /// Coerce to `f64`, widening `Bool`/`Int64`/`Decimal` as needed.
    pub fn as_f64(&self) -> ValueResult<f64> {
        match self {
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int64(n, _) => Ok(*n as f64),
            Value::Decimal(d, _) => Ok(d.as_f64()),
            other => Err(ValueError::NotNumeric(other.tag().name())),
        }
    }

    /// Widen `self` to the target numeric rank, keeping the current mode for
    /// `Decimal` targets when already numeric.
    fn widen_to(&self, target: TypeTag, mode: DecimalMode) -> ValueResult<Value> {
        let units = self.units();
        match (self, target) {
            (Value::Bool(b), TypeTag::Int64) => Ok(Value::Int64(*b as i64, units)),
            (Value::Bool(b), TypeTag::Decimal) => {
                Ok(Value::Decimal(DecimalValue::from_f64(mode, *b as i64 as f64), units))
            }
            (Value::Int64(n, u), TypeTag::Decimal) => {
                Ok(Value::Decimal(DecimalValue::from_f64(mode, *n as f64), *u))
            }
            (v, t) if v.tag() == t => Ok(v.clone()),
            (v, _) => Err(ValueError::TypeMismatch(v.tag().name(), target.name())),
        }
    }

    /// Rescale a numeric value into `target_units`, by `factor`. A no-op
    /// relabel when `factor` is `1.0`. Otherwise widens `Int64` to `Decimal`
    /// rather than rounding — a unit conversion that changes the numeric
    /// scale is exactly the kind of thing that shouldn't silently lose
    /// precision.
    fn rescaled(&self, factor: f64, target_units: Units) -> Value {
        if factor == 1.0 {
            return match self {
                Value::Int64(n, _) => Value::Int64(*n, target_units),
                Value::Decimal(d, _) => Value::Decimal(*d, target_units),
                other => other.clone(),
            };
        }
        match self {
            Value::Int64(n, _) => Value::Decimal(DecimalValue::from_f64(DecimalMode::Float, *n as f64 * factor), target_units),
            Value::Decimal(d, _) => Value::Decimal(DecimalValue::from_f64(d.mode(), d.as_f64() * factor), target_units),
            other => other.clone(),
        }
    }

    /// Widen two operands to their common numeric type for addition-like
    /// operations (`add`/`subtract`), where the two sides must describe the
    /// same quantity: converts `b`'s unit scale into `a`'s when they
    /// describe the same dimension at a different scale (e.g. `cm` and
    /// `m`), failing if the dimensions are altogether incompatible. The
    /// result keeps `self`'s units. `cache` memoizes the `(tag, tag)`
    /// widening decision.
    pub fn make_compatible(
        a: &Value,
        b: &Value,
        cache: &OperandCache,
        mode: DecimalMode,
    ) -> ValueResult<(Value, Value)> {
        let units_a = a.units();
        let units_b = b.units();
        // `b` is in `units_b` and must be rescaled into `units_a`, so the
        // factor converts *from* `units_b` *to* `units_a` — the receiver of
        // `conversion_factor` is the unit being converted away from.
        let factor = units_b
            .conversion_factor(units_a)
            .ok_or_else(|| ValueError::UnitMismatch(units_a, units_b))?;

        let plan = cache.plan(a.tag(), b.tag())?;
        // A genuine scale change (factor != 1.0) can introduce a fraction
        // even from two `Int64` operands (100cm -> 1m), so both sides widen
        // to `Decimal` whenever rescaling actually does something — keeping
        // them at the same tag after `rescaled` runs.
        let target = if factor == 1.0 { plan.target } else { TypeTag::Decimal };
        let left = a.widen_to(target, mode)?;
        let right = b.widen_to(target, mode)?.rescaled(factor, units_a);
        Ok((left, right))
    }

    /// Widen two operands to their common numeric type for
    /// multiplication-like operations (`multiply`/`divide`), where the two
    /// sides may carry unrelated units — the units compose rather than
    /// needing to match (`meters * seconds` is perfectly valid). No
    /// rescaling happens here; [`Units::multiply`]/[`Units::divide`]
    /// combine the operands' unit expressions afterward.
    fn widen_for_product(a: &Value, b: &Value, cache: &OperandCache, mode: DecimalMode) -> ValueResult<(Value, Value)> {
        let plan = cache.plan(a.tag(), b.tag())?;
        let left = a.widen_to(plan.target, mode)?;
        let right = b.widen_to(plan.target, mode)?;
        Ok((left, right))
    }

    pub fn add(&self, other: &Value, cache: &OperandCache, mode: DecimalMode) -> ValueResult<Value> {
        if let (Value::String(a), Value::String(b)) = (self, other) {
            return Ok(Value::String(Arc::from(format!("{a}{b}"))));
        }
        if let Some(result) = Self::broadcast_distribution(self, other, cache, mode, Value::add)? {
            return Ok(result);
        }
        let (a, b) = Value::make_compatible(self, other, cache, mode)?;
        match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(x || y)),
            (Value::Int64(x, u), Value::Int64(y, _)) => Ok(Value::Int64(x + y, u)),
            (Value::Decimal(x, u), Value::Decimal(y, _)) => {
                Ok(Value::Decimal(x.combine(y, |a, b| a + b, |a, b| a + b), u))
            }
            (x, y) => Err(ValueError::TypeMismatch(x.tag().name(), y.tag().name())),
        }
    }

    pub fn subtract(&self, other: &Value, cache: &OperandCache, mode: DecimalMode) -> ValueResult<Value> {
        if let Some(result) = Self::broadcast_distribution(self, other, cache, mode, Value::subtract)? {
            return Ok(result);
        }
        let (a, b) = Value::make_compatible(self, other, cache, mode)?;
        match (a, b) {
            (Value::Int64(x, u), Value::Int64(y, _)) => Ok(Value::Int64(x - y, u)),
            (Value::Decimal(x, u), Value::Decimal(y, _)) => {
                Ok(Value::Decimal(x.combine(y, |a, b| a - b, |a, b| a - b), u))
            }
            (x, y) => Err(ValueError::TypeMismatch(x.tag().name(), y.tag().name())),
        }
    }

    pub fn multiply(&self, other: &Value, cache: &OperandCache, mode: DecimalMode) -> ValueResult<Value> {
        if let Some(result) = Self::broadcast_distribution(self, other, cache, mode, Value::multiply)? {
            return Ok(result);
        }
        let (a, b) = Value::widen_for_product(self, other, cache, mode)?;
        match (a, b) {
            (Value::Int64(x, u), Value::Int64(y, v)) => Ok(Value::Int64(x * y, u.multiply(v))),
            (Value::Decimal(x, u), Value::Decimal(y, v)) => {
                Ok(Value::Decimal(x.combine(y, |a, b| a * b, |a, b| a * b), u.multiply(v)))
            }
            (x, y) => Err(ValueError::TypeMismatch(x.tag().name(), y.tag().name())),
        }
    }

    pub fn divide(&self, other: &Value, cache: &OperandCache, mode: DecimalMode) -> ValueResult<Value> {
        if let Some(result) = Self::broadcast_distribution(self, other, cache, mode, Value::divide)? {
            return Ok(result);
        }
        if matches!(other.as_f64(), Ok(v) if v == 0.0) {
            return Err(ValueError::DivideByZero);
        }
        let (a, b) = Value::widen_for_product(self, other, cache, mode)?;
        match (a, b) {
            (Value::Int64(x, u), Value::Int64(y, v)) => Ok(Value::Int64(x / y, u.divide(v))),
            (Value::Decimal(x, u), Value::Decimal(y, v)) => {
                Ok(Value::Decimal(x.combine(y, |a, b| a / b, |a, b| a / b), u.divide(v)))
            }
            (x, y) => Err(ValueError::TypeMismatch(x.tag().name(), y.tag().name())),
        }
    }

    /// Element-wise broadcast for operations involving a `Distribution`:
    /// `Distribution op Distribution` combines draws pairwise (requires
    /// equal length), `Distribution op scalar` and `scalar op Distribution`
    /// combine every draw against the one scalar. Returns `Ok(None)` when
    /// neither operand is a `Distribution`, so callers fall through to
    /// their scalar path unchanged.
    fn broadcast_distribution(
        a: &Value,
        b: &Value,
        cache: &OperandCache,
        mode: DecimalMode,
        op: fn(&Value, &Value, &OperandCache, DecimalMode) -> ValueResult<Value>,
    ) -> ValueResult<Option<Value>> {
        match (a, b) {
            (Value::Distribution(da, ua), Value::Distribution(db, ub)) => {
                if da.len() != db.len() {
                    return Err(ValueError::TypeMismatch("distribution", "distribution"));
                }
                let mut units = None;
                let draws: ValueResult<Vec<f64>> = da
                    .draws()
                    .iter()
                    .zip(db.draws())
                    .map(|(&x, &y)| {
                        let vx = Value::Decimal(DecimalValue::F64(x), *ua);
                        let vy = Value::Decimal(DecimalValue::F64(y), *ub);
                        let result = op(&vx, &vy, cache, mode)?;
                        units.get_or_insert_with(|| result.units());
                        result.as_f64()
                    })
                    .collect();
                Ok(Some(Value::Distribution(RealizedDistribution::from_draws(draws?), units.unwrap_or(*ua))))
            }
            (Value::Distribution(d, u), scalar) => {
                let draws: ValueResult<Vec<f64>> = d
                    .draws()
                    .iter()
                    .map(|&x| op(&Value::Decimal(DecimalValue::F64(x), *u), scalar, cache, mode).and_then(|v| v.as_f64()))
                    .collect();
                Ok(Some(Value::Distribution(RealizedDistribution::from_draws(draws?), *u)))
            }
            (scalar, Value::Distribution(d, u)) => {
                let draws: ValueResult<Vec<f64>> = d
                    .draws()
                    .iter()
                    .map(|&x| op(scalar, &Value::Decimal(DecimalValue::F64(x), *u), cache, mode).and_then(|v| v.as_f64()))
                    .collect();
                Ok(Some(Value::Distribution(RealizedDistribution::from_draws(draws?), *u)))
            }
            _ => Ok(None),
        }
    }

    /// `slice(subject, selections)`: the sub-distribution of
    /// `subject`'s draws whose paired boolean in `selections` is `true`.
    /// Fails with [`ValueError::TypeMismatch`] when `subject` is not a
    /// `Distribution`, or when the two vectors differ in length.
    pub fn slice(subject: &Value, selections: &[bool]) -> ValueResult<Value> {
        match subject {
            Value::Distribution(d, u) => {
                if d.len() != selections.len() {
                    return Err(ValueError::TypeMismatch("distribution", "selection"));
                }
                let draws: Vec<f64> = d
                    .draws()
                    .iter()
                    .zip(selections)
                    .filter_map(|(&v, &keep)| keep.then_some(v))
                    .collect();
                Ok(Value::Distribution(RealizedDistribution::from_draws(draws), *u))
            }
            other => Err(ValueError::TypeMismatch(other.tag().name(), "distribution")),
        }
    }

    /// `cast_unit(value, target)`: reinterpret `value`'s numeric payload
    /// in `target` units, converting its scale if `target` is a compatible
    /// unit at a different scale. `cast_unit(v, v.units()) == v` always,
    /// because the conversion factor between a unit and itself is `1.0`.
    pub fn cast_unit(value: &Value, target: Units) -> ValueResult<Value> {
        let source = value.units();
        let factor = source
            .conversion_factor(target)
            .ok_or_else(|| ValueError::UnitMismatch(source, target))?;
        Ok(value.rescaled(factor, target))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int64(a, ua), Value::Int64(b, ub)) => numeric_eq(*a as f64, *ua, *b as f64, *ub),
            (Value::Decimal(a, ua), Value::Decimal(b, ub)) => numeric_eq(a.as_f64(), *ua, b.as_f64(), *ub),
            (Value::Int64(a, ua), Value::Decimal(b, ub)) => numeric_eq(*a as f64, *ua, b.as_f64(), *ub),
            (Value::Decimal(a, ua), Value::Int64(b, ub)) => numeric_eq(a.as_f64(), *ua, *b as f64, *ub),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::EntityRef(a), Value::EntityRef(b)) => a == b,
            (Value::Distribution(a, ua), Value::Distribution(b, ub)) => a == b && ua == ub,
            _ => false,
        }
    }
}

/// Compares two numeric quantities that may carry different (but
/// convertible) units — `100 cm == 1 m`. Values in genuinely incompatible
/// units are never equal.
fn numeric_eq(a: f64, ua: Units, b: f64, ub: Units) -> bool {
    match ua.conversion_factor(ub) {
        Some(factor) => (a * factor - b).abs() < 1e-9,
        None => false,
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int64(n, u) if u.is_unitless() => write!(f, "{n}"),
            Value::Int64(n, u) => write!(f, "{n} {u}"),
            Value::Decimal(d, u) if u.is_unitless() => write!(f, "{d}"),
            Value::Decimal(d, u) => write!(f, "{d} {u}"),
            Value::String(s) => write!(f, "{s}"),
            Value::EntityRef(id) => write!(f, "{id}"),
            Value::Distribution(d, u) if u.is_unitless() => write!(f, "{d}"),
            Value::Distribution(d, u) => write!(f, "{d} {u}"),
        }
    }
}

pub(crate) fn common_numeric_rank(a: TypeTag, b: TypeTag) -> Option<TypeTag> {
    let ra = a.numeric_rank()?;
    let rb = b.numeric_rank()?;
    let rank = ra.max(rb);
    Some(match rank {
        0 => TypeTag::Bool,
        1 => TypeTag::Int64,
        _ => TypeTag::Decimal,
    })
}
