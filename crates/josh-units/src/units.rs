//! Units algebra: parsing, canonicalization, interning, and compatibility.
//!
//! A `Units` value is a ratio of symbol multisets, e.g. `meters / second` or
//! `count`. Two expressions that multiply out to the same canonical
//! numerator/denominator (after cancelling common symbols) intern to the
//! same [`UnitsId`] and are therefore compatible for arithmetic without unit
//! conversion. Units that differ in symbol but share a known physical
//! dimension (e.g. `cm` and `m`) are *convertible*: [`Units::conversion_factor`]
//! returns the scale a value must be multiplied by to move between them.

use std::borrow::Cow;
use std::sync::RwLock;

use dashmap::DashMap;
use josh_core::UnitsId;

use crate::error::{UnitsError, UnitsResult};
use crate::symbol::{self, SymbolId};

/// Canonical sorted key used to deduplicate equivalent unit expressions.
type CanonicalKey = (Box<[SymbolId]>, Box<[SymbolId]>);

/// A handful of metric-length aliases, recognized well enough to satisfy
/// cross-scale arithmetic (`100 cm + 1 m`). Unrecognized symbols are their
/// own base with scale 1 — two distinct unrecognized symbols are simply
/// incompatible, same as before this table existed.
fn base_and_scale(symbol: &str) -> (&'static str, f64) {
    match symbol {
        "m" | "meter" | "meters" => ("m", 1.0),
        "cm" | "centimeter" | "centimeters" => ("m", 0.01),
        "mm" | "millimeter" | "millimeters" => ("m", 0.001),
        "km" | "kilometer" | "kilometers" => ("m", 1000.0),
        "g" | "gram" | "grams" => ("g", 1.0),
        "kg" | "kilogram" | "kilograms" => ("g", 1000.0),
        "mg" | "milligram" | "milligrams" => ("g", 0.001),
        _ => ("", 1.0),
    }
}

/// A record of one interned units value.
struct UnitsRecord {
    numerator: Box<[SymbolId]>,
    denominator: Box<[SymbolId]>,
    /// Unitless ("count", or an empty expression) needs no conversion to
    /// combine with any other unitless value — precomputed at intern time so
    /// hot-path compatibility checks never recompute it.
    is_unitless: bool,
    /// Canonical physical-dimension key: each symbol replaced by its base
    /// (e.g. `cm` and `m` both become `m`). Two `Units` with equal
    /// `dimension` are convertible even if their literal symbols differ.
    dimension: CanonicalKey,
    /// Scale factor that converts a bare numeric value expressed in this
    /// unit into the same quantity expressed in `dimension`'s base unit.
    scale_to_base: f64,
}

struct UnitsTable {
    by_key: DashMap<CanonicalKey, UnitsId>,
    by_id: RwLock<Vec<UnitsRecord>>,
}

/// Which binary composition produced a cached result — part of the op-cache
/// key alongside the two operand ids, since `multiply` and `divide` share
/// one intern cache.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
enum UnitOp {
    Multiply,
    Divide,
}

impl UnitsTable {
    fn new() -> Self {
        Self {
            by_key: DashMap::new(),
            by_id: RwLock::new(Vec::new()),
        }
    }

    fn intern(&self, mut numerator: Vec<SymbolId>, mut denominator: Vec<SymbolId>) -> UnitsId {
        cancel_common(&mut numerator, &mut denominator);
        numerator.sort_unstable();
        denominator.sort_unstable();
        let key: CanonicalKey = (numerator.into_boxed_slice(), denominator.into_boxed_slice());

        if let Some(existing) = self.by_key.get(&key) {
            return *existing;
        }
        let mut table = self.by_id.write().expect("units table poisoned");
        if let Some(existing) = self.by_key.get(&key) {
            return *existing;
        }
        let id = UnitsId(table.len() as u32);
        let is_unitless = key.0.is_empty() && key.1.is_empty();
        let (dimension, scale_to_base) = dimension_of(&key.0, &key.1);
        table.push(UnitsRecord {
            numerator: key.0.clone(),
            denominator: key.1.clone(),
            is_unitless,
            dimension,
            scale_to_base,
        });
        self.by_key.insert(key, id);
        id
    }

    fn record(&self, id: UnitsId) -> (Box<[SymbolId]>, Box<[SymbolId]>, bool) {
        let table = self.by_id.read().expect("units table poisoned");
        let rec = &table[id.index()];
        (rec.numerator.clone(), rec.denominator.clone(), rec.is_unitless)
    }

    /// Scale factor to convert a value from `from` into `to`'s unit, or
    /// `None` if they describe different physical dimensions.
    fn conversion_factor(&self, from: UnitsId, to: UnitsId) -> Option<f64> {
        let table = self.by_id.read().expect("units table poisoned");
        let f = &table[from.index()];
        let t = &table[to.index()];
        if f.dimension != t.dimension {
            return None;
        }
        Some(f.scale_to_base / t.scale_to_base)
    }
}

/// Replace every symbol in `numerator`/`denominator` with its physical base
/// and the scale that converts one unit of the original symbol into one
/// unit of that base, combining per-symbol scales multiplicatively
/// (denominator symbols divide). Symbols with no recognized base are their
/// own base at scale 1, so two units built from entirely unrecognized
/// symbols are only "convertible" when literally identical.
fn dimension_of(numerator: &[SymbolId], denominator: &[SymbolId]) -> (CanonicalKey, f64) {
    let mut base_num = Vec::with_capacity(numerator.len());
    let mut base_den = Vec::with_capacity(denominator.len());
    let mut scale = 1.0;

    for &s in numerator {
        let name = symbol::resolve(s);
        let (base, factor) = base_and_scale(&name);
        let base_name: Cow<str> = if base.is_empty() { Cow::Owned(name.to_string()) } else { Cow::Borrowed(base) };
        base_num.push(symbol::intern(&base_name));
        scale *= factor;
    }
    for &s in denominator {
        let name = symbol::resolve(s);
        let (base, factor) = base_and_scale(&name);
        let base_name: Cow<str> = if base.is_empty() { Cow::Owned(name.to_string()) } else { Cow::Borrowed(base) };
        base_den.push(symbol::intern(&base_name));
        scale /= factor;
    }

    cancel_common(&mut base_num, &mut base_den);
    base_num.sort_unstable();
    base_den.sort_unstable();
    ((base_num.into_boxed_slice(), base_den.into_boxed_slice()), scale)
}

fn cancel_common(numerator: &mut Vec<SymbolId>, denominator: &mut Vec<SymbolId>) {
    let mut i = 0;
    while i < numerator.len() {
        if let Some(pos) = denominator.iter().position(|d| *d == numerator[i]) {
            numerator.remove(i);
            denominator.remove(pos);
        } else {
            i += 1;
        }
    }
}

static TABLE: std::sync::OnceLock<UnitsTable> = std::sync::OnceLock::new();

fn table() -> &'static UnitsTable {
    TABLE.get_or_init(UnitsTable::new)
}

/// Memoized `multiply`/`divide` results, keyed by `(first operand, op,
/// second operand)` — the shared intern cache for the binary unit
/// operations.
static OP_CACHE: std::sync::OnceLock<DashMap<(UnitsId, UnitOp, UnitsId), UnitsId>> = std::sync::OnceLock::new();

fn op_cache() -> &'static DashMap<(UnitsId, UnitOp, UnitsId), UnitsId> {
    OP_CACHE.get_or_init(DashMap::new)
}

/// A resolved, interned units value. Cheap to copy — it is just a `UnitsId`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Units(pub UnitsId);

impl Units {
    /// The canonical unitless value ("count" / no units).
    pub fn unitless() -> Units {
        Units(table().intern(Vec::new(), Vec::new()))
    }

    /// Alias for [`Units::unitless`] — the program-facing name for a bare
    /// count, as opposed to the "EMPTY" name used for the same value in the
    /// unit-algebra contract.
    pub fn count() -> Units {
        Units::unitless()
    }

    /// Pre-interned convenience constant: plain meters.
    pub fn meters() -> Units {
        Units::parse("m").expect("\"m\" always parses")
    }

    /// Pre-interned convenience constant: plain degrees (angle), distinct
    /// from any length dimension — degrees never convert to meters.
    pub fn degrees() -> Units {
        Units::parse("degrees").expect("\"degrees\" always parses")
    }

    /// Parse a units expression of the form `a*b/c*d` (whitespace ignored).
    /// A bare `count` or an empty string both mean unitless.
    pub fn parse(text: &str) -> UnitsResult<Units> {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("count") {
            return Ok(Units::unitless());
        }

        let (num_part, den_part) = match text.split_once('/') {
            Some((n, d)) => (n, d),
            None => (text, ""),
        };

        let parse_side = |side: &str| -> UnitsResult<Vec<SymbolId>> {
            side.split('*')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    if !s.chars().all(|c| c.is_alphanumeric() || c == '_') {
                        return Err(UnitsError::Parse(text.to_string()));
                    }
                    Ok(symbol::intern(s))
                })
                .collect()
        };

        let numerator = parse_side(num_part)?;
        let denominator = parse_side(den_part)?;
        Ok(Units(table().intern(numerator, denominator)))
    }

    /// `true` if this units value represents "no units" (a pure count).
    pub fn is_unitless(self) -> bool {
        table().record(self.0).2
    }

    /// Multiply two unit expressions (numerators and denominators combine,
    /// then common symbols cancel). Memoized by `(self, other)`.
    pub fn multiply(self, other: Units) -> Units {
        let key = (self.0, UnitOp::Multiply, other.0);
        if let Some(cached) = op_cache().get(&key) {
            return Units(*cached);
        }
        let (n1, d1, _) = table().record(self.0);
        let (n2, d2, _) = table().record(other.0);
        let mut numerator: Vec<SymbolId> = n1.to_vec();
        numerator.extend(n2.iter().copied());
        let mut denominator: Vec<SymbolId> = d1.to_vec();
        denominator.extend(d2.iter().copied());
        let result = Units(table().intern(numerator, denominator));
        op_cache().insert(key, result.0);
        result
    }

    /// Divide this units value by `other`. Memoized like [`Units::multiply`].
    pub fn divide(self, other: Units) -> Units {
        let key = (self.0, UnitOp::Divide, other.0);
        if let Some(cached) = op_cache().get(&key) {
            return Units(*cached);
        }
        let (n1, d1, _) = table().record(self.0);
        let (n2, d2, _) = table().record(other.0);
        let mut numerator: Vec<SymbolId> = n1.to_vec();
        numerator.extend(d2.iter().copied());
        let mut denominator: Vec<SymbolId> = d1.to_vec();
        denominator.extend(n2.iter().copied());
        let result = Units(table().intern(numerator, denominator));
        op_cache().insert(key, result.0);
        result
    }

    /// The reciprocal unit: numerator and denominator swapped.
    /// `reverse(reverse(u)) == u`.
    pub fn reverse(self) -> Units {
        let (n, d, _) = table().record(self.0);
        Units(table().intern(d.to_vec(), n.to_vec()))
    }

    /// Raise this unit to an integer power: `raise_to_power(u, 2)` is
    /// `u*u`, `raise_to_power(u, -1)` is `reverse(u)`, and
    /// `raise_to_power(u, 0)` is always `EMPTY` regardless of `u`.
    pub fn raise_to_power(self, power: i32) -> Units {
        if power == 0 {
            return Units::unitless();
        }
        let (base, exponent) = if power < 0 { (self.reverse(), -power) } else { (self, power) };
        let mut result = base;
        for _ in 1..exponent {
            result = result.multiply(base);
        }
        result
    }

    /// Two units are compatible for direct arithmetic when their canonical
    /// forms are identical, either side is unitless (a bare scalar combines
    /// with anything), or they describe the same physical dimension at a
    /// different scale (e.g. `cm` and `m`).
    pub fn compatible(self, other: Units) -> bool {
        self.0 == other.0 || self.is_unitless() || other.is_unitless() || self.conversion_factor(other).is_some()
    }

    /// Scale factor to convert a bare value expressed in `self` into the
    /// equivalent value expressed in `other`. `1.0` when the units are
    /// identical or either is unitless; `None` when they are genuinely
    /// incompatible dimensions (e.g. meters and seconds).
    pub fn conversion_factor(self, other: Units) -> Option<f64> {
        if self.0 == other.0 {
            return Some(1.0);
        }
        if self.is_unitless() || other.is_unitless() {
            return Some(1.0);
        }
        table().conversion_factor(self.0, other.0)
    }

    /// Check compatibility, returning a descriptive error if it fails.
    pub fn ensure_compatible(self, other: Units) -> UnitsResult<()> {
        if self.compatible(other) {
            Ok(())
        } else {
            Err(UnitsError::Incompatible(self.to_string(), other.to_string()))
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (numerator, denominator, is_unitless) = table().record(self.0);
        if is_unitless {
            return write!(f, "count");
        }
        let join = |ids: &[SymbolId]| -> String {
            ids.iter()
                .map(|id| symbol::resolve(*id).to_string())
                .collect::<Vec<_>>()
                .join("*")
        };
        if denominator.is_empty() {
            write!(f, "{}", join(&numerator))
        } else if numerator.is_empty() {
            write!(f, "1/{}", join(&denominator))
        } else {
            write!(f, "{}/{}", join(&numerator), join(&denominator))
        }
    }
}
