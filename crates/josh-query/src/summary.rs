//! `DataQuery` / `SummarizedResult` and the `run_query` entry point (C8).

use std::collections::BTreeMap;

use crate::error::{QueryError, QueryResult};
use crate::metric::{Conditional, Metric};
use crate::replicate::ReplicateResult;

/// A query over one attribute across a set of replicates.
///
/// `metric_type`/`target_a`/`target_b` are only consulted when `metric` is
/// [`Metric::Probability`]; other metrics ignore them.
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub variable: String,
    pub metric: Metric,
    pub metric_type: Option<Conditional>,
    pub target_a: Option<f64>,
    pub target_b: Option<f64>,
}

impl DataQuery {
    pub fn new(variable: impl Into<String>, metric: Metric) -> Self {
        Self {
            variable: variable.into(),
            metric,
            metric_type: None,
            target_a: None,
            target_b: None,
        }
    }

    pub fn with_conditional(mut self, conditional: Conditional, target_a: f64, target_b: Option<f64>) -> Self {
        self.metric_type = Some(conditional);
        self.target_a = Some(target_a);
        self.target_b = target_b;
        self
    }
}

/// A grid cell key rounded to two decimal places, stored as a
/// fixed-point pair so it can live in a `BTreeMap` without `f64`'s partial
/// ordering getting in the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CellKey(i64, i64);

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl CellKey {
    fn from_coords(x: f64, y: f64) -> Self {
        Self((round2(x) * 100.0).round() as i64, (round2(y) * 100.0).round() as i64)
    }

    fn to_coords(self) -> (f64, f64) {
        (self.0 as f64 / 100.0, self.1 as f64 / 100.0)
    }
}

/// The result of summarizing `target` across replicates for one
/// [`DataQuery`].
#[derive(Debug, Clone)]
pub struct SummarizedResult {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Per-timestep aggregate across every matching sample, regardless of
    /// position.
    pub value_per_timestep: BTreeMap<u64, f64>,
    /// Per-(timestep, rounded-cell) aggregate.
    pub grid_per_timestep: BTreeMap<u64, Vec<((f64, f64), f64)>>,
}

/// Pull every `(timestep, position, value)` triple whose row carries
/// `variable` and a position, flattening `Distribution` attributes into
/// their draws so a single patch can contribute more than one sample.
fn gather(target: &[ReplicateResult], variable: &str) -> Vec<(u64, f64, f64, f64)> {
    let mut out = Vec::new();
    for replicate in target {
        for row in &replicate.rows {
            let (Some((x, y)), Some(value)) = (row.position, row.attribute(variable)) else {
                continue;
            };
            match value {
                josh_value::Value::Distribution(dist, _) => {
                    out.extend(dist.draws().iter().map(|&v| (row.step, x, y, v)));
                }
                other => {
                    if let Ok(v) = other.as_f64() {
                        out.push((row.step, x, y, v));
                    }
                }
            }
        }
    }
    out
}

/// Summarize `target` (one `Vec<ReplicateResult>` per `DataQuery`): group by
/// timestep for the scalar series, and by
/// `(timestep, round(x,2), round(y,2))` for the grid.
pub fn run_query(target: &[ReplicateResult], query: &DataQuery) -> QueryResult<SummarizedResult> {
    if target.is_empty() {
        return Err(QueryError::EmptyInput);
    }
    if query.metric == Metric::Probability && query.metric_type == Some(Conditional::IsBetween) && query.target_b.is_none() {
        return Err(QueryError::RangeMismatch);
    }

    let samples = gather(target, &query.variable);

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut by_step: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
    let mut by_cell: BTreeMap<u64, BTreeMap<CellKey, Vec<f64>>> = BTreeMap::new();

    for (step, x, y, value) in samples {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
        by_step.entry(step).or_default().push(value);
        by_cell
            .entry(step)
            .or_default()
            .entry(CellKey::from_coords(x, y))
            .or_default()
            .push(value);
    }

    let value_per_timestep = by_step
        .into_iter()
        .map(|(step, values)| {
            let agg = query.metric.apply(&values, query.metric_type, query.target_a, query.target_b)?;
            Ok((step, agg))
        })
        .collect::<QueryResult<BTreeMap<_, _>>>()?;

    let grid_per_timestep = by_cell
        .into_iter()
        .map(|(step, cells)| {
            let row = cells
                .into_iter()
                .map(|(cell, values)| {
                    let agg = query.metric.apply(&values, query.metric_type, query.target_a, query.target_b)?;
                    Ok((cell.to_coords(), agg))
                })
                .collect::<QueryResult<Vec<_>>>()?;
            Ok((step, row))
        })
        .collect::<QueryResult<BTreeMap<_, _>>>()?;

    if min_x.is_infinite() {
        // No sample matched `variable` at all; an empty query yields an
        // empty result rather than an error.
        min_x = 0.0;
        min_y = 0.0;
        max_x = 0.0;
        max_y = 0.0;
    }

    Ok(SummarizedResult {
        min_x,
        min_y,
        max_x,
        max_y,
        value_per_timestep,
        grid_per_timestep,
    })
}
