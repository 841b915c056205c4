use std::sync::Arc;

use josh_core::EntityId;

use crate::index::{circle_offsets, SpatialIndex};
use crate::shape::{intersects, Shape};

fn grid_10x10() -> SpatialIndex {
    let mut idx = SpatialIndex::new(1.0);
    for by in 0..10 {
        for bx in 0..10 {
            let id = EntityId::try_from((by * 10 + bx) as usize).unwrap();
            idx.insert(id, Shape::square(bx as f64 + 0.5, by as f64 + 0.5, 0.5));
        }
    }
    idx
}

#[test]
fn squares_overlap_on_touching_edge() {
    let a = Shape::square(0.0, 0.0, 0.5);
    let b = Shape::square(1.0, 0.0, 0.5);
    assert!(intersects(&a, &b));
}

#[test]
fn squares_separated_do_not_intersect() {
    let a = Shape::square(0.0, 0.0, 0.5);
    let b = Shape::square(2.0, 0.0, 0.5);
    assert!(!intersects(&a, &b));
}

#[test]
fn circles_overlap_within_radius_sum() {
    let a = Shape::circle(0.0, 0.0, 1.0);
    let b = Shape::circle(1.5, 0.0, 1.0);
    assert!(intersects(&a, &b));
    let c = Shape::circle(3.0, 0.0, 1.0);
    assert!(!intersects(&a, &c));
}

#[test]
fn square_circle_uses_clamped_closest_point() {
    let square = Shape::square(0.0, 0.0, 1.0);
    let circle = Shape::circle(2.5, 0.0, 1.0);
    assert!(!intersects(&square, &circle));
    let circle_close = Shape::circle(1.9, 0.0, 1.0);
    assert!(intersects(&square, &circle_close));
}

#[test]
fn circle_checked_rejects_negative_radius() {
    assert!(Shape::circle_checked(0.0, 0.0, -1.0).is_err());
    assert!(Shape::circle_checked(0.0, 0.0, 0.0).is_ok());
}

#[test]
fn point_reduces_to_symmetric_case() {
    let point = Shape::point(0.4, 0.4);
    let square = Shape::square(0.0, 0.0, 0.5);
    assert!(intersects(&point, &square));
    assert!(intersects(&square, &point));
    let circle = Shape::circle(0.0, 0.0, 0.5);
    assert!(!intersects(&point, &circle));
}

#[test]
fn circle_query_returns_nine_patch_plus_shape() {
    let mut idx = grid_10x10();
    let query = Shape::circle(5.0, 5.0, 1.5);
    let hits = idx.lookup(&query);
    assert_eq!(hits.len(), 9);
}

#[test]
fn offset_table_never_misses_a_true_intersection() {
    let radius = 2.0;
    let offsets = circle_offsets(radius);
    let query = Shape::circle(0.3, 0.3, radius);
    for by in -5..=5 {
        for bx in -5..=5 {
            let patch = Shape::square(bx as f64 + 0.5, by as f64 + 0.5, 0.5);
            if intersects(&patch, &query) {
                assert!(
                    offsets.contains(&(bx, by)),
                    "offset table missed a true intersection at ({bx}, {by})"
                );
            }
        }
    }
}

#[test]
fn offset_table_is_cached_by_radius() {
    let a = circle_offsets(3.0);
    let b = circle_offsets(3.0);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn empty_index_returns_no_hits() {
    let mut idx = SpatialIndex::new(1.0);
    assert!(idx.lookup(&Shape::point(0.0, 0.0)).is_empty());
}

#[test]
fn try_lookup_rejects_an_unpopulated_index() {
    let mut idx = SpatialIndex::new(1.0);
    assert!(idx.try_lookup(&Shape::point(0.0, 0.0)).is_err());
}

#[test]
fn linear_fallback_matches_bucketed_lookup() {
    let mut idx = grid_10x10();
    let query = Shape::circle(5.0, 5.0, 1.5);
    let mut bucketed = idx.lookup(&query);
    let mut linear = idx.lookup_linear(&query);
    bucketed.sort_by_key(|e| e.index());
    linear.sort_by_key(|e| e.index());
    assert_eq!(bucketed, linear);
}
