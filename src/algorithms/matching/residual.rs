//! Point-to-line and point-to-plane residuals with robust weighting.

use crate::core::types::{FeaturePoint, Vector3};

/// Iteration index from which the robust weight is applied; earlier
/// iterations run unweighted so gross initial misalignment is not discarded.
pub const WEIGHTING_START_ITER: usize = 5;

/// Slope of the distance-based robust weight.
const WEIGHT_SLOPE: f32 = 1.8;

/// Correspondences whose weight falls to this floor are dropped for the
/// iteration.
const MIN_WEIGHT: f32 = 0.1;

/// Weighted residual gradient for one selected correspondence.
///
/// `grad` is the unit direction of steepest residual growth at the query
/// point, scaled by the robust weight; `residual` is the weighted geometric
/// distance.
#[derive(Debug, Clone, Copy)]
pub struct Coefficient {
    pub grad: Vector3,
    pub residual: f32,
}

/// Point-to-line residual for an edge query `o` against the line through
/// `a` and `b`.
///
/// The distance is `‖(o−a)×(o−b)‖ / ‖a−b‖` and the gradient
/// `((a−b)×n) / (‖n‖·‖a−b‖)` with `n = (o−a)×(o−b)`. Returns `None` for
/// degenerate geometry, a zero residual, or a weight at or below the floor.
pub fn edge_coefficient(
    o: &Vector3,
    a: &FeaturePoint,
    b: &FeaturePoint,
    weighted: bool,
) -> Option<Coefficient> {
    let a = a.position();
    let b = b.position();

    let normal = (*o - a).cross(&(*o - b));
    let baseline = a - b;
    let normal_len = normal.norm();
    let baseline_len = baseline.norm();
    if normal_len == 0.0 || baseline_len == 0.0 {
        return None;
    }

    let distance = normal_len / baseline_len;
    let grad = baseline.cross(&normal) * (1.0 / (normal_len * baseline_len));

    let weight = if weighted {
        1.0 - WEIGHT_SLOPE * distance.abs()
    } else {
        1.0
    };
    if weight <= MIN_WEIGHT {
        return None;
    }

    Some(Coefficient {
        grad: grad * weight,
        residual: weight * distance,
    })
}

/// Point-to-plane residual for a planar query `o` against the plane through
/// `a`, `b` and `c`.
///
/// The signed distance is `n·o − n·a` with `n` the unit normal of the
/// triangle; the gradient is `n` itself. The robust weight additionally
/// shrinks with the query's range from the origin, so far returns tolerate
/// larger residuals. Returns `None` for degenerate geometry, a zero
/// residual, or a weight at or below the floor.
pub fn plane_coefficient(
    o: &Vector3,
    a: &FeaturePoint,
    b: &FeaturePoint,
    c: &FeaturePoint,
    weighted: bool,
) -> Option<Coefficient> {
    let a = a.position();
    let b = b.position();
    let c = c.position();

    let normal = (b - a).cross(&(c - a));
    let normal_len = normal.norm();
    if normal_len == 0.0 {
        return None;
    }
    let normal = normal * (1.0 / normal_len);

    let distance = normal.dot(o) - normal.dot(&a);
    if distance == 0.0 {
        return None;
    }

    let weight = if weighted {
        1.0 - WEIGHT_SLOPE * distance.abs() / o.norm().sqrt()
    } else {
        1.0
    };
    if weight <= MIN_WEIGHT {
        return None;
    }

    Some(Coefficient {
        grad: normal * weight,
        residual: weight * distance,
    })
}
