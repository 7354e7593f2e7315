use super::{cross_2d, is_finite_point, Point2, Vector2};

/// Determinant threshold below which a ray and a segment are parallel.
const PARALLEL_EPS: f64 = 1e-12;

/// Parameter slack that lets rays hit segment endpoints exactly.
const PARAM_EPS: f64 = 1e-12;

/// Parametric ray-segment intersection in 2D.
///
/// Solves `origin + t * dir = a + u * (b - a)` and returns `t` when
/// `t >= 0` and `u ∈ [0, 1]`. `dir` does not need to be normalized; `t` is
/// measured in multiples of it.
#[must_use]
pub fn ray_segment_intersect_2d(
    origin: &Point2,
    dir: &Vector2,
    a: &Point2,
    b: &Point2,
) -> Option<f64> {
    let edge = b - a;
    let det = cross_2d(dir, &edge);
    if det.abs() < PARALLEL_EPS {
        return None;
    }
    let w = a - origin;
    let t = cross_2d(&w, &edge) / det;
    let u = cross_2d(&w, dir) / det;
    if t < -PARAM_EPS || u < -PARAM_EPS || u > 1.0 + PARAM_EPS {
        return None;
    }
    Some(t.max(0.0))
}

/// Largest ray parameter at which `origin + t * dir` crosses `polygon`.
///
/// When the origin lies inside a non-convex polygon the ray may leave and
/// re-enter it several times; the farthest crossing is the containment
/// radius along that direction. Edges touching a non-finite vertex are
/// skipped.
///
/// Returns `None` if the polygon has fewer than 3 finite vertices or no
/// edge is hit.
#[must_use]
pub fn farthest_intersection(origin: &Point2, dir: &Vector2, polygon: &[Point2]) -> Option<f64> {
    if polygon.iter().filter(|p| is_finite_point(p)).count() < 3 {
        return None;
    }
    let n = polygon.len();
    let mut best: Option<f64> = None;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        if !is_finite_point(a) || !is_finite_point(b) {
            continue;
        }
        if let Some(t) = ray_segment_intersect_2d(origin, dir, a, b) {
            best = Some(best.map_or(t, |cur| cur.max(t)));
        }
    }
    best
}

/// Nearest ray parameter at which `origin + t * dir` crosses `polygon`.
#[must_use]
pub fn nearest_intersection(origin: &Point2, dir: &Vector2, polygon: &[Point2]) -> Option<f64> {
    let n = polygon.len();
    if n < 3 {
        return None;
    }
    (0..n)
        .filter_map(|i| {
            let a = &polygon[i];
            let b = &polygon[(i + 1) % n];
            if is_finite_point(a) && is_finite_point(b) {
                ray_segment_intersect_2d(origin, dir, a, b)
            } else {
                None
            }
        })
        .reduce(f64::min)
}
