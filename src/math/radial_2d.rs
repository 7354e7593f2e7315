//! Radial clamps: moving points along their ray from a fixed center so they
//! respect polygon boundaries.
//!
//! Every clamp leaves its input untouched when the boundary along the ray
//! cannot be determined (no hit, inverted band, point on the center). The
//! ring variants return how many vertices actually moved.

use super::intersect_2d::farthest_intersection;
use super::{is_finite_point, Point2, Vector2, RADIUS_FLOOR};

/// Unit ray direction and radius of `p` seen from `center`, or `None` when
/// `p` sits on the center or is not finite.
fn ray_of(center: &Point2, p: &Point2) -> Option<(Vector2, f64)> {
    if !is_finite_point(p) {
        return None;
    }
    let off = p - center;
    let r = off.norm();
    if r < RADIUS_FLOOR {
        return None;
    }
    Some((off / r, r))
}

/// Boundary radius of `polygon` along `dir` from `center`.
#[must_use]
pub fn boundary_radius(center: &Point2, dir: &Vector2, polygon: &[Point2]) -> Option<f64> {
    farthest_intersection(center, dir, polygon)
}

/// Boundary radii of `inner` and `outer` along `dir`, as `(inner, outer)`.
///
/// Returns `None` if either boundary is missed.
#[must_use]
pub fn radial_bounds(
    center: &Point2,
    dir: &Vector2,
    inner: &[Point2],
    outer: &[Point2],
) -> Option<(f64, f64)> {
    let lo = farthest_intersection(center, dir, inner)?;
    let hi = farthest_intersection(center, dir, outer)?;
    Some((lo, hi))
}

/// Pushes `p` radially outward so that it lies at least `margin` beyond
/// `polygon`.
#[must_use]
pub fn clamp_outside(center: &Point2, p: &Point2, polygon: &[Point2], margin: f64) -> Point2 {
    let Some((dir, r)) = ray_of(center, p) else {
        return *p;
    };
    match farthest_intersection(center, &dir, polygon) {
        Some(boundary) if r < boundary + margin => center + dir * (boundary + margin),
        _ => *p,
    }
}

/// Pulls `p` radially inward so that it lies at least `margin` inside
/// `polygon`. The target radius is floored at zero.
#[must_use]
pub fn clamp_inside(center: &Point2, p: &Point2, polygon: &[Point2], margin: f64) -> Point2 {
    let Some((dir, r)) = ray_of(center, p) else {
        return *p;
    };
    match farthest_intersection(center, &dir, polygon) {
        Some(boundary) if r > boundary - margin => center + dir * (boundary - margin).max(0.0),
        _ => *p,
    }
}

/// Clamps the radius of `p` into `[lo, hi]`. An inverted range leaves `p`
/// untouched.
#[must_use]
pub fn clamp_radius(center: &Point2, p: &Point2, lo: f64, hi: f64) -> Point2 {
    let Some((dir, r)) = ray_of(center, p) else {
        return *p;
    };
    if lo.is_nan() || hi.is_nan() || lo > hi {
        return *p;
    }
    if r < lo {
        center + dir * lo
    } else if r > hi {
        center + dir * hi.max(0.0)
    } else {
        *p
    }
}

/// Clamps `p` into the band `[inner + margin, outer - margin]` measured
/// along its ray.
///
/// Missing or inverted bounds leave the point where it is: a point that
/// cannot be placed correctly is not moved somewhere arbitrary.
#[must_use]
pub fn clamp_mid_band(
    center: &Point2,
    p: &Point2,
    inner: &[Point2],
    outer: &[Point2],
    margin: f64,
) -> Point2 {
    let Some((dir, _)) = ray_of(center, p) else {
        return *p;
    };
    match radial_bounds(center, &dir, inner, outer) {
        Some((lo, hi)) => clamp_radius(center, p, lo + margin, hi - margin),
        None => *p,
    }
}

fn map_ring(ring: &[Point2], mut f: impl FnMut(&Point2) -> Point2) -> (Vec<Point2>, usize) {
    let mut moved = 0;
    let out = ring
        .iter()
        .map(|p| {
            if !is_finite_point(p) {
                return *p;
            }
            let q = f(p);
            if (q - p).norm_squared() > 0.0 {
                moved += 1;
            }
            q
        })
        .collect();
    (out, moved)
}

/// [`clamp_outside`] applied to every finite vertex.
#[must_use]
pub fn clamp_ring_outside(
    center: &Point2,
    ring: &[Point2],
    polygon: &[Point2],
    margin: f64,
) -> (Vec<Point2>, usize) {
    map_ring(ring, |p| clamp_outside(center, p, polygon, margin))
}

/// [`clamp_inside`] applied to every finite vertex.
#[must_use]
pub fn clamp_ring_inside(
    center: &Point2,
    ring: &[Point2],
    polygon: &[Point2],
    margin: f64,
) -> (Vec<Point2>, usize) {
    map_ring(ring, |p| clamp_inside(center, p, polygon, margin))
}

/// [`clamp_mid_band`] applied to every finite vertex.
#[must_use]
pub fn clamp_ring_mid_band(
    center: &Point2,
    ring: &[Point2],
    inner: &[Point2],
    outer: &[Point2],
    margin: f64,
) -> (Vec<Point2>, usize) {
    map_ring(ring, |p| clamp_mid_band(center, p, inner, outer, margin))
}
