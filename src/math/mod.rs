pub mod angle_2d;
pub mod intersect_2d;
pub mod polygon_2d;
pub mod radial_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Radius below which a point is treated as sitting on the center.
pub const RADIUS_FLOOR: f64 = 1e-9;

/// Returns `true` if both coordinates are finite.
#[must_use]
pub fn is_finite_point(p: &Point2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// 2D cross product (z component of the 3D cross product).
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Unit direction for an angle measured counter-clockwise from +X.
#[must_use]
pub fn direction(theta: f64) -> Vector2 {
    Vector2::new(theta.cos(), theta.sin())
}

/// Polar coordinates `(r, theta)` of `p` relative to `center`, with
/// `theta` in `[0, 2π)`.
#[must_use]
pub fn polar(center: &Point2, p: &Point2) -> (f64, f64) {
    let off = p - center;
    (off.norm(), angle_2d::wrap_angle(off.y.atan2(off.x)))
}

/// Point at `radius` along `theta` from `center`.
#[must_use]
pub fn from_polar(center: &Point2, radius: f64, theta: f64) -> Point2 {
    center + direction(theta) * radius
}
