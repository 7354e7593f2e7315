use crate::math::angle_2d::AngularSpan;
use crate::math::polygon_2d::{signed_area_2d, vertex_centroid};
use crate::math::{is_finite_point, polar, Point2, Vector2, TOLERANCE};

/// Index of the first base corner.
pub const B0: usize = 0;
/// Index of the first shoulder.
pub const S0: usize = 1;
/// Index of the tip.
pub const TIP: usize = 2;
/// Index of the second shoulder.
pub const S1: usize = 3;
/// Index of the second base corner.
pub const B1: usize = 4;

/// Indices of the vertices repair stages may move.
pub const MOVABLE: [usize; 3] = [S0, TIP, S1];

/// A 5-point bastion `[B0, S0, T, S1, B1]`.
///
/// `B0` and `B1` sit on the curtain and stay fixed; the shoulders and the
/// tip project outward and may be moved by the repair stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bastion {
    pub points: [Point2; 5],
}

impl Bastion {
    #[must_use]
    pub fn new(points: [Point2; 5]) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn base_midpoint(&self) -> Point2 {
        Point2::from((self.points[B0].coords + self.points[B1].coords) * 0.5)
    }

    #[must_use]
    pub fn base_width(&self) -> f64 {
        (self.points[B1] - self.points[B0]).norm()
    }

    /// Unit normal of the base pointing away from the body of the bastion.
    ///
    /// Falls back to the radial direction of the base midpoint when the
    /// base is degenerate.
    #[must_use]
    pub fn outward_normal(&self, center: &Point2) -> Vector2 {
        let base = self.points[B1] - self.points[B0];
        let mid = self.base_midpoint();
        let len = base.norm();
        if len < TOLERANCE {
            let radial = mid - center;
            let r = radial.norm();
            return if r < TOLERANCE {
                Vector2::new(1.0, 0.0)
            } else {
                radial / r
            };
        }
        let n = Vector2::new(-base.y, base.x) / len;
        let tip_side = self.points[TIP] - mid;
        // Prefer the side the tip is on; a tip that folded back through the
        // base falls back to the side facing away from the center.
        let reference = if tip_side.norm() > TOLERANCE && tip_side.dot(&n).abs() > TOLERANCE {
            tip_side
        } else {
            mid - center
        };
        if reference.dot(&n) < 0.0 {
            -n
        } else {
            n
        }
    }

    /// Distance from the base midpoint to the tip along the outward normal.
    #[must_use]
    pub fn depth(&self, center: &Point2) -> f64 {
        (self.points[TIP] - self.base_midpoint()).dot(&self.outward_normal(center))
    }

    #[must_use]
    pub fn centroid(&self) -> Point2 {
        vertex_centroid(&self.points).unwrap_or_else(|| self.base_midpoint())
    }

    #[must_use]
    pub fn signed_area(&self) -> f64 {
        signed_area_2d(&self.points)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(is_finite_point)
    }
}

/// A bastion as produced by the layout generator, before fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BastionDescriptor {
    pub polygon: Bastion,
    pub shoulders: [Point2; 2],
}

impl BastionDescriptor {
    /// Builds a descriptor whose shoulders are the polygon's own shoulders.
    #[must_use]
    pub fn from_polygon(polygon: Bastion) -> Self {
        Self {
            shoulders: [polygon.points[S0], polygon.points[S1]],
            polygon,
        }
    }

    /// Whether the polygon and the shoulder markers are all finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.polygon.is_finite() && self.shoulders.iter().all(is_finite_point)
    }

    /// Angular span between the shoulders, seen from `center`.
    #[must_use]
    pub fn shoulder_span(&self, center: &Point2) -> AngularSpan {
        let (_, a) = polar(center, &self.shoulders[0]);
        let (_, b) = polar(center, &self.shoulders[1]);
        AngularSpan::from_endpoints(a, b)
    }

    /// Angle of the polygon's centroid, seen from `center`.
    #[must_use]
    pub fn centroid_angle(&self, center: &Point2) -> f64 {
        polar(center, &self.polygon.centroid()).1
    }
}
