use tracing::{debug, warn};

use crate::config::ShrinkOptions;
use crate::diagnostics::ShrinkReport;
use crate::geometry::bastion::{Bastion, MOVABLE};
use crate::math::intersect_2d::farthest_intersection;
use crate::math::radial_2d::{clamp_inside, clamp_outside, clamp_radius};
use crate::math::{is_finite_point, Point2, Vector2, RADIUS_FLOOR, TOLERANCE};

/// First upper bracket tried for the shrink parameter.
const INITIAL_BRACKET: f64 = 1.0 / 64.0;

/// Radii within this distance of the limit count as inside.
const FIT_SLACK: f64 = 1e-9;

/// Outer limit a bastion must stay within.
#[derive(Debug, Clone, Copy)]
pub enum RadialBound<'a> {
    /// Fixed radius around the center.
    Circle(f64),
    /// `margin` inside a polygon, measured along each ray.
    Polygon { ring: &'a [Point2], margin: f64 },
}

impl RadialBound<'_> {
    /// Largest allowed radius along the unit direction `dir`, or `None`
    /// when the polygon is not hit.
    #[must_use]
    pub fn limit(&self, center: &Point2, dir: &Vector2) -> Option<f64> {
        match self {
            Self::Circle(r) => Some(*r),
            Self::Polygon { ring, margin } => {
                farthest_intersection(center, dir, ring).map(|b| b - margin)
            }
        }
    }

    /// How far `p` lies past the bound; negative when inside. `None` when
    /// the bound cannot be measured along the ray through `p`.
    #[must_use]
    pub fn overshoot(&self, center: &Point2, p: &Point2) -> Option<f64> {
        let off = p - center;
        let r = off.norm();
        if !r.is_finite() || r < RADIUS_FLOOR {
            return None;
        }
        self.limit(center, &(off / r)).map(|limit| r - limit)
    }

    /// Pulls `p` back inside the bound.
    #[must_use]
    pub fn clamp(&self, center: &Point2, p: &Point2) -> Point2 {
        match self {
            Self::Circle(r) => clamp_radius(center, p, 0.0, *r),
            Self::Polygon { ring, margin } => clamp_inside(center, p, ring, *margin),
        }
    }

    /// Whether every movable vertex is inside the bound. Unmeasurable
    /// vertices are not counted against it.
    #[must_use]
    pub fn contains(&self, center: &Point2, bastion: &Bastion) -> bool {
        MOVABLE.iter().all(|&v| {
            self.overshoot(center, &bastion.points[v])
                .is_none_or(|o| o <= FIT_SLACK)
        })
    }
}

/// The blended transform for one bastion, before a shrink parameter is
/// chosen.
#[derive(Debug, Clone, Copy)]
pub struct ShrinkPlan {
    source: Bastion,
    centroid: Point2,
    scale_k: f64,
    gain: f64,
    worst_overshoot: f64,
    /// Inward correction per vertex; zero for vertices within the bound.
    corrections: [Vector2; 5],
}

impl ShrinkPlan {
    #[must_use]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[must_use]
    pub fn worst_overshoot(&self) -> f64 {
        self.worst_overshoot
    }

    /// The bastion transformed with shrink parameter `t`. Base corners are
    /// left in place.
    #[must_use]
    pub fn apply(&self, t: f64) -> Bastion {
        let mut out = self.source;
        let c = self.centroid;
        for v in MOVABLE {
            let p = self.source.points[v];
            let q =
                c + (p - c) * (1.0 - self.scale_k * t) + self.corrections[v] * (t * self.gain);
            if is_finite_point(&q) {
                out.points[v] = q;
            }
        }
        out
    }
}

/// Finds the smallest deformation that brings a bastion's shoulders and tip
/// inside a [`RadialBound`].
///
/// The deformation is a uniform scale about the centroid by `1 - k·T`
/// plus, for each violating vertex, a radial pull of `T · gain` times its
/// overshoot. The gain grows with how badly the bastion overshoots compared
/// to its own size and its distance from the center.
#[derive(Debug)]
pub struct ShrinkToFit<'a> {
    center: Point2,
    bound: RadialBound<'a>,
    inner: Option<(&'a [Point2], f64)>,
    options: ShrinkOptions,
}

impl<'a> ShrinkToFit<'a> {
    #[must_use]
    pub fn new(center: Point2, bound: RadialBound<'a>, options: ShrinkOptions) -> Self {
        Self {
            center,
            bound,
            inner: None,
            options,
        }
    }

    /// Polygon the result must stay outside of, with its margin.
    #[must_use]
    pub fn inner(mut self, ring: &'a [Point2], margin: f64) -> Self {
        self.inner = Some((ring, margin));
        self
    }

    /// Builds the transform for `bastion`, or `None` when it already fits.
    #[must_use]
    pub fn plan(&self, bastion: &Bastion) -> Option<ShrinkPlan> {
        let mut corrections = [Vector2::zeros(); 5];
        let mut worst = 0.0_f64;
        for v in MOVABLE {
            let p = bastion.points[v];
            let Some(over) = self.bound.overshoot(&self.center, &p) else {
                continue;
            };
            if over > FIT_SLACK {
                let dir = (p - self.center).normalize();
                corrections[v] = -dir * over;
                worst = worst.max(over);
            }
        }
        if worst <= FIT_SLACK {
            return None;
        }

        let centroid = bastion.centroid();
        let spread = bastion
            .points
            .iter()
            .map(|p| (p - centroid).norm())
            .fold(0.0, f64::max);
        let apex_clearance = bastion.depth(&self.center);
        let ws = ratio(worst, spread);
        let wa = ratio(worst, apex_clearance);
        let wc = self.center_weight(&centroid);
        let o = &self.options;
        let gain = (1.0 + o.spread_weight * ws + o.apex_weight * wa + o.center_weight * wc)
            .clamp(1.0, o.max_gain.max(1.0));

        Some(ShrinkPlan {
            source: *bastion,
            centroid,
            scale_k: o.scale_k,
            gain,
            worst_overshoot: worst,
            corrections,
        })
    }

    fn center_weight(&self, centroid: &Point2) -> f64 {
        let off = centroid - self.center;
        let r = off.norm();
        if r < RADIUS_FLOOR {
            return 0.0;
        }
        match self.bound.limit(&self.center, &(off / r)) {
            Some(limit) => ratio(r, limit),
            None => 0.0,
        }
    }

    /// Shrinks `bastion` into the bound. Returns the bastion untouched and
    /// no report when it already fits.
    #[must_use]
    pub fn execute(&self, bastion: Bastion) -> (Bastion, Option<ShrinkReport>) {
        let Some(plan) = self.plan(&bastion) else {
            return (bastion, None);
        };
        let fits = |t: f64| self.bound.contains(&self.center, &plan.apply(t));

        let mut lo = 0.0;
        let mut hi = INITIAL_BRACKET;
        while !fits(hi) && hi < 1.0 {
            lo = hi;
            hi = (hi * 2.0).min(1.0);
        }
        let saturated = !fits(hi);
        if saturated {
            warn!(
                overshoot = plan.worst_overshoot,
                "bastion still overshoots at full shrink"
            );
        } else {
            let tolerance = self.options.tolerance.max(TOLERANCE);
            while hi - lo > tolerance {
                let mid = 0.5 * (lo + hi);
                if fits(mid) {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }
        }
        debug!(t = hi, gain = plan.gain, overshoot = plan.worst_overshoot, "shrink-to-fit");

        let shrunk = self.safety_net(plan.apply(hi));
        (
            shrunk,
            Some(ShrinkReport {
                t: hi,
                gain: plan.gain,
                worst_overshoot: plan.worst_overshoot,
                saturated,
            }),
        )
    }

    /// Clamps the movable vertices outside the inner polygon, then inside
    /// the bound.
    fn safety_net(&self, bastion: Bastion) -> Bastion {
        let mut out = bastion;
        for v in MOVABLE {
            let mut p = out.points[v];
            if let Some((ring, margin)) = self.inner {
                p = clamp_outside(&self.center, &p, ring, margin);
            }
            out.points[v] = self.bound.clamp(&self.center, &p);
        }
        out
    }
}

/// `num / den` clamped to `[0, 1]`; a non-positive denominator saturates.
fn ratio(num: f64, den: f64) -> f64 {
    if den <= TOLERANCE {
        return 1.0;
    }
    (num / den).clamp(0.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::bastion::TIP;
    use crate::math::from_polar;
    use std::f64::consts::TAU;

    /// Bastion facing +Y whose tip sits at radius 240.
    fn overshooting() -> Bastion {
        Bastion::new([
            Point2::new(-20.0, 180.0),
            Point2::new(-25.0, 215.0),
            Point2::new(0.0, 240.0),
            Point2::new(25.0, 215.0),
            Point2::new(20.0, 180.0),
        ])
    }

    fn max_radius(b: &Bastion) -> f64 {
        b.points.iter().map(|p| p.coords.norm()).fold(0.0, f64::max)
    }

    #[test]
    fn finds_minimal_shrink_parameter() {
        let bound = RadialBound::Circle(200.0);
        let shrink = ShrinkToFit::new(Point2::origin(), bound, ShrinkOptions::default());
        let source = overshooting();
        let plan = shrink.plan(&source).unwrap();
        assert!((plan.worst_overshoot() - 40.0).abs() < 1e-9);

        let (out, report) = shrink.execute(source);
        let report = report.unwrap();
        assert!(!report.saturated);
        assert!(report.t > 0.0 && report.t <= 1.0);
        assert!(max_radius(&plan.apply(report.t)) <= 200.0 + 1e-9);
        assert!(max_radius(&plan.apply(report.t - 1e-3)) > 200.0);
        assert!(max_radius(&out) <= 200.0 + 1e-9);
        // Base corners never move.
        assert_eq!(out.points[0], source.points[0]);
        assert_eq!(out.points[4], source.points[4]);
    }

    #[test]
    fn fitting_bastion_is_untouched() {
        let bound = RadialBound::Circle(300.0);
        let shrink = ShrinkToFit::new(Point2::origin(), bound, ShrinkOptions::default());
        let (out, report) = shrink.execute(overshooting());
        assert!(report.is_none());
        assert_eq!(out, overshooting());
    }

    #[test]
    fn gain_is_bounded() {
        let options = ShrinkOptions {
            max_gain: 1.5,
            ..ShrinkOptions::default()
        };
        let shrink = ShrinkToFit::new(Point2::origin(), RadialBound::Circle(150.0), options);
        let plan = shrink.plan(&overshooting()).unwrap();
        assert!(plan.gain() >= 1.0 && plan.gain() <= 1.5);
    }

    #[test]
    fn polygon_bound_uses_margin() {
        #[allow(clippy::cast_precision_loss)]
        let ring: Vec<Point2> = (0..64)
            .map(|i| from_polar(&Point2::origin(), 210.0, TAU * i as f64 / 64.0))
            .collect();
        let bound = RadialBound::Polygon {
            ring: &ring,
            margin: 5.0,
        };
        let shrink = ShrinkToFit::new(Point2::origin(), bound, ShrinkOptions::default());
        let (out, report) = shrink.execute(overshooting());
        assert!(report.is_some());
        assert!(bound.contains(&Point2::origin(), &out));
        assert!(out.points[TIP].coords.norm() <= 205.0 + 1e-9);
    }

    #[test]
    fn unreachable_bound_saturates_and_clamps() {
        // Shoulders start inside radius 100 but drift out as the bastion
        // shrinks toward its far-out centroid, while the tip only gets
        // inside near full shrink: no parameter satisfies both.
        let source = Bastion::new([
            Point2::new(-20.0, 60.0),
            Point2::new(-30.0, 90.0),
            Point2::new(0.0, 1000.0),
            Point2::new(30.0, 90.0),
            Point2::new(20.0, 60.0),
        ]);
        let options = ShrinkOptions {
            max_gain: 1.0,
            ..ShrinkOptions::default()
        };
        let bound = RadialBound::Circle(100.0);
        let shrink = ShrinkToFit::new(Point2::origin(), bound, options);
        let plan = shrink.plan(&source).unwrap();
        assert!((plan.gain() - 1.0).abs() < f64::EPSILON);
        for k in 0..=1000 {
            let t = f64::from(k) / 1000.0;
            assert!(!bound.contains(&Point2::origin(), &plan.apply(t)), "fits at t={t}");
        }

        let (out, report) = shrink.execute(source);
        let report = report.unwrap();
        assert!(report.saturated);
        assert!((report.t - 1.0).abs() < f64::EPSILON);
        let unclamped = plan.apply(1.0);
        assert!(unclamped.points[TIP].coords.norm() > 100.0);
        for v in MOVABLE {
            assert!(out.points[v].coords.norm() <= 100.0 + 1e-9);
        }
        // The safety net pulls the tip radially onto the bound.
        assert!((out.points[TIP].coords.norm() - 100.0).abs() < 1e-9);
        assert_eq!(out.points[0], source.points[0]);
        assert_eq!(out.points[4], source.points[4]);
    }

    #[test]
    fn safety_net_respects_inner_polygon() {
        #[allow(clippy::cast_precision_loss)]
        let inner: Vec<Point2> = (0..64)
            .map(|i| from_polar(&Point2::origin(), 150.0, TAU * i as f64 / 64.0))
            .collect();
        let bound = RadialBound::Circle(100.0);
        let shrink =
            ShrinkToFit::new(Point2::origin(), bound, ShrinkOptions::default()).inner(&inner, 2.0);
        let (out, _) = shrink.execute(overshooting());
        // The bound wins when the two conflict.
        for v in MOVABLE {
            assert!(out.points[v].coords.norm() <= 100.0 + 1e-9);
        }
    }
}
