use tracing::trace;

use crate::config::RepairOptions;
use crate::diagnostics::RepairReport;
use crate::geometry::bastion::{Bastion, B0, B1, MOVABLE, S0, S1, TIP};
use crate::math::polygon_2d::{bounding_extent, interior_angle, turn_cross};
use crate::math::radial_2d::clamp_inside;
use crate::math::{is_finite_point, Point2, Vector2, TOLERANCE};

/// Turn cross products below this fraction of `size²` count as collinear.
const COLLINEAR_EPS: f64 = 1e-4;

/// Signed areas below this fraction of `size²` are too small to orient by.
const AREA_EPS: f64 = 1e-6;

/// Slack on the angle bounds so a vertex sitting on a bound does not
/// bounce between fixes.
const ANGLE_HYSTERESIS: f64 = 1e-6;

/// Share of the distance to the base midpoint removed by the fallback.
const FALLBACK_SHRINK: f64 = 0.5;

/// A single constraint violation found by [`audit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Defect {
    /// Near-collinear or wrong-sign turn at `vertex`.
    Turn { vertex: usize, severity: f64 },
    /// Interior angle below the minimum at `vertex`.
    TooSharp { vertex: usize, severity: f64 },
    /// Interior angle above the maximum at `vertex`.
    TooFlat { vertex: usize, severity: f64 },
}

/// Angle bounds in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleBounds {
    pub min: f64,
    pub max: f64,
}

impl AngleBounds {
    #[must_use]
    pub fn from_options(options: &RepairOptions) -> Self {
        Self {
            min: options.min_angle_deg.to_radians(),
            max: options.max_angle_deg.to_radians(),
        }
    }
}

impl Default for AngleBounds {
    fn default() -> Self {
        Self::from_options(&RepairOptions::default())
    }
}

fn size_of(points: &[Point2; 5]) -> f64 {
    bounding_extent(points).max(TOLERANCE)
}

fn turns(points: &[Point2; 5]) -> [f64; 5] {
    std::array::from_fn(|i| turn_cross(&points[(i + 4) % 5], &points[i], &points[(i + 1) % 5]))
}

/// Orientation the bastion is meant to have: from its signed area, or from
/// the majority of its turns when the area is too small to trust.
fn expected_sign(bastion: &Bastion) -> f64 {
    let size = size_of(&bastion.points);
    let area = bastion.signed_area();
    if area.abs() > AREA_EPS * size * size {
        return area.signum();
    }
    let positive = turns(&bastion.points).iter().filter(|c| **c > 0.0).count();
    if positive >= 3 {
        1.0
    } else {
        -1.0
    }
}

/// Finds the worst turn defect, if any.
fn worst_turn(bastion: &Bastion) -> Option<Defect> {
    let size = size_of(&bastion.points);
    let eps = COLLINEAR_EPS * size * size;
    let sign = expected_sign(bastion);
    turns(&bastion.points)
        .iter()
        .enumerate()
        .filter(|(_, c)| c.abs() < eps || c.signum() != sign)
        .map(|(vertex, c)| Defect::Turn {
            vertex,
            severity: eps - c * sign,
        })
        .max_by(|a, b| severity(a).total_cmp(&severity(b)))
}

/// Finds the worst interior-angle defect, if any. Assumes a convex polygon.
fn worst_angle(bastion: &Bastion, bounds: &AngleBounds) -> Option<Defect> {
    let p = &bastion.points;
    (0..5)
        .filter_map(|i| {
            let angle = interior_angle(&p[(i + 4) % 5], &p[i], &p[(i + 1) % 5]);
            if angle < bounds.min - ANGLE_HYSTERESIS {
                Some(Defect::TooSharp {
                    vertex: i,
                    severity: bounds.min - angle,
                })
            } else if MOVABLE.contains(&i) && angle > bounds.max + ANGLE_HYSTERESIS {
                Some(Defect::TooFlat {
                    vertex: i,
                    severity: angle - bounds.max,
                })
            } else {
                None
            }
        })
        .max_by(|a, b| severity(a).total_cmp(&severity(b)))
}

fn severity(defect: &Defect) -> f64 {
    match defect {
        Defect::Turn { severity, .. }
        | Defect::TooSharp { severity, .. }
        | Defect::TooFlat { severity, .. } => *severity,
    }
}

/// Worst violation of strict convexity or the angle bounds.
///
/// Turn defects take precedence: angles are only meaningful once the
/// polygon is convex. The upper angle bound applies to the shoulders and
/// the tip only.
#[must_use]
pub fn audit(bastion: &Bastion, bounds: &AngleBounds) -> Option<Defect> {
    worst_turn(bastion).or_else(|| worst_angle(bastion, bounds))
}

/// Whether the bastion is strictly convex and within the angle bounds.
#[must_use]
pub fn is_sound(bastion: &Bastion, bounds: &AngleBounds) -> bool {
    bastion.is_finite() && audit(bastion, bounds).is_none()
}

/// Iteratively nudges a bastion's shoulders and tip until it is strictly
/// convex and its interior angles are within bounds.
///
/// Each iteration fixes only the worst defect with a fixed-size move and
/// re-clamps the movable vertices inside the outer polygon. The base
/// corners never move.
#[derive(Debug)]
pub struct ConvexityRepair<'a> {
    center: Point2,
    outer: Option<&'a [Point2]>,
    margin: f64,
    options: RepairOptions,
}

impl<'a> ConvexityRepair<'a> {
    #[must_use]
    pub fn new(
        center: Point2,
        outer: Option<&'a [Point2]>,
        margin: f64,
        options: RepairOptions,
    ) -> Self {
        Self {
            center,
            outer,
            margin,
            options,
        }
    }

    /// Runs the repair. Never fails: when the budget runs out the
    /// best-effort polygon is returned with `ok == false`.
    #[must_use]
    pub fn execute(&self, bastion: Bastion) -> (Bastion, RepairReport) {
        let bounds = AngleBounds::from_options(&self.options);
        let mut current = bastion;
        for iteration in 0..self.options.iterations {
            let Some(defect) = audit(&current, &bounds) else {
                return (
                    current,
                    RepairReport {
                        ok: true,
                        iterations: iteration,
                        fallback_used: false,
                    },
                );
            };
            trace!(iteration, ?defect, "repairing bastion");
            current = self.fix(current, defect);
        }
        if is_sound(&current, &bounds) {
            return (
                current,
                RepairReport {
                    ok: true,
                    iterations: self.options.iterations,
                    fallback_used: false,
                },
            );
        }

        let shrunk = self.fallback(current);
        let ok = is_sound(&shrunk, &bounds);
        (
            shrunk,
            RepairReport {
                ok,
                iterations: self.options.iterations,
                fallback_used: true,
            },
        )
    }

    fn fix(&self, bastion: Bastion, defect: Defect) -> Bastion {
        match defect {
            Defect::Turn { vertex, .. } | Defect::TooSharp { vertex, .. }
                if vertex == B0 || vertex == B1 =>
            {
                self.lift_shoulder(bastion, vertex)
            }
            Defect::Turn { vertex, .. } => self.bulge(bastion, vertex),
            Defect::TooSharp { vertex, .. } => self.toward_base(bastion, &[vertex]),
            Defect::TooFlat { vertex, .. } => self.away_from_base(bastion, vertex),
        }
    }

    /// Pushes a reflex or flat movable vertex away from the base midpoint.
    /// When the outer hull cancels that move, pulls its movable neighbours
    /// toward the base instead, which sharpens the turn just as well.
    fn bulge(&self, bastion: Bastion, vertex: usize) -> Bastion {
        let moved = self.away_from_base(bastion, vertex);
        let progress = (moved.points[vertex] - bastion.points[vertex]).norm();
        let stride = self.options.step * (bastion.points[vertex] - bastion.base_midpoint()).norm();
        if progress > 0.1 * stride {
            return moved;
        }
        let neighbours: Vec<usize> = [(vertex + 4) % 5, (vertex + 1) % 5]
            .into_iter()
            .filter(|i| MOVABLE.contains(i))
            .collect();
        self.toward_base(bastion, &neighbours)
    }

    fn away_from_base(&self, bastion: Bastion, vertex: usize) -> Bastion {
        let mid = bastion.base_midpoint();
        let p = bastion.points[vertex];
        let mut offset = p - mid;
        if offset.norm() < TOLERANCE {
            let reach = (bastion.base_width() * 0.5).max(TOLERANCE);
            offset = bastion.outward_normal(&self.center) * reach;
        }
        self.moved(bastion, vertex, p + offset * self.options.step)
    }

    fn toward_base(&self, bastion: Bastion, vertices: &[usize]) -> Bastion {
        let mid = bastion.base_midpoint();
        let mut out = bastion;
        for &v in vertices {
            let p = out.points[v];
            out = self.moved(out, v, p + (mid - p) * self.options.step);
        }
        out
    }

    /// Fixes a base corner by lifting its shoulder along the base normal.
    fn lift_shoulder(&self, bastion: Bastion, corner: usize) -> Bastion {
        let shoulder = if corner == B0 { S0 } else { S1 };
        let normal: Vector2 = bastion.outward_normal(&self.center);
        let lift = self.options.step * bastion.base_width().max(TOLERANCE);
        let target = bastion.points[shoulder] + normal * lift;
        self.moved(bastion, shoulder, target)
    }

    /// Replaces one movable vertex, re-clamped inside the outer polygon.
    /// Non-finite candidates are discarded.
    fn moved(&self, bastion: Bastion, vertex: usize, candidate: Point2) -> Bastion {
        let clamped = match self.outer {
            Some(outer) => clamp_inside(&self.center, &candidate, outer, self.margin),
            None => candidate,
        };
        if !is_finite_point(&clamped) {
            return bastion;
        }
        let mut out = bastion;
        out.points[vertex] = clamped;
        out
    }

    /// Pulls every movable vertex halfway toward the base midpoint.
    fn fallback(&self, bastion: Bastion) -> Bastion {
        let mid = bastion.base_midpoint();
        let mut out = bastion;
        for v in [S0, TIP, S1] {
            let p = out.points[v];
            out = self.moved(out, v, p + (mid - p) * FALLBACK_SHRINK);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::bastion::tests::upright;
    use crate::math::from_polar;
    use std::f64::consts::TAU;

    fn center() -> Point2 {
        Point2::new(0.0, -60.0)
    }

    fn repair(options: RepairOptions) -> ConvexityRepair<'static> {
        ConvexityRepair::new(center(), None, 0.0, options)
    }

    fn assert_strictly_convex(b: &Bastion) {
        let size = size_of(&b.points);
        let eps = COLLINEAR_EPS * size * size;
        let t = turns(&b.points);
        let sign = t[0].signum();
        for c in t {
            assert!(c.signum() == sign && c.abs() >= eps, "turns={t:?}");
        }
    }

    #[test]
    fn sound_bastion_needs_no_work() {
        let (out, report) = repair(RepairOptions::default()).execute(upright());
        assert!(report.ok);
        assert_eq!(report.iterations, 0);
        assert_eq!(out, upright());
    }

    #[test]
    fn collinear_tip_is_repaired() {
        let b = Bastion::new([
            Point2::new(-10.0, 0.0),
            Point2::new(-10.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
        ]);
        let options = RepairOptions {
            iterations: 50,
            ..RepairOptions::default()
        };
        let (out, report) = repair(options).execute(b);
        assert!(report.ok, "report={report:?} out={out:?}");
        assert!(report.iterations <= 50);
        assert_strictly_convex(&out);
        assert_eq!(out.points[B0], b.points[B0]);
        assert_eq!(out.points[B1], b.points[B1]);
        assert!(is_sound(&out, &AngleBounds::default()));
    }

    #[test]
    fn concave_tip_is_repaired() {
        let b = Bastion::new([
            Point2::new(-10.0, 0.0),
            Point2::new(-10.0, 10.0),
            Point2::new(0.0, 6.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
        ]);
        let options = RepairOptions {
            iterations: 50,
            ..RepairOptions::default()
        };
        let (out, report) = repair(options).execute(b);
        assert!(report.ok, "report={report:?} out={out:?}");
        assert!(!report.fallback_used);
        assert!(report.iterations <= 50);
        assert_strictly_convex(&out);
        assert!(is_sound(&out, &AngleBounds::default()));
        assert_eq!(out.points[B0], b.points[B0]);
        assert_eq!(out.points[B1], b.points[B1]);
    }

    #[test]
    fn spiky_tip_is_blunted() {
        let b = Bastion::new([
            Point2::new(-10.0, 0.0),
            Point2::new(-8.0, 10.0),
            Point2::new(0.0, 60.0),
            Point2::new(8.0, 10.0),
            Point2::new(10.0, 0.0),
        ]);
        let (out, report) = repair(RepairOptions::default()).execute(b);
        assert!(report.ok, "report={report:?} out={out:?}");
        let angle = interior_angle(&out.points[S0], &out.points[TIP], &out.points[S1]);
        assert!(angle >= 30f64.to_radians() - 1e-6);
    }

    #[test]
    fn base_corner_exempt_from_upper_bound() {
        // Obtuse base corners (about 158°) are accepted; the same angle at a
        // shoulder would not be.
        let b = Bastion::new([
            Point2::new(-10.0, 0.0),
            Point2::new(-20.0, 4.0),
            Point2::new(0.0, 25.0),
            Point2::new(20.0, 4.0),
            Point2::new(10.0, 0.0),
        ]);
        let bounds = AngleBounds::default();
        let base_angle = interior_angle(&b.points[B1], &b.points[B0], &b.points[S0]);
        assert!(base_angle > bounds.max);
        assert!(!matches!(
            audit(&b, &bounds),
            Some(Defect::TooFlat { vertex: B0 | B1, .. })
        ));
    }

    #[test]
    fn shoulder_dipping_behind_base_is_lifted() {
        let b = Bastion::new([
            Point2::new(-10.0, 0.0),
            Point2::new(-14.0, -3.0),
            Point2::new(0.0, 15.0),
            Point2::new(11.5, 8.25),
            Point2::new(10.0, 0.0),
        ]);
        let (out, report) = repair(RepairOptions::default()).execute(b);
        assert!(report.ok, "report={report:?} out={out:?}");
        assert!(out.points[S0].y > b.points[S0].y);
    }

    #[test]
    fn outer_hull_is_respected_while_repairing() {
        #[allow(clippy::cast_precision_loss)]
        let hull: Vec<Point2> = (0..32)
            .map(|i| from_polar(&center(), 75.0, TAU * i as f64 / 32.0))
            .collect();
        let b = Bastion::new([
            Point2::new(-10.0, 0.0),
            Point2::new(-10.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
        ]);
        let repair = ConvexityRepair::new(center(), Some(&hull), 1.0, RepairOptions::default());
        let (out, report) = repair.execute(b);
        for v in MOVABLE {
            assert!((out.points[v] - center()).norm() <= 74.0 + 1e-6);
        }
        assert!(report.ok || report.fallback_used);
    }

    #[test]
    fn exhausted_budget_keeps_five_finite_points() {
        // Tip folded behind the base: one iteration cannot fix it.
        let b = Bastion::new([
            Point2::new(-10.0, 0.0),
            Point2::new(-10.0, 10.0),
            Point2::new(0.0, -20.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
        ]);
        let options = RepairOptions {
            iterations: 1,
            ..RepairOptions::default()
        };
        let (out, report) = repair(options).execute(b);
        assert_eq!(out.points.len(), 5);
        assert!(out.is_finite());
        if !report.ok {
            assert!(report.fallback_used);
        }
    }
}
