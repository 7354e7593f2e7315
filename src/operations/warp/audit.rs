use tracing::warn;

use crate::config::ClampMargins;
use crate::diagnostics::{ContainmentRule, ContainmentViolation};
use crate::geometry::Bastion;
use crate::math::intersect_2d::farthest_intersection;
use crate::math::{is_finite_point, Point2, RADIUS_FLOOR};

/// Slack allowed before a vertex counts as outside its hull.
const AUDIT_SLACK: f64 = 1e-6;

/// Boundary radius along the ray through `p`, with `p`'s own radius.
fn measure(center: &Point2, p: &Point2, hull: &[Point2]) -> Option<(f64, f64)> {
    if !is_finite_point(p) {
        return None;
    }
    let off = p - center;
    let r = off.norm();
    if r < RADIUS_FLOOR {
        return None;
    }
    farthest_intersection(center, &(off / r), hull).map(|boundary| (r, boundary))
}

/// Re-checks the final geometry against both hulls.
///
/// Curtain vertices must lie at least `margins.inner` outside the inner
/// hull; bastion vertices no more than `margins.outer` beyond the outer
/// hull. Vertices whose boundary cannot be measured are reported as
/// [`ContainmentRule::Unmeasured`].
#[must_use]
pub fn audit_containment(
    center: &Point2,
    curtain: &[Point2],
    bastions: &[Bastion],
    inner: &[Point2],
    outer: &[Point2],
    margins: &ClampMargins,
) -> Vec<ContainmentViolation> {
    let mut violations = Vec::new();
    for (vertex, p) in curtain.iter().enumerate() {
        match measure(center, p, inner) {
            Some((r, boundary)) => {
                let excess = boundary + margins.inner - r;
                if excess > AUDIT_SLACK {
                    violations.push(ContainmentViolation {
                        rule: ContainmentRule::CurtainInsideInner,
                        bastion: None,
                        vertex,
                        excess,
                    });
                }
            }
            None => violations.push(ContainmentViolation {
                rule: ContainmentRule::Unmeasured,
                bastion: None,
                vertex,
                excess: 0.0,
            }),
        }
    }
    for (index, bastion) in bastions.iter().enumerate() {
        for (vertex, p) in bastion.points.iter().enumerate() {
            match measure(center, p, outer) {
                Some((r, boundary)) => {
                    let excess = r - (boundary + margins.outer);
                    if excess > AUDIT_SLACK {
                        violations.push(ContainmentViolation {
                            rule: ContainmentRule::BastionOutsideOuter,
                            bastion: Some(index),
                            vertex,
                            excess,
                        });
                    }
                }
                None => violations.push(ContainmentViolation {
                    rule: ContainmentRule::Unmeasured,
                    bastion: Some(index),
                    vertex,
                    excess: 0.0,
                }),
            }
        }
    }
    if !violations.is_empty() {
        warn!(count = violations.len(), "containment audit found violations");
    }
    violations
}
