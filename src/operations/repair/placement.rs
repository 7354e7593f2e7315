//! Relocation of bastions that cannot be repaired where they stand.
//!
//! Candidate anchors are the curtain positions with locally maximal
//! outward clearance to the outer hull. A failing bastion is rebuilt at
//! the nearest free candidate (or one of its neighbours) and pushed
//! through the full fitting pipeline again.

use std::collections::BTreeSet;

use tracing::{debug, trace, warn};

use crate::config::SlideOptions;
use crate::diagnostics::{CandidateDiagnostics, ClampStats, RepairReport, ShrinkReport};
use crate::geometry::bastion::{Bastion, B0, B1, S0, S1, TIP};
use crate::geometry::RadialField;
use crate::math::intersect_2d::nearest_intersection;
use crate::math::polygon_2d::{perimeter, project_onto_ring};
use crate::math::{is_finite_point, Point2, Vector2, TOLERANCE};
use crate::operations::apply_field::FieldApplicator;

use super::convexity::{is_sound, AngleBounds};

/// Fewest samples taken along the curtain.
const MIN_CURTAIN_SAMPLES: usize = 8;

/// Shape used when the original bastion cannot serve as a template, as
/// `(tangential, normal)` offsets in units of half base width and depth.
const DEFAULT_SHAPE: [(f64, f64); 5] = [
    (-1.0, 0.0),
    (-1.15, 0.55),
    (0.0, 1.0),
    (1.15, 0.55),
    (1.0, 0.0),
];

/// A curtain position where a bastion could be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementCandidate {
    /// Arc length from the first curtain vertex, in source coordinates.
    pub arc: f64,
    /// Anchor on the source curtain.
    pub anchor: Point2,
    /// Unit outward normal of the source curtain at the anchor.
    pub normal: Vector2,
    /// Distance from the warped anchor to the outer hull along the normal.
    pub clearance: f64,
}

/// Samples the source curtain every `spacing` units and returns the
/// samples whose clearance to `outer`, measured from their warped position
/// along the outward normal, is a local maximum around the ring.
///
/// A sample whose ray misses `outer` has no clearance and is counted in
/// the returned diagnostics.
#[must_use]
pub fn clearance_candidates(
    source_curtain: &[Point2],
    center: Point2,
    curtain_field: &RadialField,
    outer: &[Point2],
    spacing: f64,
) -> (Vec<PlacementCandidate>, CandidateDiagnostics) {
    let samples = resample(source_curtain, center, spacing);
    let n = samples.len();
    let mut diag = CandidateDiagnostics {
        samples: n,
        clearance_misses: 0,
    };
    if n < 3 {
        return (Vec::new(), diag);
    }
    let warp = FieldApplicator::unbanded(curtain_field, center);
    let clearances: Vec<f64> = samples
        .iter()
        .map(|s| {
            let warped = warp.apply_point(&s.anchor);
            nearest_intersection(&warped, &s.normal, outer).unwrap_or_else(|| {
                diag.clearance_misses += 1;
                0.0
            })
        })
        .collect();
    if diag.clearance_misses > 0 {
        warn!(
            misses = diag.clearance_misses,
            samples = n,
            "clearance rays missed the outer hull"
        );
    }

    let candidates: Vec<PlacementCandidate> = (0..n)
        .filter(|&i| {
            let c = clearances[i];
            c > TOLERANCE && c > clearances[(i + n - 1) % n] && c >= clearances[(i + 1) % n]
        })
        .map(|i| PlacementCandidate {
            clearance: clearances[i],
            ..samples[i]
        })
        .collect();
    debug!(samples = n, candidates = candidates.len(), "clearance candidates");
    (candidates, diag)
}

/// Points at uniform arc length along the ring, with outward normals.
fn resample(ring: &[Point2], center: Point2, spacing: f64) -> Vec<PlacementCandidate> {
    let total = perimeter(ring);
    if !total.is_finite() || total <= TOLERANCE || ring.len() < 3 {
        return Vec::new();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = if spacing > TOLERANCE {
        ((total / spacing).ceil() as usize).max(MIN_CURTAIN_SAMPLES)
    } else {
        MIN_CURTAIN_SAMPLES
    };
    #[allow(clippy::cast_precision_loss)]
    let step = total / count as f64;

    let n = ring.len();
    let mut out = Vec::with_capacity(count);
    let mut edge = 0;
    let mut edge_start = 0.0;
    for k in 0..count {
        #[allow(clippy::cast_precision_loss)]
        let s = step * k as f64;
        let mut len = (ring[(edge + 1) % n] - ring[edge]).norm();
        while edge + 1 < n && edge_start + len < s {
            edge_start += len;
            edge += 1;
            len = (ring[(edge + 1) % n] - ring[edge]).norm();
        }
        let a = ring[edge];
        let b = ring[(edge + 1) % n];
        let t = if len > TOLERANCE {
            ((s - edge_start) / len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let anchor = a + (b - a) * t;
        if !is_finite_point(&anchor) {
            continue;
        }
        out.push(PlacementCandidate {
            arc: s,
            anchor,
            normal: outward_normal(&a, &b, &anchor, &center),
            clearance: 0.0,
        });
    }
    out
}

/// Unit normal of edge `a → b` on the side facing away from `center`.
fn outward_normal(a: &Point2, b: &Point2, at: &Point2, center: &Point2) -> Vector2 {
    let d = b - a;
    let radial = at - center;
    let len = d.norm();
    if len < TOLERANCE {
        let r = radial.norm();
        return if r < TOLERANCE {
            Vector2::new(1.0, 0.0)
        } else {
            radial / r
        };
    }
    let n = Vector2::new(d.y, -d.x) / len;
    if n.dot(&radial) < 0.0 {
        -n
    } else {
        n
    }
}

/// A bastion after the full fitting pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedBastion {
    pub polygon: Bastion,
    pub shrink: Option<ShrinkReport>,
    pub repair: RepairReport,
    /// Curtain clamps applied to the base corners.
    pub base_clamps: ClampStats,
}

/// Runs a bastion, given in source coordinates, through every fitting stage.
pub trait FitBastion {
    fn fit(&self, source: Bastion) -> FittedBastion;
}

/// Result of trying to relocate one bastion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideOutcome {
    /// Candidates actually fitted.
    pub attempts: usize,
    /// Index of the accepted candidate and the bastion fitted there.
    pub accepted: Option<(usize, FittedBastion)>,
}

/// Relocates a failing bastion to the nearest free clearance candidate.
#[derive(Debug)]
pub struct SlideRepair<'a> {
    candidates: &'a [PlacementCandidate],
    source_curtain: &'a [Point2],
    center: Point2,
    options: SlideOptions,
    bounds: AngleBounds,
}

impl<'a> SlideRepair<'a> {
    #[must_use]
    pub fn new(
        candidates: &'a [PlacementCandidate],
        source_curtain: &'a [Point2],
        center: Point2,
        options: SlideOptions,
        bounds: AngleBounds,
    ) -> Self {
        Self {
            candidates,
            source_curtain,
            center,
            options,
            bounds,
        }
    }

    /// Candidate indices to try for a bastion at `original`, nearest first
    /// then alternating outward, skipping `used` ones.
    #[must_use]
    pub fn search_order(&self, original: &Bastion, used: &BTreeSet<usize>) -> Vec<usize> {
        let n = self.candidates.len();
        if n == 0 {
            return Vec::new();
        }
        let total = perimeter(self.source_curtain);
        let at = project_onto_ring(&original.centroid(), self.source_curtain)
            .map_or(0.0, |(s, ..)| s);
        let circular = |s: f64| {
            let d = (s - at).abs();
            if total > 0.0 {
                d.min(total - d)
            } else {
                d
            }
        };
        let nearest = (0..n)
            .min_by(|&a, &b| {
                circular(self.candidates[a].arc).total_cmp(&circular(self.candidates[b].arc))
            })
            .unwrap_or(0);

        let mut order = Vec::with_capacity(n);
        for k in 0..n {
            let offset = k.div_ceil(2);
            let i = if k % 2 == 1 {
                (nearest + offset) % n
            } else {
                (nearest + n - offset % n) % n
            };
            if !order.contains(&i) && !used.contains(&i) {
                order.push(i);
            }
        }
        order.truncate(self.options.tries);
        order
    }

    /// Rebuilds `original` at successive candidates until `fitter` reports
    /// a sound bastion. The accepted candidate is added to `used`.
    pub fn execute(
        &self,
        original: &Bastion,
        used: &mut BTreeSet<usize>,
        fitter: &impl FitBastion,
    ) -> SlideOutcome {
        let mut attempts = 0;
        for index in self.search_order(original, used) {
            let candidate = &self.candidates[index];
            let Some(source) = self.synthesize(original, candidate) else {
                trace!(index, "candidate too shallow for a bastion");
                continue;
            };
            attempts += 1;
            let fitted = fitter.fit(source);
            if fitted.repair.ok {
                used.insert(index);
                debug!(index, attempts, "bastion relocated");
                return SlideOutcome {
                    attempts,
                    accepted: Some((index, fitted)),
                };
            }
        }
        SlideOutcome {
            attempts,
            accepted: None,
        }
    }

    /// A fresh bastion anchored at `candidate`, in source coordinates.
    ///
    /// Keeps the original's base width and shape where that shape is sound;
    /// its depth is capped by the candidate's clearance.
    #[must_use]
    pub fn synthesize(
        &self,
        original: &Bastion,
        candidate: &PlacementCandidate,
    ) -> Option<Bastion> {
        let half = 0.5 * original.base_width();
        let depth = original
            .depth(&self.center)
            .min(candidate.clearance * self.options.clearance_fraction);
        if half <= TOLERANCE || !depth.is_finite() || depth <= TOLERANCE {
            return None;
        }

        let normal = candidate.normal;
        let mut tangent = Vector2::new(-normal.y, normal.x);
        if tangent.dot(&(original.points[B1] - original.points[B0])) < 0.0 {
            tangent = -tangent;
        }
        let shape = self.template(original);
        let points =
            shape.map(|(u, v)| candidate.anchor + tangent * (u * half) + normal * (v * depth));
        let bastion = Bastion::new(points);
        bastion.is_finite().then_some(bastion)
    }

    /// The original's vertices in its own base frame, or the default shape
    /// when the original is unusable.
    fn template(&self, original: &Bastion) -> [(f64, f64); 5] {
        let half = 0.5 * original.base_width();
        let depth = original.depth(&self.center);
        if !is_sound(original, &self.bounds) || half <= TOLERANCE || depth <= TOLERANCE {
            return DEFAULT_SHAPE;
        }
        let mid = original.base_midpoint();
        let tangent = (original.points[B1] - original.points[B0]) / (2.0 * half);
        let normal = original.outward_normal(&self.center);
        std::array::from_fn(|i| {
            let off = original.points[i] - mid;
            match i {
                B0 => (-1.0, 0.0),
                B1 => (1.0, 0.0),
                S0 | TIP | S1 => (off.dot(&tangent) / half, off.dot(&normal) / depth),
                _ => (0.0, 0.0),
            }
        })
    }
}
