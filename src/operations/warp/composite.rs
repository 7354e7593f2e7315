use crate::geometry::Bastion;
use crate::math::polygon_2d::{perimeter, project_onto_ring};
use crate::math::{Point2, TOLERANCE};

/// Points closer than this are merged while stitching.
const MERGE_EPS: f64 = 1e-9;

/// A bastion placed on the curtain as a circular arc-length interval.
#[derive(Debug, Clone, Copy)]
struct Splice {
    start: f64,
    len: f64,
    points: [Point2; 5],
}

impl Splice {
    /// Whether `s` lies inside the interval, endpoints included: the base
    /// corners take the place of curtain vertices they coincide with.
    fn covers(&self, s: f64, total: f64) -> bool {
        let off = (s - self.start).rem_euclid(total);
        off <= self.len + MERGE_EPS || off >= total - MERGE_EPS
    }

    fn overlaps(&self, other: &Self, total: f64) -> bool {
        let d = (other.start - self.start).rem_euclid(total);
        d < self.len || total - d < other.len
    }
}

/// Stitches bastions into the curtain ring.
///
/// Each bastion replaces the curtain between the projections of its base
/// corners, with its points ordered to follow the curtain's direction of
/// travel. A bastion whose interval overlaps one already placed is left
/// out; the indices of those are returned alongside the ring.
#[must_use]
pub fn assemble_composite(curtain: &[Point2], bastions: &[Bastion]) -> (Vec<Point2>, Vec<usize>) {
    let total = perimeter(curtain);
    if curtain.len() < 3 || !total.is_finite() || total <= TOLERANCE {
        return (curtain.to_vec(), (0..bastions.len()).collect());
    }

    let mut splices: Vec<Splice> = Vec::with_capacity(bastions.len());
    let mut skipped = Vec::new();
    for (index, bastion) in bastions.iter().enumerate() {
        let Some(splice) = splice_for(curtain, total, bastion) else {
            skipped.push(index);
            continue;
        };
        if splices.iter().any(|s| s.overlaps(&splice, total)) {
            skipped.push(index);
            continue;
        }
        splices.push(splice);
    }

    let mut vertex_arc = Vec::with_capacity(curtain.len());
    let mut walked = 0.0;
    for (i, p) in curtain.iter().enumerate() {
        vertex_arc.push(walked);
        walked += (curtain[(i + 1) % curtain.len()] - p).norm();
    }

    let mut events: Vec<(f64, usize, usize)> = vertex_arc
        .iter()
        .enumerate()
        .map(|(i, &s)| (s, 0, i))
        .chain(splices.iter().enumerate().map(|(k, s)| (s.start, 1, k)))
        .collect();
    events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut ring: Vec<Point2> = Vec::with_capacity(curtain.len() + 5 * splices.len());
    for (s, kind, i) in events {
        if kind == 1 {
            for p in splices[i].points {
                push_merged(&mut ring, p);
            }
        } else if !splices.iter().any(|sp| sp.covers(s, total)) {
            push_merged(&mut ring, curtain[i]);
        }
    }
    let closes = ring
        .first()
        .zip(ring.last())
        .is_some_and(|(a, b)| (a - b).norm() <= MERGE_EPS);
    if ring.len() > 1 && closes {
        ring.pop();
    }
    (ring, skipped)
}

fn splice_for(curtain: &[Point2], total: f64, bastion: &Bastion) -> Option<Splice> {
    if !bastion.is_finite() {
        return None;
    }
    let (s0, ..) = project_onto_ring(&bastion.points[0], curtain)?;
    let (s1, ..) = project_onto_ring(&bastion.points[4], curtain)?;
    let forward = (s1 - s0).rem_euclid(total);
    let splice = if forward <= 0.5 * total {
        Splice {
            start: s0.rem_euclid(total),
            len: forward,
            points: bastion.points,
        }
    } else {
        let mut points = bastion.points;
        points.reverse();
        Splice {
            start: s1.rem_euclid(total),
            len: total - forward,
            points,
        }
    };
    Some(splice)
}

fn push_merged(ring: &mut Vec<Point2>, p: Point2) {
    if ring.last().is_some_and(|last| (last - p).norm() <= MERGE_EPS) {
        return;
    }
    ring.push(p);
}
