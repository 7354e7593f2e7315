use tracing::trace;

use crate::config::ClampMargins;
use crate::diagnostics::ClampStats;
use crate::math::radial_2d::{clamp_outside, clamp_radius, radial_bounds};
use crate::math::{is_finite_point, Point2, RADIUS_FLOOR};

/// Post-warp clamps for curtain vertices: outside the inner hull, into the
/// band between the hulls, then outside the inner hull once more.
#[derive(Debug, Clone, Copy)]
pub(super) struct CurtainClamp<'a> {
    pub center: Point2,
    pub inner: &'a [Point2],
    pub outer: &'a [Point2],
    pub margins: ClampMargins,
}

impl CurtainClamp<'_> {
    pub fn clamp_point(&self, p: &Point2, stats: &mut ClampStats) -> Point2 {
        if !is_finite_point(p) {
            return *p;
        }
        let first = clamp_outside(&self.center, p, self.inner, self.margins.inner);
        if first != *p {
            stats.outside_inner += 1;
        }
        let banded = self.clamp_band(&first, stats);
        let last = clamp_outside(&self.center, &banded, self.inner, self.margins.inner);
        if last != banded {
            stats.outside_inner += 1;
        }
        last
    }

    pub fn clamp_ring(&self, ring: &[Point2]) -> (Vec<Point2>, ClampStats) {
        let mut stats = ClampStats::default();
        let out = ring.iter().map(|p| self.clamp_point(p, &mut stats)).collect();
        (out, stats)
    }

    /// Mid-band clamp with a margin scaled to the local gap between hulls.
    fn clamp_band(&self, p: &Point2, stats: &mut ClampStats) -> Point2 {
        let off = p - self.center;
        let r = off.norm();
        if r < RADIUS_FLOOR {
            return *p;
        }
        let Some((lo, hi)) = radial_bounds(&self.center, &(off / r), self.inner, self.outer) else {
            stats.mid_band_skipped += 1;
            trace!(x = p.x, y = p.y, "no hull bounds along ray");
            return *p;
        };
        let margin = self.margins.mid_band_margin(hi - lo);
        if lo + margin > hi - margin {
            stats.mid_band_skipped += 1;
            trace!(lo, hi, "inverted hull band");
            return *p;
        }
        let q = clamp_radius(&self.center, p, lo + margin, hi - margin);
        if q != *p {
            stats.mid_band += 1;
        }
        q
    }
}
