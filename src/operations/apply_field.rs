use crate::config::FieldOptions;
use crate::geometry::RadialField;
use crate::math::angle_2d::{smoothstep, wrap_angle};
use crate::math::{is_finite_point, Point2, RADIUS_FLOOR};

/// Radial band over which a warp fades in, as fractions of the field's
/// local source radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialBand {
    pub inner: f64,
    pub outer: f64,
}

impl RadialBand {
    /// The band configured in `options`, or `None` when banding is off.
    #[must_use]
    pub fn from_options(options: &FieldOptions) -> Option<Self> {
        (!options.ignore_band).then_some(Self {
            inner: options.band_inner,
            outer: options.band_outer,
        })
    }
}

/// Moves points radially by a [`RadialField`].
///
/// A point at radius `r` and angle `θ` moves to radius
/// `r + w · delta(θ)`, where `w` is the band weight (1 without a band).
#[derive(Debug, Clone, Copy)]
pub struct FieldApplicator<'a> {
    field: &'a RadialField,
    center: Point2,
    band: Option<RadialBand>,
}

impl<'a> FieldApplicator<'a> {
    #[must_use]
    pub fn new(field: &'a RadialField, center: Point2, band: Option<RadialBand>) -> Self {
        Self {
            field,
            center,
            band,
        }
    }

    /// Applicator that ignores any band.
    #[must_use]
    pub fn unbanded(field: &'a RadialField, center: Point2) -> Self {
        Self::new(field, center, None)
    }

    fn weight(&self, r: f64, theta: f64) -> f64 {
        match self.band {
            Some(band) => {
                let reference = self.field.source_radius_at(theta);
                smoothstep(band.inner * reference, band.outer * reference, r)
            }
            None => 1.0,
        }
    }

    /// Warps a single point. Points on the center and non-finite points are
    /// returned unchanged.
    #[must_use]
    pub fn apply_point(&self, p: &Point2) -> Point2 {
        if !is_finite_point(p) || self.field.is_empty() {
            return *p;
        }
        let off = p - self.center;
        let r = off.norm();
        if r < RADIUS_FLOOR {
            return *p;
        }
        let theta = wrap_angle(off.y.atan2(off.x));
        let delta = self.field.delta_at(theta);
        let w = self.weight(r, theta);
        let q = self.center + off * (1.0 + w * delta / r);
        if is_finite_point(&q) {
            q
        } else {
            *p
        }
    }

    /// Warps every point of a ring independently.
    #[must_use]
    pub fn apply_ring(&self, ring: &[Point2]) -> Vec<Point2> {
        ring.iter().map(|p| self.apply_point(p)).collect()
    }
}
