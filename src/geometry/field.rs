use std::f64::consts::TAU;

use crate::math::angle_2d::wrap_angle;
use crate::math::{from_polar, Point2};

/// A radial displacement field sampled on a uniform angular grid.
///
/// `delta[i]` is the radial displacement to apply along `thetas[i]`. After
/// construction by the field builder, consecutive samples (including the
/// wrap-around pair) differ by at most `max_step` and every sample is
/// finite.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialField {
    pub thetas: Vec<f64>,
    pub r_source: Vec<f64>,
    pub r_target: Vec<f64>,
    pub delta: Vec<f64>,
    pub max_step: f64,
}

impl RadialField {
    /// Number of angular samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.thetas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thetas.is_empty()
    }

    /// Bracketing sample indices and the interpolation fraction for `theta`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn bracket(&self, theta: f64) -> (usize, usize, f64) {
        let n = self.len();
        let pos = wrap_angle(theta) / TAU * n as f64;
        let i0 = (pos.floor() as usize) % n;
        let i1 = (i0 + 1) % n;
        (i0, i1, pos - pos.floor())
    }

    fn interpolate(&self, values: &[f64], theta: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let (i0, i1, frac) = self.bracket(theta);
        values[i0] + (values[i1] - values[i0]) * frac
    }

    /// Displacement at `theta`, linearly interpolated between samples.
    #[must_use]
    pub fn delta_at(&self, theta: f64) -> f64 {
        self.interpolate(&self.delta, theta)
    }

    /// Source radius at `theta`, linearly interpolated between samples.
    #[must_use]
    pub fn source_radius_at(&self, theta: f64) -> f64 {
        self.interpolate(&self.r_source, theta)
    }

    /// Target radius at `theta`, linearly interpolated between samples.
    #[must_use]
    pub fn target_radius_at(&self, theta: f64) -> f64 {
        self.interpolate(&self.r_target, theta)
    }

    /// Radius the source boundary reaches after displacement.
    #[must_use]
    pub fn warped_radius_at(&self, theta: f64) -> f64 {
        self.source_radius_at(theta) + self.delta_at(theta)
    }

    /// Minimum and maximum warped radius over all samples.
    #[must_use]
    pub fn radial_envelope(&self) -> Option<(f64, f64)> {
        self.r_source
            .iter()
            .zip(&self.delta)
            .map(|(r, d)| r + d)
            .fold(None, |acc, r| match acc {
                None => Some((r, r)),
                Some((lo, hi)) => Some((lo.min(r), hi.max(r))),
            })
    }

    /// Ring that follows the warped radius plus `offset` at every sample.
    ///
    /// Downstream features such as ditches derive their outline from it.
    #[must_use]
    pub fn envelope_ring(&self, center: &Point2, offset: f64) -> Vec<Point2> {
        self.thetas
            .iter()
            .zip(self.r_source.iter().zip(&self.delta))
            .map(|(&theta, (r, d))| from_polar(center, (r + d + offset).max(0.0), theta))
            .collect()
    }

    /// Largest absolute difference between circular neighbours.
    #[must_use]
    pub fn max_neighbour_step(&self) -> f64 {
        let n = self.delta.len();
        (0..n)
            .map(|i| (self.delta[(i + 1) % n] - self.delta[i]).abs())
            .fold(0.0, f64::max)
    }
}
