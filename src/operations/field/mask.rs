use crate::config::MaskOptions;
use crate::geometry::BastionDescriptor;
use crate::math::angle_2d::{lock_weight, AngularSpan};
use crate::math::Point2;

/// Angular footprint of a placed bastion, as seen by the curtain field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BastionMask {
    /// Span between the shoulders.
    pub shoulders: AngularSpan,
    /// Angle of the bastion's centroid.
    pub centroid: f64,
}

impl BastionMask {
    #[must_use]
    pub fn from_descriptor(center: &Point2, descriptor: &BastionDescriptor) -> Self {
        Self {
            shoulders: descriptor.shoulder_span(center),
            centroid: descriptor.centroid_angle(center),
        }
    }
}

/// Per-sample lock weights: `0` over each bastion's padded shoulder span,
/// feathering to `1` away from it. Bastions combine by minimum.
#[must_use]
pub fn lock_mask(thetas: &[f64], masks: &[BastionMask], options: &MaskOptions) -> Vec<f64> {
    thetas
        .iter()
        .map(|&theta| {
            masks.iter().fold(1.0_f64, |w, m| {
                w.min(lock_weight(theta, &m.shoulders, options.lock_pad, options.lock_feather))
            })
        })
        .collect()
}

/// Per-sample clearance weights around each bastion's centroid angle.
/// Bastions combine by minimum.
#[must_use]
pub fn clearance_mask(thetas: &[f64], masks: &[BastionMask], options: &MaskOptions) -> Vec<f64> {
    thetas
        .iter()
        .map(|&theta| {
            masks.iter().fold(1.0_f64, |w, m| {
                let span = AngularSpan::point(m.centroid);
                w.min(lock_weight(theta, &span, options.clear_pad, options.clear_feather))
            })
        })
        .collect()
}

/// Damps `delta` by both masks.
///
/// The lock mask scales every sample; the clearance mask only scales
/// outward (positive) samples, so inward pulls near a bastion survive.
pub fn apply_masks(delta: &mut [f64], lock: &[f64], clearance: &[f64]) {
    for ((d, &l), &c) in delta.iter_mut().zip(lock).zip(clearance) {
        *d *= l;
        if *d > 0.0 {
            *d *= c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[allow(clippy::cast_precision_loss)]
    fn grid(n: usize) -> Vec<f64> {
        (0..n).map(|i| TAU * i as f64 / n as f64).collect()
    }

    #[test]
    fn lock_mask_zero_over_padded_shoulders() {
        let thetas = grid(720);
        let masks = [BastionMask {
            shoulders: AngularSpan::from_endpoints(0.1, 0.4),
            centroid: 0.25,
        }];
        let options = MaskOptions {
            lock_pad: 0.1,
            lock_feather: 0.08,
            ..MaskOptions::default()
        };
        let lock = lock_mask(&thetas, &masks, &options);
        for (theta, w) in thetas.iter().zip(&lock) {
            if *theta <= 0.5 {
                assert!(w.abs() < f64::EPSILON, "theta={theta} w={w}");
            } else if *theta > 0.58 && *theta < TAU - 0.08 {
                assert!((w - 1.0).abs() < f64::EPSILON, "theta={theta} w={w}");
            }
        }
    }

    #[test]
    fn no_bastions_means_no_masking() {
        let thetas = grid(32);
        let options = MaskOptions::default();
        assert!(lock_mask(&thetas, &[], &options).iter().all(|w| (w - 1.0).abs() < f64::EPSILON));
        assert!(clearance_mask(&thetas, &[], &options)
            .iter()
            .all(|w| (w - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn clearance_only_damps_outward_delta() {
        let mut delta = vec![5.0, -5.0];
        apply_masks(&mut delta, &[1.0, 1.0], &[0.0, 0.0]);
        assert!(delta[0].abs() < f64::EPSILON);
        assert!((delta[1] + 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lock_damps_both_directions() {
        let mut delta = vec![5.0, -5.0];
        apply_masks(&mut delta, &[0.5, 0.5], &[1.0, 1.0]);
        assert!((delta[0] - 2.5).abs() < f64::EPSILON);
        assert!((delta[1] + 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn masks_combine_by_minimum() {
        let thetas = vec![1.0, 3.0];
        let masks = [
            BastionMask {
                shoulders: AngularSpan::from_endpoints(0.9, 1.1),
                centroid: 1.0,
            },
            BastionMask {
                shoulders: AngularSpan::from_endpoints(2.9, 3.1),
                centroid: 3.0,
            },
        ];
        let lock = lock_mask(&thetas, &masks, &MaskOptions::default());
        assert!(lock.iter().all(|w| w.abs() < f64::EPSILON));
    }
}
