use std::collections::BTreeMap;
use std::f64::consts::TAU;

use tracing::{debug, warn};

use super::mask::{apply_masks, clearance_mask, lock_mask, BastionMask};
use super::smooth::{limit_slope, smooth_circular};
use crate::config::{FieldOptions, MaskOptions, OutworksOptions, MIN_SAMPLES};
use crate::diagnostics::FieldDiagnostics;
use crate::error::{ConfigError, GeometryError, Result};
use crate::geometry::district::{district_at, DistrictHit};
use crate::geometry::{District, DistrictRole, RadialField};
use crate::math::intersect_2d::farthest_intersection;
use crate::math::{direction, is_finite_point, Point2};

/// Smallest sample count regardless of configuration.
const FLOOR_SAMPLES: usize = 18;

/// Angular samples per bastion.
const SAMPLES_PER_BASTION: usize = 3;

/// Sampling and shaping parameters of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    pub samples: usize,
    pub max_in: f64,
    pub max_out: f64,
    pub max_step: f64,
    pub smooth_radius: usize,
}

impl From<&FieldOptions> for FieldParams {
    fn from(options: &FieldOptions) -> Self {
        Self {
            samples: options.samples,
            max_in: options.max_in,
            max_out: options.max_out,
            max_step: options.max_step,
            smooth_radius: options.smooth_radius,
        }
    }
}

impl FieldParams {
    /// Parameters for the outworks field: inward displacement only.
    #[must_use]
    pub fn outworks(field: &FieldOptions, outworks: &OutworksOptions) -> Self {
        Self {
            samples: field.samples,
            max_in: outworks.max_in,
            max_out: 0.0,
            max_step: outworks.max_step,
            smooth_radius: outworks.smooth_radius,
        }
    }
}

/// Number of angular samples for a field over `bastion_count` bastions.
#[must_use]
pub fn sample_count(min_samples: usize, bastion_count: usize) -> usize {
    min_samples
        .max(FLOOR_SAMPLES)
        .max(SAMPLES_PER_BASTION * bastion_count)
}

/// Builds a [`RadialField`] that moves `source` toward `target`.
///
/// # Algorithm
///
/// 1. Sample source and target radii along `N` uniform rays, carrying the
///    previous radius forward over misses
/// 2. Add the district offset (and any constant bias) to the target
/// 3. Clamp `target - source` to `[-max_in, max_out]`, zeroing non-finite values
/// 4. Damp by the bastion lock and clearance masks
/// 5. Smooth circularly, then limit the slope between neighbours
#[derive(Debug)]
pub struct RadialFieldBuilder<'a> {
    center: Point2,
    source: &'a [Point2],
    target: Option<&'a [Point2]>,
    params: FieldParams,
    districts: &'a [District],
    offsets: Option<&'a BTreeMap<DistrictRole, f64>>,
    target_bias: f64,
    masks: Vec<BastionMask>,
    mask_options: MaskOptions,
    bastion_count: usize,
}

impl<'a> RadialFieldBuilder<'a> {
    /// Creates a builder sampling `source` around `center`.
    #[must_use]
    pub fn new(center: Point2, source: &'a [Point2], params: FieldParams) -> Self {
        Self {
            center,
            source,
            target: None,
            params,
            districts: &[],
            offsets: None,
            target_bias: 0.0,
            masks: Vec::new(),
            mask_options: MaskOptions::default(),
            bastion_count: 0,
        }
    }

    /// Polygon the field moves toward. Without one the source is its own
    /// target.
    #[must_use]
    pub fn target(mut self, target: Option<&'a [Point2]>) -> Self {
        self.target = target;
        self
    }

    /// Districts whose role offsets are added to the target radius.
    #[must_use]
    pub fn districts(
        mut self,
        districts: &'a [District],
        offsets: &'a BTreeMap<DistrictRole, f64>,
    ) -> Self {
        self.districts = districts;
        self.offsets = Some(offsets);
        self
    }

    /// Constant radius added to every target sample.
    #[must_use]
    pub fn target_bias(mut self, bias: f64) -> Self {
        self.target_bias = bias;
        self
    }

    /// Bastions whose footprint the field must not disturb.
    #[must_use]
    pub fn masks(mut self, masks: Vec<BastionMask>, options: MaskOptions) -> Self {
        self.masks = masks;
        self.mask_options = options;
        self
    }

    /// Number of bastions the sample grid must resolve.
    #[must_use]
    pub fn bastion_count(mut self, count: usize) -> Self {
        self.bastion_count = count;
        self
    }

    /// Builds the field.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidOption` if fewer than 32 samples are requested
    ///   or the displacement bounds are negative or non-finite
    /// - `ConfigError::MissingPolygon` if the source has fewer than 3 finite vertices
    /// - `GeometryError::NoRadialHits` if no ray from the center hits the source
    pub fn execute(&self) -> Result<(RadialField, FieldDiagnostics)> {
        self.check_params()?;
        if self.source.iter().filter(|p| is_finite_point(p)).count() < 3 {
            return Err(ConfigError::MissingPolygon("source").into());
        }

        let n = sample_count(self.params.samples, self.bastion_count);
        let mut diag = FieldDiagnostics {
            samples: n,
            ..FieldDiagnostics::default()
        };
        #[allow(clippy::cast_precision_loss)]
        let thetas: Vec<f64> = (0..n).map(|i| TAU * i as f64 / n as f64).collect();

        let (r_source, source_misses) = self
            .sample_radii(&thetas, self.source)
            .ok_or(GeometryError::NoRadialHits("source"))?;
        diag.source_misses = source_misses;

        let mut r_target = match self.target {
            Some(target) => match self.sample_radii(&thetas, target) {
                Some((radii, misses)) => {
                    diag.target_misses = misses;
                    radii
                }
                None => {
                    warn!("target polygon missed by every ray, using source radii");
                    diag.target_misses = n;
                    r_source.clone()
                }
            },
            None => r_source.clone(),
        };
        for (r, &theta) in r_target.iter_mut().zip(&thetas) {
            *r += self.district_offset(theta, &mut diag) + self.target_bias;
        }

        let mut delta: Vec<f64> = r_target
            .iter()
            .zip(&r_source)
            .map(|(t, s)| {
                let d = (t - s).clamp(-self.params.max_in, self.params.max_out);
                if d.is_finite() {
                    d
                } else {
                    diag.non_finite_deltas += 1;
                    0.0
                }
            })
            .collect();

        if !self.masks.is_empty() {
            let lock = lock_mask(&thetas, &self.masks, &self.mask_options);
            let clear = clearance_mask(&thetas, &self.masks, &self.mask_options);
            apply_masks(&mut delta, &lock, &clear);
        }

        let mut delta = smooth_circular(&delta, self.params.smooth_radius);
        limit_slope(&mut delta, self.params.max_step);

        debug!(
            samples = n,
            source_misses = diag.source_misses,
            target_misses = diag.target_misses,
            non_finite = diag.non_finite_deltas,
            "built radial field"
        );

        Ok((
            RadialField {
                thetas,
                r_source,
                r_target,
                delta,
                max_step: self.params.max_step,
            },
            diag,
        ))
    }

    fn check_params(&self) -> std::result::Result<(), ConfigError> {
        let p = &self.params;
        if p.samples < MIN_SAMPLES {
            return Err(ConfigError::InvalidOption {
                option: "samples",
                reason: format!("must be at least {MIN_SAMPLES}, got {}", p.samples),
            });
        }
        for (option, value) in [("max_in", p.max_in), ("max_out", p.max_out)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidOption {
                    option,
                    reason: format!("must be finite and >= 0, got {value}"),
                });
            }
        }
        if !p.max_step.is_finite() || p.max_step <= 0.0 {
            return Err(ConfigError::InvalidOption {
                option: "max_step",
                reason: format!("must be finite and > 0, got {}", p.max_step),
            });
        }
        Ok(())
    }

    /// Farthest-hit radius along every ray, with misses carried forward.
    ///
    /// Index 0 is back-filled from the first hit anywhere in the ring, so no
    /// sample stays empty. Returns `None` if every ray misses.
    fn sample_radii(&self, thetas: &[f64], polygon: &[Point2]) -> Option<(Vec<f64>, usize)> {
        let hits: Vec<Option<f64>> = thetas
            .iter()
            .map(|&theta| farthest_intersection(&self.center, &direction(theta), polygon))
            .collect();
        let mut prev = hits.iter().flatten().copied().next()?;
        let mut misses = 0;
        let radii = hits
            .iter()
            .map(|hit| {
                if let Some(r) = hit {
                    prev = *r;
                } else {
                    misses += 1;
                }
                prev
            })
            .collect();
        Some((radii, misses))
    }

    fn district_offset(&self, theta: f64, diag: &mut FieldDiagnostics) -> f64 {
        let Some(offsets) = self.offsets else {
            return 0.0;
        };
        match district_at(self.districts, theta) {
            Some(hit) => {
                if matches!(hit, DistrictHit::Nearest(_)) {
                    diag.district_fallbacks += 1;
                }
                offsets.get(&hit.district().role).copied().unwrap_or(0.0)
            }
            None => 0.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::RampartError;
    use crate::math::angle_2d::AngularSpan;
    use crate::math::from_polar;
    use proptest::prelude::*;

    #[allow(clippy::cast_precision_loss)]
    fn regular(n: usize, radius: f64) -> Vec<Point2> {
        (0..n)
            .map(|i| from_polar(&Point2::origin(), radius, TAU * i as f64 / n as f64))
            .collect()
    }

    fn params() -> FieldParams {
        FieldParams {
            samples: 64,
            max_in: 50.0,
            max_out: 50.0,
            max_step: 2.0,
            smooth_radius: 2,
        }
    }

    #[test]
    fn sample_count_scales_with_bastions() {
        assert_eq!(sample_count(32, 0), 32);
        assert_eq!(sample_count(32, 20), 60);
        assert_eq!(sample_count(10, 0), 18);
    }

    #[test]
    fn octagon_grows_toward_larger_octagon() {
        let source = regular(8, 100.0);
        let target = regular(8, 130.0);
        let (field, diag) = RadialFieldBuilder::new(Point2::origin(), &source, params())
            .target(Some(&target))
            .execute()
            .unwrap();
        assert_eq!(diag.source_misses, 0);
        assert_eq!(field.len(), 64);
        // Along a ray between vertices the octagons are 0.3 * r_source apart.
        for d in &field.delta {
            assert!((27.0..=30.0 + 1e-9).contains(d), "delta={d}");
        }
        assert!(field.max_neighbour_step() <= 2.0 + 1e-9);
    }

    #[test]
    fn delta_is_clamped_to_bounds() {
        let source = regular(8, 100.0);
        let target = regular(8, 130.0);
        let p = FieldParams {
            max_out: 10.0,
            ..params()
        };
        let (field, _) = RadialFieldBuilder::new(Point2::origin(), &source, p)
            .target(Some(&target))
            .execute()
            .unwrap();
        assert!(field.delta.iter().all(|d| (d - 10.0).abs() < 1e-9));
    }

    #[test]
    fn no_target_means_no_displacement() {
        let source = regular(12, 80.0);
        let (field, _) = RadialFieldBuilder::new(Point2::origin(), &source, params())
            .execute()
            .unwrap();
        assert!(field.delta.iter().all(|d| d.abs() < 1e-9));
    }

    #[test]
    fn district_offsets_shift_target() {
        let source = regular(16, 100.0);
        let districts = vec![
            District::new(0.0, std::f64::consts::PI, DistrictRole::Castle),
            District::new(std::f64::consts::PI, TAU, DistrictRole::Farm),
        ];
        let mut offsets = BTreeMap::new();
        offsets.insert(DistrictRole::Castle, 10.0);
        let p = FieldParams {
            smooth_radius: 0,
            max_step: 100.0,
            ..params()
        };
        let (field, diag) = RadialFieldBuilder::new(Point2::origin(), &source, p)
            .districts(&districts, &offsets)
            .execute()
            .unwrap();
        assert_eq!(diag.district_fallbacks, 0);
        assert!((field.delta[8] - 10.0).abs() < 1e-9);
        assert!(field.delta[40].abs() < 1e-9);
    }

    #[test]
    fn lock_mask_holds_curtain_near_bastion() {
        let source = regular(16, 100.0);
        let target = regular(16, 120.0);
        let mask = BastionMask {
            shoulders: AngularSpan::from_endpoints(1.0, 1.6),
            centroid: 1.3,
        };
        let p = FieldParams {
            smooth_radius: 0,
            max_step: 100.0,
            ..params()
        };
        let (field, _) = RadialFieldBuilder::new(Point2::origin(), &source, p)
            .target(Some(&target))
            .masks(vec![mask], MaskOptions::default())
            .bastion_count(1)
            .execute()
            .unwrap();
        assert!(field.delta_at(1.3).abs() < 1e-9);
        assert!((19.0..=20.0 + 1e-9).contains(&field.delta_at(4.0)));
    }

    #[test]
    fn too_few_samples_fail_fast() {
        let source = regular(8, 100.0);
        let p = FieldParams {
            samples: 16,
            ..params()
        };
        let err = RadialFieldBuilder::new(Point2::origin(), &source, p)
            .execute()
            .unwrap_err();
        assert!(matches!(
            err,
            RampartError::Config(ConfigError::InvalidOption { option: "samples", .. })
        ));
    }

    #[test]
    fn source_missed_by_every_ray_is_an_error() {
        // Three finite vertices, but every edge touches a NaN vertex.
        let gap = Point2::new(f64::NAN, f64::NAN);
        let source = vec![
            Point2::new(100.0, 0.0),
            gap,
            Point2::new(-50.0, 80.0),
            gap,
            Point2::new(-50.0, -80.0),
            gap,
        ];
        let err = RadialFieldBuilder::new(Point2::origin(), &source, params())
            .execute()
            .unwrap_err();
        assert!(matches!(
            err,
            RampartError::Geometry(GeometryError::NoRadialHits("source"))
        ));
    }

    #[test]
    fn partial_misses_are_carried_forward() {
        // A small polygon off to the side is only hit by a narrow fan of rays.
        let source = vec![
            Point2::new(50.0, -5.0),
            Point2::new(60.0, -5.0),
            Point2::new(60.0, 5.0),
            Point2::new(50.0, 5.0),
        ];
        let (field, diag) = RadialFieldBuilder::new(Point2::origin(), &source, params())
            .execute()
            .unwrap();
        assert!(diag.source_misses > 0);
        assert!(field.r_source.iter().all(|r| r.is_finite() && *r > 0.0));
    }

    proptest! {
        #[test]
        fn field_is_continuous_and_finite(
            radii in proptest::collection::vec(40.0f64..160.0, 6..24),
            target_scale in 0.5f64..1.8,
            max_step in 0.2f64..5.0,
            smooth in 0usize..4,
        ) {
            #[allow(clippy::cast_precision_loss)]
            let source: Vec<Point2> = radii
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    from_polar(&Point2::origin(), *r, TAU * i as f64 / radii.len() as f64)
                })
                .collect();
            let target: Vec<Point2> =
                source.iter().map(|p| Point2::from(p.coords * target_scale)).collect();
            let p = FieldParams {
                samples: 48,
                max_in: 30.0,
                max_out: 30.0,
                max_step,
                smooth_radius: smooth,
            };
            let (field, _) = RadialFieldBuilder::new(Point2::origin(), &source, p)
                .target(Some(&target))
                .execute()
                .unwrap();
            prop_assert!(field.delta.iter().all(|d| d.is_finite()));
            prop_assert!(field.max_neighbour_step() <= max_step + 1e-9);
            prop_assert!(field.delta.iter().all(|d| *d >= -30.0 - 1e-9 && *d <= 30.0 + 1e-9));
        }
    }
}
