mod audit;
mod composite;
mod curtain;

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::{ClampMargins, WarpOptions};
use crate::diagnostics::{BastionReport, ClampStats, Placement, RepairReport, WarpDiagnostics};
use crate::error::{ConfigError, GeometryError, Result};
use crate::geometry::bastion::{B0, B1, MOVABLE};
use crate::geometry::{Bastion, BastionDescriptor, District, RadialField};
use crate::math::radial_2d::clamp_outside;
use crate::math::{is_finite_point, Point2};
use crate::operations::apply_field::{FieldApplicator, RadialBand};
use crate::operations::field::{BastionMask, FieldParams, RadialFieldBuilder};
use crate::operations::repair::{
    clearance_candidates, AngleBounds, ConvexityRepair, FitBastion, FittedBastion,
    PlacementCandidate, RadialBound, ShrinkToFit, SlideRepair,
};

pub use audit::audit_containment;
pub use composite::assemble_composite;

use curtain::CurtainClamp;

/// Everything the wall fitter consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct WallInput {
    /// Settlement center; every radial quantity is measured from here.
    pub center: Point2,
    /// Source curtain ring.
    pub curtain: Vec<Point2>,
    /// Shape the curtain should move toward. Defaults to the curtain itself,
    /// so only district offsets apply.
    pub target: Option<Vec<Point2>>,
    /// The curtain must stay outside this hull.
    pub inner_hull: Vec<Point2>,
    /// Bastions must stay inside this hull.
    pub outer_hull: Vec<Point2>,
    pub districts: Vec<District>,
    /// Bastions in source coordinates, attached to the source curtain.
    pub bastions: Vec<BastionDescriptor>,
}

/// The fitted wall and everything needed to audit it.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpOutput {
    /// Warped and clamped curtain, one vertex per source vertex.
    pub curtain: Vec<Point2>,
    /// Final bastions, one per input descriptor.
    pub bastions: Vec<Bastion>,
    /// Curtain ring with the bastions stitched in.
    pub wall: Vec<Point2>,
    pub curtain_field: RadialField,
    pub outworks_field: RadialField,
    /// Clearance maxima along the curtain used for relocation.
    pub candidates: Vec<PlacementCandidate>,
    pub diagnostics: WarpDiagnostics,
}

/// Fits a curtain wall and its bastions between an inner and an outer hull.
///
/// # Algorithm
///
/// 1. Build the curtain field from the curtain toward its target, locked
///    around each bastion
/// 2. Warp the curtain and clamp it between the hulls
/// 3. Warp the bastions with the same field
/// 4. Build the outworks field pulling anything past the outer hull back in
/// 5. Per bastion: outworks warp, inner clamp, shrink-to-fit, convexity repair
/// 6. Relocate bastions that still fail to free clearance maxima
/// 7. Stitch the bastions into the curtain
#[derive(Debug)]
pub struct WarpWall {
    input: WallInput,
    options: WarpOptions,
}

impl WarpWall {
    #[must_use]
    pub fn new(input: WallInput, options: WarpOptions) -> Self {
        Self { input, options }
    }

    /// Runs the whole pipeline.
    ///
    /// Bastions with non-finite vertices are left as given and reported as
    /// [`Placement::Unrepaired`]; the rest of the wall is still fitted.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidOption` if any option fails validation
    /// - `ConfigError::MissingPolygon` if the curtain or either hull has
    ///   fewer than 3 finite vertices
    /// - `GeometryError::Degenerate` for a non-finite center
    /// - `GeometryError::NoRadialHits` if no ray from the center hits the
    ///   curtain
    pub fn execute(&self) -> Result<WarpOutput> {
        self.validate()?;
        let input = &self.input;
        let options = &self.options;
        let center = input.center;
        let margins = options.margins;
        let mut diagnostics = WarpDiagnostics::default();
        let usable: Vec<bool> = input.bastions.iter().map(BastionDescriptor::is_finite).collect();

        // Step 1: curtain field.
        let masks = input
            .bastions
            .iter()
            .filter(|b| b.is_finite())
            .map(|b| BastionMask::from_descriptor(&center, b))
            .collect();
        let (curtain_field, curtain_diag) =
            RadialFieldBuilder::new(center, &input.curtain, FieldParams::from(&options.field))
                .target(input.target.as_deref())
                .districts(&input.districts, &options.district_offsets)
                .masks(masks, options.masks)
                .bastion_count(input.bastions.len())
                .execute()?;
        diagnostics.curtain_field = curtain_diag;

        // Step 2: curtain warp and post-clamps.
        let clamp = CurtainClamp {
            center,
            inner: &input.inner_hull,
            outer: &input.outer_hull,
            margins,
        };
        let band = RadialBand::from_options(&options.field);
        let warped = FieldApplicator::new(&curtain_field, center, band).apply_ring(&input.curtain);
        let (curtain, clamp_stats) = clamp.clamp_ring(&warped);
        diagnostics.curtain_clamps = clamp_stats;
        debug!(
            outside_inner = clamp_stats.outside_inner,
            mid_band = clamp_stats.mid_band,
            skipped = clamp_stats.mid_band_skipped,
            "curtain clamped"
        );

        // Step 3: bastions follow the curtain.
        let curtain_warp = FieldApplicator::unbanded(&curtain_field, center);
        let mut warped_bastions = Vec::with_capacity(input.bastions.len());
        let mut base_clamps = Vec::with_capacity(input.bastions.len());
        for (b, &ok) in input.bastions.iter().zip(&usable) {
            let mut stats = ClampStats::default();
            let warped = if ok {
                warp_with_curtain(&b.polygon, &curtain_warp, &clamp, &mut stats)
            } else {
                b.polygon
            };
            warped_bastions.push(warped);
            base_clamps.push(stats);
        }

        // Step 4: outworks field.
        let (preliminary, _) = assemble_composite(&curtain, &warped_bastions);
        let (outworks_field, outworks_diag) = RadialFieldBuilder::new(
            center,
            &preliminary,
            FieldParams::outworks(&options.field, &options.outworks),
        )
        .target(Some(input.outer_hull.as_slice()))
        .target_bias(-margins.outer)
        .bastion_count(input.bastions.len())
        .execute()?;
        diagnostics.outworks_field = outworks_diag;

        // Step 5: fit every bastion in place.
        let fitter = BastionFitter {
            center,
            curtain_warp,
            outworks_warp: FieldApplicator::unbanded(&outworks_field, center),
            clamp,
            margins,
            options,
        };
        let mut bastions = Vec::with_capacity(warped_bastions.len());
        for (index, (warped, stats)) in warped_bastions.iter().zip(base_clamps).enumerate() {
            if !usable[index] {
                warn!(index, "bastion has non-finite vertices; left as given");
                bastions.push(*warped);
                diagnostics.bastions.push(BastionReport {
                    index,
                    shrink: None,
                    repair: RepairReport::default(),
                    base_clamps: stats,
                    placement: Placement::Unrepaired,
                    slide_attempts: 0,
                    note: Some("input bastion has non-finite vertices".to_owned()),
                });
                continue;
            }
            let fitted = fitter.fit_warped(*warped, stats);
            bastions.push(fitted.polygon);
            diagnostics.bastions.push(BastionReport {
                index,
                shrink: fitted.shrink,
                repair: fitted.repair,
                base_clamps: fitted.base_clamps,
                placement: Placement::Original,
                slide_attempts: 0,
                note: None,
            });
        }

        // Step 6: relocate failures, in index order.
        let (candidates, candidate_diag) = clearance_candidates(
            &input.curtain,
            center,
            &curtain_field,
            &input.outer_hull,
            options.slide.spacing,
        );
        diagnostics.candidates = candidate_diag;
        let slide = SlideRepair::new(
            &candidates,
            &input.curtain,
            center,
            options.slide,
            AngleBounds::from_options(&options.repair),
        );
        let mut used = BTreeSet::new();
        for (report, bastion) in diagnostics.bastions.iter_mut().zip(bastions.iter_mut()) {
            if report.ok() || !usable[report.index] {
                continue;
            }
            let source = &input.bastions[report.index].polygon;
            let outcome = slide.execute(source, &mut used, &fitter);
            report.slide_attempts = outcome.attempts;
            if let Some((candidate, fitted)) = outcome.accepted {
                *bastion = fitted.polygon;
                report.shrink = fitted.shrink;
                report.repair = fitted.repair;
                report.base_clamps = fitted.base_clamps;
                report.placement = Placement::Slid {
                    candidate,
                    anchor: candidates[candidate].anchor,
                };
            } else {
                warn!(
                    index = report.index,
                    attempts = outcome.attempts,
                    "bastion left unrepaired"
                );
                report.placement = Placement::Unrepaired;
                report.note = Some(format!(
                    "convexity repair failed after {} iterations; {} relocation attempts failed",
                    report.repair.iterations, outcome.attempts
                ));
            }
        }
        for report in &diagnostics.bastions {
            diagnostics.bastion_base_clamps += report.base_clamps;
        }

        // Step 7: stitch. Non-finite bastions are already reported.
        let (wall, skipped) = assemble_composite(&curtain, &bastions);
        let overlapping: Vec<usize> = skipped.into_iter().filter(|&i| usable[i]).collect();
        if !overlapping.is_empty() {
            warn!(?overlapping, "overlapping bastions left out of the wall");
        }
        diagnostics.overlapping_bastions = overlapping;

        if options.diagnostics.audit_containment {
            diagnostics.containment = Some(audit_containment(
                &center,
                &curtain,
                &bastions,
                &input.inner_hull,
                &input.outer_hull,
                &margins,
            ));
        }
        debug!(
            bastions = bastions.len(),
            failed = diagnostics.failed_bastions(),
            wall_vertices = wall.len(),
            "wall fitted"
        );

        Ok(WarpOutput {
            curtain,
            bastions,
            wall,
            curtain_field,
            outworks_field,
            candidates,
            diagnostics,
        })
    }

    fn validate(&self) -> Result<()> {
        self.options.validate()?;
        let input = &self.input;
        if !is_finite_point(&input.center) {
            return Err(GeometryError::Degenerate("center is not finite".to_owned()).into());
        }
        for (name, ring) in [
            ("curtain", &input.curtain),
            ("inner_hull", &input.inner_hull),
            ("outer_hull", &input.outer_hull),
        ] {
            if ring.iter().filter(|p| is_finite_point(p)).count() < 3 {
                return Err(ConfigError::MissingPolygon(name).into());
            }
        }
        Ok(())
    }
}

/// Moves a bastion with the curtain field. The base corners then get the
/// same clamps as the curtain so they stay on it; those clamps are counted
/// in `stats`.
fn warp_with_curtain(
    source: &Bastion,
    warp: &FieldApplicator<'_>,
    clamp: &CurtainClamp<'_>,
    stats: &mut ClampStats,
) -> Bastion {
    let mut points = source.points.map(|p| warp.apply_point(&p));
    for corner in [B0, B1] {
        points[corner] = clamp.clamp_point(&points[corner], stats);
    }
    Bastion::new(points)
}

/// The per-bastion stages after the curtain warp.
struct BastionFitter<'a> {
    center: Point2,
    curtain_warp: FieldApplicator<'a>,
    outworks_warp: FieldApplicator<'a>,
    clamp: CurtainClamp<'a>,
    margins: ClampMargins,
    options: &'a WarpOptions,
}

impl BastionFitter<'_> {
    fn fit_warped(&self, warped: Bastion, base_clamps: ClampStats) -> FittedBastion {
        let inner = self.clamp.inner;
        let outer = self.clamp.outer;

        let mut bastion = warped;
        for v in MOVABLE {
            let pulled = self.outworks_warp.apply_point(&bastion.points[v]);
            bastion.points[v] = clamp_outside(&self.center, &pulled, inner, self.margins.inner);
        }

        let bound = RadialBound::Polygon {
            ring: outer,
            margin: self.margins.outer,
        };
        let (bastion, shrink) = ShrinkToFit::new(self.center, bound, self.options.shrink)
            .inner(inner, self.margins.inner)
            .execute(bastion);

        let repair = ConvexityRepair::new(
            self.center,
            Some(outer),
            self.margins.outer,
            self.options.repair,
        );
        let (polygon, repair) = repair.execute(bastion);
        FittedBastion {
            polygon,
            shrink,
            repair,
            base_clamps,
        }
    }
}

impl FitBastion for BastionFitter<'_> {
    fn fit(&self, source: Bastion) -> FittedBastion {
        let mut stats = ClampStats::default();
        let warped = warp_with_curtain(&source, &self.curtain_warp, &self.clamp, &mut stats);
        self.fit_warped(warped, stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::RepairOptions;
    use crate::error::RampartError;
    use crate::geometry::bastion::tests::upright;
    use crate::geometry::bastion::TIP;
    use crate::geometry::DistrictRole;
    use crate::math::angle_2d::angular_distance;
    use crate::math::{direction, from_polar, polar};
    use crate::operations::repair::convexity::is_sound;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    #[allow(clippy::cast_precision_loss)]
    fn circle(n: usize, radius: f64) -> Vec<Point2> {
        (0..n)
            .map(|i| from_polar(&Point2::origin(), radius, TAU * i as f64 / n as f64))
            .collect()
    }

    /// `upright()` rotated to stand on the curtain at `theta`, with its
    /// depth stretched by `stretch`.
    fn bastion_at(theta: f64, stretch: f64) -> BastionDescriptor {
        let normal = direction(theta);
        let tangent = direction(theta + FRAC_PI_2);
        let anchor = Point2::origin() + normal * 100.0;
        let points = upright()
            .points
            .map(|p| anchor + tangent * p.x + normal * (p.y * stretch));
        BastionDescriptor::from_polygon(Bastion::new(points))
    }

    fn input() -> WallInput {
        WallInput {
            center: Point2::origin(),
            curtain: circle(48, 100.0),
            target: Some(circle(48, 120.0)),
            inner_hull: circle(48, 80.0),
            outer_hull: circle(64, 150.0),
            districts: Vec::new(),
            bastions: vec![
                bastion_at(0.0, 1.0),
                bastion_at(FRAC_PI_2, 1.0),
                bastion_at(PI, 70.0 / 15.0),
                bastion_at(3.0 * FRAC_PI_2, 1.0),
            ],
        }
    }

    fn audited() -> WarpOptions {
        let mut options = WarpOptions::default();
        options.diagnostics.audit_containment = true;
        options
    }

    #[test]
    fn fitted_wall_respects_hulls_and_convexity() {
        let output = WarpWall::new(input(), audited()).execute().unwrap();
        let d = &output.diagnostics;

        assert_eq!(output.curtain.len(), 48);
        assert_eq!(output.bastions.len(), 4);
        assert_eq!(d.bastions.len(), 4);
        assert_eq!(d.containment.as_deref(), Some(&[][..]));

        let bounds = AngleBounds::from_options(&RepairOptions::default());
        for (report, bastion) in d.bastions.iter().zip(&output.bastions) {
            if report.ok() {
                assert!(is_sound(bastion, &bounds), "{report:?}");
            } else {
                assert_eq!(report.placement, Placement::Unrepaired);
                assert!(report.note.is_some());
            }
        }

        for (i, bastion) in output.bastions.iter().enumerate() {
            if !d.overlapping_bastions.contains(&i) {
                for p in bastion.points {
                    assert!(output.wall.contains(&p));
                }
            }
        }

        // Far from every bastion the curtain reaches its target.
        let anchors = [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2];
        for p in &output.curtain {
            let (r, theta) = polar(&Point2::origin(), p);
            if anchors.iter().all(|a| angular_distance(*a, theta) >= 0.7) {
                assert!((r - 120.0).abs() < 1.0, "r={r} theta={theta}");
            }
        }
    }

    #[test]
    fn deep_bastion_is_pulled_under_the_outer_hull() {
        let output = WarpWall::new(input(), audited()).execute().unwrap();
        let deep = &output.bastions[2];
        for p in deep.points {
            assert!(p.coords.norm() <= 150.0 + 1e-6);
        }
        assert!(output.outworks_field.delta.iter().all(|d| *d <= 0.0));
        assert!(output.outworks_field.delta.iter().any(|d| *d < 0.0));
    }

    #[test]
    fn identical_bastions_are_reported_as_overlapping() {
        let mut input = input();
        input.bastions = vec![bastion_at(0.0, 1.0), bastion_at(0.0, 1.0)];
        let output = WarpWall::new(input, WarpOptions::default()).execute().unwrap();
        assert_eq!(output.diagnostics.overlapping_bastions, vec![1]);
    }

    #[test]
    fn folded_bastion_is_relocated() {
        let mut input = input();
        input.target = None;
        // Tip folded back through the base: no single repair step or the
        // fallback shrink can make it convex.
        let mut bad = bastion_at(FRAC_PI_2, 1.0);
        bad.polygon.points[2] = Point2::new(0.0, 80.0);
        input.bastions = vec![bad];
        let mut options = audited();
        options.repair.iterations = 1;

        let output = WarpWall::new(input, options).execute().unwrap();
        let report = &output.diagnostics.bastions[0];
        let Placement::Slid { candidate, anchor } = report.placement else {
            panic!("expected relocation, got {report:?}");
        };
        assert!(report.ok());
        assert!(report.slide_attempts >= 1);
        assert!(report.note.is_none());
        assert_eq!(output.candidates[candidate].anchor, anchor);
        let bounds = AngleBounds::from_options(&RepairOptions::default());
        assert!(is_sound(&output.bastions[0], &bounds));
        for p in output.bastions[0].points {
            assert!(output.wall.contains(&p));
        }
    }

    #[test]
    fn base_corner_clamps_are_counted() {
        let field = RadialField {
            thetas: (0..32).map(|i| TAU * f64::from(i) / 32.0).collect(),
            r_source: vec![100.0; 32],
            r_target: vec![100.0; 32],
            delta: vec![0.0; 32],
            max_step: 1.0,
        };
        let warp = FieldApplicator::unbanded(&field, Point2::origin());
        // Inner hull outside the outer one: the band is inverted everywhere.
        let inner = circle(64, 130.0);
        let outer = circle(64, 120.0);
        let clamp = CurtainClamp {
            center: Point2::origin(),
            inner: &inner,
            outer: &outer,
            margins: ClampMargins::default(),
        };
        let mut stats = ClampStats::default();
        let source = bastion_at(0.0, 1.0).polygon;
        let out = warp_with_curtain(&source, &warp, &clamp, &mut stats);
        assert_eq!(stats.mid_band_skipped, 2);
        assert_eq!(stats.mid_band, 0);
        assert!(stats.outside_inner >= 2);
        for corner in [B0, B1] {
            assert!(out.points[corner].coords.norm() >= 130.0);
        }
        assert_eq!(out.points[TIP], source.points[TIP]);
    }

    #[test]
    fn inverted_band_at_bastion_base_is_recorded() {
        let mut input = input();
        input.target = None;
        input.inner_hull = circle(48, 130.0);
        input.outer_hull = circle(64, 120.0);
        input.bastions = vec![bastion_at(0.0, 1.0)];
        let output = WarpWall::new(input, WarpOptions::default()).execute().unwrap();
        let d = &output.diagnostics;
        assert_eq!(d.curtain_clamps.mid_band_skipped, 48);
        assert_eq!(d.bastions[0].base_clamps.mid_band_skipped, 2);
        assert_eq!(d.bastion_base_clamps, d.bastions[0].base_clamps);
        assert!(d.candidates.samples > 0);
    }

    #[test]
    fn district_offsets_shift_the_curtain() {
        let mut input = input();
        input.target = None;
        input.bastions.clear();
        input.districts = vec![
            District::new(0.0, PI, DistrictRole::Castle),
            District::new(PI, TAU, DistrictRole::Slum),
        ];
        let mut options = WarpOptions::default();
        options.district_offsets.insert(DistrictRole::Castle, 10.0);
        let output = WarpWall::new(input, options).execute().unwrap();
        let (north, _) = polar(&Point2::origin(), &output.curtain[12]);
        let (south, _) = polar(&Point2::origin(), &output.curtain[36]);
        assert!((north - 110.0).abs() < 1.0, "north={north}");
        assert!((south - 100.0).abs() < 1.0, "south={south}");
    }

    #[test]
    fn missing_polygons_fail_fast() {
        let mut input = input();
        input.inner_hull.truncate(2);
        let err = WarpWall::new(input, WarpOptions::default()).execute().unwrap_err();
        assert!(matches!(
            err,
            RampartError::Config(ConfigError::MissingPolygon("inner_hull"))
        ));
    }

    #[test]
    fn invalid_options_fail_fast() {
        let mut options = WarpOptions::default();
        options.field.samples = 10;
        let err = WarpWall::new(input(), options).execute().unwrap_err();
        assert!(matches!(
            err,
            RampartError::Config(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn non_finite_bastion_is_skipped_and_reported() {
        let mut input = input();
        input.bastions[1].polygon.points[2] = Point2::new(f64::NAN, 0.0);
        let output = WarpWall::new(input, WarpOptions::default()).execute().unwrap();
        let d = &output.diagnostics;
        assert_eq!(d.bastions.len(), 4);
        let report = &d.bastions[1];
        assert!(!report.ok());
        assert_eq!(report.placement, Placement::Unrepaired);
        assert_eq!(report.slide_attempts, 0);
        assert!(report.note.is_some());
        assert!(!output.bastions[1].is_finite());
        assert!(!d.overlapping_bastions.contains(&1));
        assert!(output.wall.iter().all(is_finite_point));
        assert!(output.bastions[0].is_finite());
    }

}
