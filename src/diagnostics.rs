//! Records of every recoverable condition the pipeline worked around.

use std::ops::AddAssign;

use crate::math::Point2;

/// Sampling fallbacks taken while building a radial field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldDiagnostics {
    /// Number of angular samples.
    pub samples: usize,
    /// Rays that missed the source polygon and reused a neighbouring radius.
    pub source_misses: usize,
    /// Rays that missed the target polygon and reused a neighbouring radius.
    pub target_misses: usize,
    /// Raw displacements that were not finite and were replaced by zero.
    pub non_finite_deltas: usize,
    /// Samples whose district was resolved through the nearest sector
    /// midpoint instead of a covering sector.
    pub district_fallbacks: usize,
}

/// Vertices moved by the curtain post-clamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClampStats {
    pub outside_inner: usize,
    pub mid_band: usize,
    /// Vertices left untouched because the band was missing or inverted.
    pub mid_band_skipped: usize,
}

impl AddAssign for ClampStats {
    fn add_assign(&mut self, other: Self) {
        self.outside_inner += other.outside_inner;
        self.mid_band += other.mid_band;
        self.mid_band_skipped += other.mid_band_skipped;
    }
}

/// Outcome of the clearance search along the curtain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateDiagnostics {
    /// Curtain samples measured.
    pub samples: usize,
    /// Samples whose outward ray missed the outer hull; they count as
    /// having no clearance.
    pub clearance_misses: usize,
}

/// Outcome of shrink-to-fit for one bastion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShrinkReport {
    /// Smallest shrink parameter found to satisfy the bound.
    pub t: f64,
    pub gain: f64,
    /// Largest overshoot past the bound before shrinking.
    pub worst_overshoot: f64,
    /// The bound could not be met even at `t = 1`.
    pub saturated: bool,
}

/// Outcome of convexity and angle repair for one bastion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub ok: bool,
    pub iterations: usize,
    /// The budget ran out and the aggressive fallback shrink was applied.
    pub fallback_used: bool,
}

/// Where a bastion ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Repaired at its original anchor.
    Original,
    /// Relocated to a clearance-maximum candidate.
    Slid { candidate: usize, anchor: Point2 },
    /// Neither local repair nor relocation succeeded; the best-effort
    /// polygon is kept.
    Unrepaired,
}

/// Per-bastion record.
#[derive(Debug, Clone, PartialEq)]
pub struct BastionReport {
    pub index: usize,
    pub shrink: Option<ShrinkReport>,
    pub repair: RepairReport,
    /// Curtain clamps applied to the base corners of the final polygon.
    pub base_clamps: ClampStats,
    pub placement: Placement,
    /// Candidates tried during relocation.
    pub slide_attempts: usize,
    /// Human-readable reason when the bastion is not `ok`.
    pub note: Option<String>,
}

impl BastionReport {
    /// Whether the final polygon satisfies the convexity and angle checks.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.repair.ok
    }
}

/// Which containment rule a vertex broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentRule {
    /// A curtain vertex lies too close to (or inside) the inner hull.
    CurtainInsideInner,
    /// A bastion vertex lies beyond the outer hull.
    BastionOutsideOuter,
    /// The boundary could not be measured along the vertex's ray.
    Unmeasured,
}

/// A single failed containment check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainmentViolation {
    pub rule: ContainmentRule,
    /// Bastion index, or `None` for curtain vertices.
    pub bastion: Option<usize>,
    pub vertex: usize,
    /// How far past the allowed radius the vertex lies.
    pub excess: f64,
}

/// Everything the pipeline recovered from, for after-the-fact auditing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarpDiagnostics {
    pub curtain_field: FieldDiagnostics,
    pub outworks_field: FieldDiagnostics,
    pub curtain_clamps: ClampStats,
    /// Base-corner clamps summed over every final bastion.
    pub bastion_base_clamps: ClampStats,
    pub candidates: CandidateDiagnostics,
    pub bastions: Vec<BastionReport>,
    /// Bastions skipped while stitching because they overlap an earlier one.
    pub overlapping_bastions: Vec<usize>,
    /// Present when containment auditing is enabled.
    pub containment: Option<Vec<ContainmentViolation>>,
}

impl WarpDiagnostics {
    /// Number of bastions that did not pass repair.
    #[must_use]
    pub fn failed_bastions(&self) -> usize {
        self.bastions.iter().filter(|b| !b.ok()).count()
    }
}
