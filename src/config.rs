//! Options for the wall fitting pipeline.
//!
//! Every group has a `Default` tuned for settlements a few hundred units
//! across, and the whole set can be loaded from TOML with missing keys
//! falling back to those defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::geometry::DistrictRole;

/// Smallest angular sample count accepted for a radial field.
pub const MIN_SAMPLES: usize = 32;

/// Radial field sampling, bounding and smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOptions {
    /// Minimum number of angular samples.
    pub samples: usize,
    /// Largest inward displacement.
    pub max_in: f64,
    /// Largest outward displacement.
    pub max_out: f64,
    /// Largest difference between neighbouring samples.
    pub max_step: f64,
    /// Half-width of the circular triangular smoothing kernel, in samples.
    pub smooth_radius: usize,
    /// Radius (as a fraction of the local source radius) where the warp
    /// starts fading in.
    pub band_inner: f64,
    /// Radius (as a fraction of the local source radius) where the warp
    /// reaches full strength.
    pub band_outer: f64,
    /// Apply the warp at full strength regardless of radius.
    pub ignore_band: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            samples: 96,
            max_in: 30.0,
            max_out: 40.0,
            max_step: 2.5,
            smooth_radius: 2,
            band_inner: 0.5,
            band_outer: 0.9,
            ignore_band: false,
        }
    }
}

/// Angular masks that keep the curtain warp away from bastions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskOptions {
    /// Padding around the shoulder span where displacement is locked.
    pub lock_pad: f64,
    /// Width of the fade from locked to free.
    pub lock_feather: f64,
    /// Padding around the bastion centroid angle where outward
    /// displacement is suppressed.
    pub clear_pad: f64,
    /// Width of the clearance fade.
    pub clear_feather: f64,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            lock_pad: 0.05,
            lock_feather: 0.1,
            clear_pad: 0.02,
            clear_feather: 0.06,
        }
    }
}

/// Safety distances kept from the containment hulls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClampMargins {
    /// Distance kept outside the inner hull.
    pub inner: f64,
    /// Distance kept inside the outer hull.
    pub outer: f64,
    /// Upper bound of the mid-band margin as a fraction of the local gap
    /// between the hulls.
    pub mid_band_fraction: f64,
}

impl Default for ClampMargins {
    fn default() -> Self {
        Self {
            inner: 2.0,
            outer: 2.0,
            mid_band_fraction: 0.25,
        }
    }
}

impl ClampMargins {
    /// Symmetric margin for the curtain mid-band clamp on a ray whose hull
    /// gap is `gap`.
    #[must_use]
    pub fn mid_band_margin(&self, gap: f64) -> f64 {
        self.outer.min(gap.max(0.0) * self.mid_band_fraction)
    }
}

/// Convexity and angle repair of bastions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairOptions {
    /// Iteration budget.
    pub iterations: usize,
    /// Fraction of a vertex's offset from the base midpoint moved per fix.
    pub step: f64,
    /// Smallest interior angle, in degrees.
    pub min_angle_deg: f64,
    /// Largest interior angle at shoulders and tip, in degrees.
    pub max_angle_deg: f64,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            iterations: 40,
            step: 0.15,
            min_angle_deg: 30.0,
            max_angle_deg: 150.0,
        }
    }
}

/// Shrink-to-fit tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkOptions {
    /// Scale reduction at `T = 1`; the polygon is scaled by `1 - k * T`.
    pub scale_k: f64,
    pub spread_weight: f64,
    pub apex_weight: f64,
    pub center_weight: f64,
    /// Upper bound of the correction gain.
    pub max_gain: f64,
    /// Bisection stops once the bracket is narrower than this.
    pub tolerance: f64,
}

impl Default for ShrinkOptions {
    fn default() -> Self {
        Self {
            scale_k: 0.5,
            spread_weight: 0.6,
            apex_weight: 0.8,
            center_weight: 0.3,
            max_gain: 2.0,
            tolerance: 1e-3,
        }
    }
}

/// Relocation of bastions that cannot be repaired in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideOptions {
    /// Candidates tried per bastion.
    pub tries: usize,
    /// Arc-length spacing of the curtain samples used to find candidates.
    pub spacing: f64,
    /// Share of the measured clearance a relocated bastion may use as depth.
    pub clearance_fraction: f64,
}

impl Default for SlideOptions {
    fn default() -> Self {
        Self {
            tries: 4,
            spacing: 4.0,
            clearance_fraction: 0.8,
        }
    }
}

/// Field used to pull bastions back under the outer hull.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutworksOptions {
    /// Largest inward displacement applied to bastions.
    pub max_in: f64,
    pub max_step: f64,
    pub smooth_radius: usize,
}

impl Default for OutworksOptions {
    fn default() -> Self {
        Self {
            max_in: 40.0,
            max_step: 4.0,
            smooth_radius: 1,
        }
    }
}

/// What to record beyond the always-on diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsOptions {
    /// Re-check hull containment of the final geometry.
    pub audit_containment: bool,
}

/// Complete option set for [`crate::operations::WarpWall`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpOptions {
    pub field: FieldOptions,
    pub masks: MaskOptions,
    pub margins: ClampMargins,
    pub repair: RepairOptions,
    pub shrink: ShrinkOptions,
    pub slide: SlideOptions,
    pub outworks: OutworksOptions,
    pub diagnostics: DiagnosticsOptions,
    /// Radius added to the target along sectors of each role.
    pub district_offsets: BTreeMap<DistrictRole, f64>,
}

fn invalid(option: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOption {
        option,
        reason: reason.into(),
    }
}

fn non_negative(option: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(option, format!("must be finite and >= 0, got {value}")));
    }
    Ok(())
}

fn positive(option: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(option, format!("must be finite and > 0, got {value}")));
    }
    Ok(())
}

impl WarpOptions {
    /// Parses options from TOML. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::InvalidOption` if the parsed values fail validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let options: Self = toml::from_str(text).map_err(ConfigError::from)?;
        options.validate()?;
        Ok(options)
    }

    /// Radius offset configured for `role`, zero if none.
    #[must_use]
    pub fn district_offset(&self, role: DistrictRole) -> f64 {
        self.district_offsets.get(&role).copied().unwrap_or(0.0)
    }

    /// Checks every option, reporting the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidOption` naming the offending option.
    pub fn validate(&self) -> Result<()> {
        self.validate_inner().map_err(Into::into)
    }

    fn validate_inner(&self) -> std::result::Result<(), ConfigError> {
        let f = &self.field;
        if f.samples < MIN_SAMPLES {
            return Err(invalid(
                "field.samples",
                format!("must be at least {MIN_SAMPLES}, got {}", f.samples),
            ));
        }
        non_negative("field.max_in", f.max_in)?;
        non_negative("field.max_out", f.max_out)?;
        positive("field.max_step", f.max_step)?;
        non_negative("field.band_inner", f.band_inner)?;
        non_negative("field.band_outer", f.band_outer)?;
        if f.band_inner > f.band_outer {
            return Err(invalid(
                "field.band_inner",
                format!("must not exceed band_outer ({})", f.band_outer),
            ));
        }

        let m = &self.masks;
        non_negative("masks.lock_pad", m.lock_pad)?;
        non_negative("masks.lock_feather", m.lock_feather)?;
        non_negative("masks.clear_pad", m.clear_pad)?;
        non_negative("masks.clear_feather", m.clear_feather)?;

        let c = &self.margins;
        non_negative("margins.inner", c.inner)?;
        non_negative("margins.outer", c.outer)?;
        non_negative("margins.mid_band_fraction", c.mid_band_fraction)?;
        if c.mid_band_fraction > 0.5 {
            return Err(invalid("margins.mid_band_fraction", "must not exceed 0.5"));
        }

        let r = &self.repair;
        if r.iterations == 0 {
            return Err(invalid("repair.iterations", "must be at least 1"));
        }
        positive("repair.step", r.step)?;
        if r.step >= 1.0 {
            return Err(invalid("repair.step", "must be below 1"));
        }
        positive("repair.min_angle_deg", r.min_angle_deg)?;
        if r.max_angle_deg <= r.min_angle_deg || r.max_angle_deg >= 180.0 {
            return Err(invalid(
                "repair.max_angle_deg",
                "must lie between min_angle_deg and 180",
            ));
        }

        let s = &self.shrink;
        non_negative("shrink.scale_k", s.scale_k)?;
        if s.scale_k >= 1.0 {
            return Err(invalid("shrink.scale_k", "must be below 1"));
        }
        non_negative("shrink.spread_weight", s.spread_weight)?;
        non_negative("shrink.apex_weight", s.apex_weight)?;
        non_negative("shrink.center_weight", s.center_weight)?;
        if !s.max_gain.is_finite() || s.max_gain < 1.0 {
            return Err(invalid("shrink.max_gain", "must be finite and >= 1"));
        }
        positive("shrink.tolerance", s.tolerance)?;

        positive("slide.spacing", self.slide.spacing)?;
        positive("slide.clearance_fraction", self.slide.clearance_fraction)?;

        non_negative("outworks.max_in", self.outworks.max_in)?;
        positive("outworks.max_step", self.outworks.max_step)?;

        for (role, offset) in &self.district_offsets {
            if !offset.is_finite() {
                return Err(invalid(
                    "district_offsets",
                    format!("offset for {role:?} must be finite"),
                ));
            }
        }
        Ok(())
    }
}
