use serde::{Deserialize, Serialize};

use crate::math::angle_2d::{angular_distance, AngularSpan};

/// Role of a ward as seen from the wall.
///
/// Roles only matter here through the radius offset configured for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistrictRole {
    Castle,
    Cathedral,
    Market,
    Patriciate,
    Merchant,
    Craftsmen,
    Administration,
    Military,
    Slum,
    Farm,
    Park,
    Harbour,
    Common,
}

/// An angular sector of the settlement with a role tag.
///
/// Covers `[start, end)` counter-clockwise; sectors may wrap through zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct District {
    pub span: AngularSpan,
    pub role: DistrictRole,
}

impl District {
    /// Creates a district covering `[start, end)` counter-clockwise.
    #[must_use]
    pub fn new(start: f64, end: f64, role: DistrictRole) -> Self {
        Self {
            span: AngularSpan::counter_clockwise(start, end),
            role,
        }
    }
}

/// How an angle was resolved to a district.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistrictHit<'a> {
    /// The angle lies inside the district's sector.
    Covered(&'a District),
    /// No sector covers the angle; this district has the nearest midpoint.
    Nearest(&'a District),
}

impl<'a> DistrictHit<'a> {
    #[must_use]
    pub fn district(&self) -> &'a District {
        match self {
            Self::Covered(d) | Self::Nearest(d) => d,
        }
    }
}

/// Finds the district for `theta`.
///
/// The first district whose sector contains the angle wins. Angles in a
/// gap fall back to the district whose sector midpoint is angularly
/// nearest. Returns `None` only when `districts` is empty.
#[must_use]
pub fn district_at(districts: &[District], theta: f64) -> Option<DistrictHit<'_>> {
    if let Some(d) = districts.iter().find(|d| d.span.contains_half_open(theta)) {
        return Some(DistrictHit::Covered(d));
    }
    districts
        .iter()
        .min_by(|a, b| {
            let da = angular_distance(theta, a.span.midpoint());
            let db = angular_distance(theta, b.span.midpoint());
            da.total_cmp(&db)
        })
        .map(DistrictHit::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn covered_angle_resolves_to_its_district() {
        let districts = vec![
            District::new(0.0, 1.0, DistrictRole::Market),
            District::new(1.0, 2.0, DistrictRole::Slum),
        ];
        let hit = district_at(&districts, 1.5);
        assert!(matches!(hit, Some(DistrictHit::Covered(d)) if d.role == DistrictRole::Slum));
        // The end of a sector belongs to the next one.
        let hit = district_at(&districts, 1.0);
        assert_eq!(hit.map(|h| h.district().role), Some(DistrictRole::Slum));
    }

    #[test]
    fn wrapping_sector_covers_zero() {
        let districts = vec![District::new(TAU - 0.5, 0.5, DistrictRole::Castle)];
        let hit = district_at(&districts, 0.1);
        assert!(matches!(hit, Some(DistrictHit::Covered(_))));
    }

    #[test]
    fn gap_falls_back_to_nearest_midpoint() {
        let districts = vec![
            District::new(0.0, 0.5, DistrictRole::Market),
            District::new(PI, PI + 0.5, DistrictRole::Farm),
        ];
        let hit = district_at(&districts, PI - 0.2);
        assert!(matches!(hit, Some(DistrictHit::Nearest(d)) if d.role == DistrictRole::Farm));
    }

    #[test]
    fn no_districts_resolves_to_none() {
        assert!(district_at(&[], 1.0).is_none());
    }
}
