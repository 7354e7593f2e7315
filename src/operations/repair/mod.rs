//! Bastion repair stages: convexity and angle repair, shrink-to-fit and
//! relocation along the curtain.

pub mod convexity;
pub mod placement;
pub mod shrink;

pub use convexity::{AngleBounds, ConvexityRepair};
pub use placement::{
    clearance_candidates, FitBastion, FittedBastion, PlacementCandidate, SlideRepair,
};
pub use shrink::{RadialBound, ShrinkToFit};
