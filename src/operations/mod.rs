pub mod apply_field;
pub mod field;
pub mod repair;
pub mod warp;

pub use apply_field::{FieldApplicator, RadialBand};
pub use field::RadialFieldBuilder;
pub use repair::{ConvexityRepair, ShrinkToFit, SlideRepair};
pub use warp::{assemble_composite, audit_containment, WallInput, WarpOutput, WarpWall};
