mod build;
pub mod mask;
pub mod smooth;

pub use build::{sample_count, FieldParams, RadialFieldBuilder};
pub use mask::BastionMask;
