pub mod bastion;
pub mod district;
pub mod field;

pub use bastion::{Bastion, BastionDescriptor};
pub use district::{District, DistrictRole};
pub use field::RadialField;
