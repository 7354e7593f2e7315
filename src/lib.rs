//! Fits a settlement's curtain wall and its bastions between an inner and
//! an outer containment hull using radial displacement fields.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;

pub use config::WarpOptions;
pub use error::{RampartError, Result};
pub use operations::{WallInput, WarpOutput, WarpWall};
