pub mod affine;
pub mod error;
pub mod face;
pub mod item;
pub mod tunnel;
