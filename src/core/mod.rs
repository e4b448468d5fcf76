pub mod mat;
pub mod matrix;
pub(crate) mod rng;
pub mod types;

pub use mat::Mat;
pub use matrix::Mat3;
pub use types::*;
