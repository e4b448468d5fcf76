pub mod optical_flow;
pub mod pyramid;
pub mod tracker;

pub use optical_flow::*;
pub use pyramid::*;
pub use tracker::*;
