pub mod color;
pub mod filter;
pub mod resize;

pub use color::*;
pub use filter::*;
pub use resize::*;
