pub mod keypoints;
pub mod matching;
pub mod orb;
pub mod yape06;

pub use keypoints::*;
pub use matching::*;
pub use orb::*;
pub use yape06::*;
