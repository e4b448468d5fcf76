//! # planar-tracker
//!
//! A markerless planar-image tracker for augmented-reality overlays,
//! implemented in pure Rust.
//!
//! Given a reference image (the "pattern") and a stream of RGBA video
//! frames, the pipeline locates the pattern in each frame and returns the
//! quadrilateral of its projection in frame coordinates, stable enough to
//! lock a video overlay onto it.
//!
//! ## Pipeline
//!
//! - **Training**: the pattern is expanded into a scale-space pyramid of
//!   oriented corners with binary descriptors ([`pattern::PatternTrainer`]).
//! - **Detection**: per-frame corners are matched against the trained
//!   pyramid and a RANSAC homography locates the pattern.
//! - **Tracking**: once locked, pyramidal Lucas-Kanade optical flow advances
//!   the lock frame-to-frame at a fraction of the detection cost.
//! - **Orchestration**: [`pipeline::Pipeline`] switches between the two,
//!   damps the output quad temporally and persists it across brief
//!   dropouts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use planar_tracker::prelude::*;
//!
//! # fn main() -> planar_tracker::error::Result<()> {
//! let pattern = planar_tracker::imgcodecs::imread_rgba("pattern.png")?;
//! let mut pipeline = Pipeline::new(
//!     pattern.data(),
//!     pattern.cols(),
//!     pattern.rows(),
//!     TransformVariant::default(),
//!     TrackerConfig::default(),
//! )?;
//!
//! let frame_rgba = vec![0u8; 640 * 480 * 4];
//! if let Some(quad) = pipeline.tick(&frame_rgba, 640, 480)? {
//!     println!("pattern at {:?}", quad.corners);
//! }
//! # Ok(())
//! # }
//! ```

pub mod calib3d;
pub mod config;
pub mod core;
pub mod error;
pub mod features2d;
pub mod imgcodecs;
pub mod imgproc;
pub mod pattern;
pub mod pipeline;
pub mod shape;
pub mod video;

pub mod prelude {
    //! Convenience module that re-exports commonly used items
    pub use crate::config::TrackerConfig;
    pub use crate::core::{Mat, Mat3, Point2f, Quad, Size, TransformVariant};
    pub use crate::error::{Error, Result};
    pub use crate::pattern::{PatternModel, PatternTrainer};
    pub use crate::pipeline::{Mode, Pipeline};
}
