use crate::core::Mat;
use crate::error::Result;
use crate::imgproc::pyr_down;

/// Owned scale-space pyramid built by successive half-sampling.
///
/// The tracker keeps two of these and swaps them each tick; levels are
/// reused across frames and only reallocate when the base geometry changes.
#[derive(Debug, Clone)]
pub struct Pyramid {
    levels: Vec<Mat>,
    built: bool,
}

impl Pyramid {
    /// Create an unbuilt pyramid with room for `num_levels` planes.
    pub fn new(num_levels: usize) -> Result<Self> {
        let mut levels = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            levels.push(Mat::new(1, 1, 1)?);
        }
        Ok(Self {
            levels,
            built: false,
        })
    }

    /// Number of levels the pyramid holds once built.
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Whether `build_from` has run since construction.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[must_use]
    pub fn level(&self, i: usize) -> &Mat {
        &self.levels[i]
    }

    /// Rebuild all levels from a grayscale base plane.
    ///
    /// Level 0 copies the base; each further level is a 2x box downsample
    /// of the previous one.
    pub fn build_from(&mut self, base: &Mat) -> Result<()> {
        self.levels[0].ensure_shape(base.rows(), base.cols(), 1)?;
        self.levels[0].copy_from(base)?;

        for i in 1..self.levels.len() {
            let (src, rest) = self.levels.split_at_mut(i);
            pyr_down(&src[i - 1], &mut rest[0])?;
        }

        self.built = true;
        Ok(())
    }
}
