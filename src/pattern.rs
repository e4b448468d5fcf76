use log::warn;

use crate::config::TrackerConfig;
use crate::core::Mat;
use crate::error::{Error, Result};
use crate::features2d::{retain_best, DescriptorBank, KeyPoint, Orb, Yape06};
use crate::imgproc::{gaussian_blur, pyr_down, resample, rgba_buffer_to_gray};

/// Trained representation of the reference image.
///
/// Keypoint coordinates are stored in base-level pixels regardless of the
/// level they were detected on, so matches feed the homography estimator in
/// one coordinate frame. Per level, descriptor row i belongs to keypoint i.
/// Immutable once trained.
#[derive(Debug)]
pub struct PatternModel {
    pub keypoints: Vec<Vec<KeyPoint>>,
    pub descriptors: Vec<DescriptorBank>,
    /// Half-resolution copy of the base plane.
    pub preview: Mat,
}

impl PatternModel {
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.keypoints.len()
    }

    /// Dimensions of the reference rectangle in base-level pixels (the
    /// preview is half-size, so both sides double back up).
    #[must_use]
    pub fn reference_size(&self) -> (f32, f32) {
        #[allow(clippy::cast_precision_loss)]
        {
            (
                (self.preview.cols() * 2) as f32,
                (self.preview.rows() * 2) as f32,
            )
        }
    }
}

/// Offline trainer producing a `PatternModel` from a reference image.
///
/// When the reference is degenerate (near-zero contrast, or a level where
/// detection finds nothing), the trainer synthesizes a grid of fallback
/// features instead of failing; matching quality degrades but the pipeline
/// keeps a well-formed model. The fallback is logged at warn level.
pub struct PatternTrainer {
    config: TrackerConfig,
    detector: Yape06,
    orb: Orb,
}

impl PatternTrainer {
    #[must_use]
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            config: config.clone(),
            detector: Yape06::new(config.lap_threshold, config.eigen_threshold),
            orb: Orb::new(),
        }
    }

    /// Train from a decoded RGBA reference image.
    pub fn train_rgba(&mut self, rgba: &[u8], width: usize, height: usize) -> Result<PatternModel> {
        let mut gray = Mat::new(1, 1, 1)?;
        rgba_buffer_to_gray(rgba, width, height, &mut gray)?;
        self.train(&gray)
    }

    /// Train from a grayscale reference plane.
    pub fn train(&mut self, gray: &Mat) -> Result<PatternModel> {
        if gray.channels() != 1 {
            return Err(Error::InvalidParameter(
                "pattern training requires a grayscale plane".to_string(),
            ));
        }

        let (lo, hi) = intensity_range(gray);
        if hi - lo < 5 {
            warn!(
                "pattern contrast is near zero ({lo}..{hi}); trained features will be synthetic"
            );
        }

        // Base plane: longer side scaled to the configured pattern size.
        #[allow(clippy::cast_precision_loss)]
        let sc = self.config.max_pattern_size as f64 / gray.cols().max(gray.rows()) as f64;
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let base_w = ((gray.cols() as f64 * sc).round() as usize).max(2);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let base_h = ((gray.rows() as f64 * sc).round() as usize).max(2);

        let mut base = Mat::new(1, 1, 1)?;
        resample(gray, &mut base, base_w, base_h)?;

        let mut preview = Mat::new(1, 1, 1)?;
        pyr_down(&base, &mut preview)?;

        let mut all_keypoints = Vec::with_capacity(self.config.num_train_levels);
        let mut all_descriptors = Vec::with_capacity(self.config.num_train_levels);

        let mut level_img = Mat::new(1, 1, 1)?;
        let mut level_smooth = Mat::new(1, 1, 1)?;
        let mut keypoints: Vec<KeyPoint> = Vec::with_capacity(self.config.max_per_level);

        for level in 0..self.config.num_train_levels {
            #[allow(clippy::cast_possible_wrap)]
            let scale = self.config.scale_inc.powi(-(level as i32));
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lw = ((base_w as f64 * scale).round() as usize).max(2);
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lh = ((base_h as f64 * scale).round() as usize).max(2);

            resample(&base, &mut level_img, lw, lh)?;
            gaussian_blur(&level_img, &mut level_smooth, self.config.blur_size, 0.0)?;

            // Small levels get a proportionally smaller exclusion border.
            let border = self.config.detect_border.min(lw.min(lh) / 10);

            self.detector.detect(&level_smooth, border, &mut keypoints)?;
            retain_best(&mut keypoints, self.config.max_per_level);

            if keypoints.is_empty() {
                warn!("pattern level {level} ({lw}x{lh}) has no detectable features; using fallback grid");
                synthesize_fallback(
                    lw,
                    lh,
                    border,
                    self.config.grid_distance,
                    &mut keypoints,
                );
                retain_best(&mut keypoints, self.config.max_per_level);
            }

            self.orb.compute_orientations(&level_smooth, &mut keypoints);

            let mut bank = DescriptorBank::with_capacity(self.config.max_per_level);
            self.orb.describe(&level_smooth, &keypoints, &mut bank)?;

            // Store coordinates in base-level units.
            #[allow(clippy::cast_possible_truncation)]
            let inv_scale = (1.0 / scale) as f32;
            let mut stored = keypoints.clone();
            for kp in &mut stored {
                kp.x *= inv_scale;
                kp.y *= inv_scale;
                kp.level = level;
            }

            all_keypoints.push(stored);
            all_descriptors.push(bank);
        }

        Ok(PatternModel {
            keypoints: all_keypoints,
            descriptors: all_descriptors,
            preview,
        })
    }
}

fn intensity_range(img: &Mat) -> (i32, i32) {
    let mut lo = 255u8;
    let mut hi = 0u8;
    for &v in img.data() {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (i32::from(lo), i32::from(hi))
}

/// Grid of synthetic keypoints plus five canonical anchors at the quarter
/// and center positions.
fn synthesize_fallback(
    cols: usize,
    rows: usize,
    border: usize,
    grid_distance: usize,
    keypoints: &mut Vec<KeyPoint>,
) {
    keypoints.clear();

    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (cols as f32, rows as f32);
    for (fx, fy) in [
        (0.25, 0.25),
        (0.75, 0.25),
        (0.5, 0.5),
        (0.25, 0.75),
        (0.75, 0.75),
    ] {
        keypoints.push(KeyPoint::new(w * fx, h * fy, 2.0));
    }

    let step = grid_distance.max(1);
    let margin = border.max(1);
    let mut y = margin;
    while y < rows.saturating_sub(margin) {
        let mut x = margin;
        while x < cols.saturating_sub(margin) {
            #[allow(clippy::cast_precision_loss)]
            keypoints.push(KeyPoint::new(x as f32, y as f32, 1.0));
            x += step;
        }
        y += step;
    }
}
