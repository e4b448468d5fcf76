pub mod io;

use log::debug;

use crate::calib3d::{HomographyEstimator, RansacParams};
use crate::config::TrackerConfig;
use crate::core::types::{Point2f, Quad, TransformVariant};
use crate::core::Mat;
use crate::error::{Error, Result};
use crate::features2d::{
    match_pattern, retain_best, DescriptorBank, KeyPoint, Match, Orb, Yape06,
};
use crate::imgproc::{gaussian_blur, rgba_buffer_to_gray};
use crate::pattern::{PatternModel, PatternTrainer};
use crate::shape::{interior_angles, project_reference_corners, quad_is_valid};
use crate::video::{PlanarTracker, TrackResult};

/// Orchestrator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Detecting,
    Tracking,
}

/// Introspection snapshot of the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct PipelineState {
    pub mode: Mode,
    pub optical_persist: u32,
    /// Reserved for sub-frame smoothing; written each tick, not yet read.
    pub interpolation_constant: f32,
}

/// Detect/track orchestrator.
///
/// One instance owns the trained pattern, all per-frame scratch buffers and
/// the tracker, and processes exactly one frame per `tick`. Detection
/// searches the whole frame for the pattern; once locked, optical flow
/// advances the lock frame-to-frame until a divergence check sends the
/// pipeline back to detection. The emitted quad is temporally damped over
/// the first frames after a lock, and the last quad persists across brief
/// detection dropouts before the overlay is hidden.
pub struct Pipeline {
    config: TrackerConfig,
    variant: TransformVariant,
    pattern: PatternModel,

    detector: Yape06,
    orb: Orb,
    estimator: HomographyEstimator,
    tracker: PlanarTracker,

    img_u8: Mat,
    img_u8_smooth: Mat,
    screen_corners: Vec<KeyPoint>,
    screen_descriptors: DescriptorBank,
    matches: Vec<Match>,
    match_from: Vec<Point2f>,
    match_to: Vec<Point2f>,
    match_mask: Vec<bool>,
    inliers: Vec<Point2f>,

    mode: Mode,
    last_quad: Option<Quad>,
    optical_persist: u32,
    interpolation_constant: f32,
    frame_dims: (usize, usize),
}

impl Pipeline {
    /// Train the pattern from a decoded RGBA reference and build the
    /// pipeline around it.
    pub fn new(
        pattern_rgba: &[u8],
        pattern_width: usize,
        pattern_height: usize,
        variant: TransformVariant,
        config: TrackerConfig,
    ) -> Result<Self> {
        let mut trainer = PatternTrainer::new(&config);
        let pattern = trainer.train_rgba(pattern_rgba, pattern_width, pattern_height)?;
        Self::from_model(pattern, variant, config)
    }

    /// Build the pipeline around an already-trained pattern model.
    pub fn from_model(
        pattern: PatternModel,
        variant: TransformVariant,
        config: TrackerConfig,
    ) -> Result<Self> {
        let ransac = RansacParams {
            reproj_threshold: config.ransac_reproj_threshold,
            confidence: config.ransac_confidence,
            outlier_ratio: config.ransac_outlier_ratio,
            max_iterations: config.ransac_max_iterations,
        };

        Ok(Self {
            detector: Yape06::new(config.lap_threshold, config.eigen_threshold),
            orb: Orb::new(),
            estimator: HomographyEstimator::new(ransac),
            tracker: PlanarTracker::new(&config, variant)?,
            img_u8: Mat::new(1, 1, 1)?,
            img_u8_smooth: Mat::new(1, 1, 1)?,
            screen_corners: Vec::with_capacity(config.max_corners),
            screen_descriptors: DescriptorBank::with_capacity(config.max_corners),
            matches: Vec::with_capacity(config.max_corners),
            match_from: Vec::with_capacity(config.max_corners),
            match_to: Vec::with_capacity(config.max_corners),
            match_mask: Vec::with_capacity(config.max_corners),
            inliers: Vec::with_capacity(config.max_corners),
            mode: Mode::Detecting,
            last_quad: None,
            optical_persist: 0,
            interpolation_constant: 0.0,
            frame_dims: (0, 0),
            config,
            variant,
            pattern,
        })
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        PipelineState {
            mode: self.mode,
            optical_persist: self.optical_persist,
            interpolation_constant: self.interpolation_constant,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &PatternModel {
        &self.pattern
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Process one RGBA frame.
    ///
    /// Returns the quad to overlay, or `None` to hide the overlay. The quad
    /// may be a stale repeat of the last lock while a brief detection
    /// dropout sits inside the persistence window.
    pub fn tick(&mut self, rgba: &[u8], width: usize, height: usize) -> Result<Option<Quad>> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions(
                "frame dimensions must be greater than 0".to_string(),
            ));
        }
        if rgba.len() != width * height * 4 {
            return Err(Error::InvalidDimensions(format!(
                "RGBA buffer size {} doesn't match {}x{}x4",
                rgba.len(),
                width,
                height
            )));
        }

        if self.frame_dims != (width, height) {
            // Scratch reallocates lazily below; stale pyramid data cannot be
            // flowed against new geometry, so tracking restarts.
            if self.frame_dims != (0, 0) {
                debug!("frame geometry changed to {width}x{height}; re-entering detection");
            }
            self.frame_dims = (width, height);
            if self.mode == Mode::Tracking {
                self.tracker.reset();
                self.mode = Mode::Detecting;
            }
            self.last_quad = None;
            self.optical_persist = 0;
        }

        rgba_buffer_to_gray(rgba, width, height, &mut self.img_u8)?;

        match self.mode {
            Mode::Detecting => self.detect_tick(),
            Mode::Tracking => self.track_tick(),
        }
    }

    fn detect_tick(&mut self) -> Result<Option<Quad>> {
        gaussian_blur(
            &self.img_u8,
            &mut self.img_u8_smooth,
            self.config.blur_size,
            0.0,
        )?;

        self.detector.detect(
            &self.img_u8_smooth,
            self.config.detect_border,
            &mut self.screen_corners,
        )?;
        retain_best(&mut self.screen_corners, self.config.max_corners);
        self.orb
            .compute_orientations(&self.img_u8_smooth, &mut self.screen_corners);
        self.orb.describe(
            &self.img_u8_smooth,
            &self.screen_corners,
            &mut self.screen_descriptors,
        )?;

        match_pattern(
            &self.screen_descriptors,
            &self.pattern.descriptors,
            self.config.match_threshold,
            &mut self.matches,
        );

        if self.matches.len() >= 4 {
            self.match_from.clear();
            self.match_to.clear();
            for m in &self.matches {
                let pattern_kp = self.pattern.keypoints[m.pattern_level][m.pattern_idx];
                self.match_from.push(Point2f::new(pattern_kp.x, pattern_kp.y));
                let screen_kp = self.screen_corners[m.screen_idx];
                self.match_to.push(Point2f::new(screen_kp.x, screen_kp.y));
            }

            let (h, good) =
                self.estimator
                    .estimate(&self.match_from, &self.match_to, &mut self.match_mask);

            if good >= self.config.good_match_threshold {
                let (ref_w, ref_h) = self.pattern.reference_size();
                let quad = project_reference_corners(&h, ref_w, ref_h, &self.variant);

                if self.detection_quad_acceptable(&quad) {
                    self.inliers.clear();
                    for (i, &keep) in self.match_mask.iter().enumerate() {
                        if keep {
                            self.inliers.push(self.match_to[i]);
                        }
                    }

                    self.tracker
                        .init_with_homography(h, &self.inliers, ref_w, ref_h, &self.img_u8)?;

                    debug!(
                        "detection locked: {} matches, {good} inliers",
                        self.matches.len()
                    );
                    self.mode = Mode::Tracking;
                    self.optical_persist = 0;
                    self.last_quad = Some(quad);
                    return Ok(Some(quad));
                }
            }
        }

        // No lock this frame: repeat the last quad inside the persistence
        // window, hide the overlay past it.
        if self.last_quad.is_some() && self.optical_persist < self.config.max_persist_optical_frames
        {
            self.optical_persist += 1;
            return Ok(self.last_quad);
        }
        self.last_quad = None;
        Ok(None)
    }

    fn track_tick(&mut self) -> Result<Option<Quad>> {
        let damped = self.optical_persist <= self.config.max_persist_optical_frames;

        match self.tracker.track(&self.img_u8)? {
            TrackResult::Tracked(raw) => {
                let quad = match (&self.last_quad, damped) {
                    (Some(previous), true) => damp_quad(
                        &raw,
                        previous,
                        self.optical_persist,
                        self.config.max_persist_optical_frames,
                    ),
                    _ => raw,
                };

                #[allow(clippy::cast_precision_loss)]
                {
                    self.interpolation_constant =
                        self.optical_persist as f32 / self.config.max_persist_optical_frames as f32;
                }
                self.optical_persist =
                    (self.optical_persist + 1).min(self.config.max_persist_optical_frames);
                self.last_quad = Some(quad);
                Ok(Some(quad))
            }
            TrackResult::Lost => {
                debug!("re-entering detection");
                self.mode = Mode::Detecting;
                self.optical_persist = 0;
                // The stale quad goes out once more; the detection path's
                // persistence window takes over from here.
                Ok(self.last_quad)
            }
        }
    }

    fn detection_quad_acceptable(&self, quad: &Quad) -> bool {
        if !quad_is_valid(quad) {
            return false;
        }
        // Detection is stricter than tracking about skew.
        interior_angles(quad)
            .map_or(false, |angles| {
                angles.iter().all(|&a| a < self.config.max_quad_angle_allowed)
            })
    }
}

/// Linear blend between the raw tracker quad and the previously emitted
/// quad: at `f = 0` the previous corners come back unchanged, at `f = max`
/// the raw quad passes through.
fn damp_quad(raw: &Quad, previous: &Quad, f: u32, max: u32) -> Quad {
    #[allow(clippy::cast_precision_loss)]
    let ff = f as f32;
    #[allow(clippy::cast_precision_loss)]
    let mm = max as f32;

    let mut corners = [Point2f::default(); 4];
    for (i, corner) in corners.iter_mut().enumerate() {
        *corner = (raw.corners[i] * ff + previous.corners[i] * (mm - ff)) * (1.0 / mm);
    }
    Quad::new(corners)
}
