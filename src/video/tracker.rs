use log::debug;

use crate::calib3d::{HomographyEstimator, RansacParams};
use crate::config::TrackerConfig;
use crate::core::types::{Point2f, Quad, TransformVariant};
use crate::core::{Mat, Mat3};
use crate::error::Result;
use crate::shape::{project_reference_corners, quad_is_valid};
use crate::video::{calc_optical_flow_pyr_lk, LkParams, Pyramid};

/// Outcome of one tracking step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackResult {
    /// The pattern is still locked; here is its quad for this frame.
    Tracked(Quad),
    /// Tracking diverged; the caller should fall back to detection.
    Lost,
}

/// Frame-to-frame planar tracker.
///
/// Seeded by a successful detection with a base homography and its inlier
/// points, then advanced once per frame by pyramidal optical flow. Each step
/// estimates the incremental motion between consecutive frames, composes it
/// onto the base homography and re-projects the reference rectangle. Any
/// divergence check failing resets the state and reports `Lost`.
pub struct PlanarTracker {
    config: TrackerConfig,
    lk: LkParams,
    estimator: HomographyEstimator,

    h_base: Mat3,
    pyramids: [Pyramid; 2],
    /// Index of the pyramid holding the most recently ingested frame.
    curr_idx: usize,
    prev_pts: Vec<Point2f>,
    curr_pts: Vec<Point2f>,
    status: Vec<u8>,
    mask: Vec<bool>,

    ref_w: f32,
    ref_h: f32,
    variant: TransformVariant,
    prev_quad: Option<Quad>,
}

impl PlanarTracker {
    pub fn new(config: &TrackerConfig, variant: TransformVariant) -> Result<Self> {
        let lk = LkParams {
            win_size: config.lk_win_size,
            max_iterations: config.lk_max_iterations,
            epsilon: config.lk_epsilon,
            min_eigen_threshold: config.lk_min_eigen,
        };
        let ransac = RansacParams {
            reproj_threshold: config.ransac_reproj_threshold,
            confidence: config.ransac_confidence,
            outlier_ratio: config.ransac_outlier_ratio,
            max_iterations: config.ransac_max_iterations,
        };

        Ok(Self {
            config: config.clone(),
            lk,
            estimator: HomographyEstimator::new(ransac),
            h_base: Mat3::identity(),
            pyramids: [
                Pyramid::new(config.pyramid_levels)?,
                Pyramid::new(config.pyramid_levels)?,
            ],
            curr_idx: 0,
            prev_pts: Vec::with_capacity(config.max_corners),
            curr_pts: Vec::with_capacity(config.max_corners),
            status: Vec::with_capacity(config.max_corners),
            mask: Vec::with_capacity(config.max_corners),
            ref_w: 0.0,
            ref_h: 0.0,
            variant,
            prev_quad: None,
        })
    }

    /// Whether the tracker currently holds a point set to advance.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.curr_pts.is_empty()
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.curr_pts.len()
    }

    #[must_use]
    pub fn base_homography(&self) -> &Mat3 {
        &self.h_base
    }

    /// Seed tracking from a detection: base homography, the detection's
    /// inlier screen points (clamped to capacity), the reference rectangle
    /// dimensions, and the grayscale detection frame itself, which becomes
    /// the previous frame of the first tracking step.
    pub fn init_with_homography(
        &mut self,
        h: Mat3,
        points: &[Point2f],
        ref_w: f32,
        ref_h: f32,
        frame: &Mat,
    ) -> Result<()> {
        self.h_base = h;
        self.ref_w = ref_w;
        self.ref_h = ref_h;
        self.prev_quad = None;

        self.curr_pts.clear();
        let take = points.len().min(self.config.max_corners);
        if take < points.len() {
            debug!(
                "tracker seeded with {} of {} points (capacity clamp)",
                take,
                points.len()
            );
        }
        self.curr_pts.extend_from_slice(&points[..take]);

        self.pyramids[self.curr_idx].build_from(frame)?;
        Ok(())
    }

    /// Advance tracking by one frame.
    pub fn track(&mut self, frame: &Mat) -> Result<TrackResult> {
        if !self.is_active() {
            return Ok(self.declare_lost("tracker not initialized"));
        }

        // The last frame's points and pyramid become the previous side.
        std::mem::swap(&mut self.prev_pts, &mut self.curr_pts);
        let prev_idx = self.curr_idx;
        self.curr_idx ^= 1;

        if mean_pairwise_distance(&self.prev_pts) < self.config.density_threshold {
            return Ok(self.declare_lost("point cloud collapsed"));
        }

        self.pyramids[self.curr_idx].build_from(frame)?;

        let (prev_side, curr_side) = if prev_idx == 0 {
            let (a, b) = self.pyramids.split_at(1);
            (&a[0], &b[0])
        } else {
            let (a, b) = self.pyramids.split_at(1);
            (&b[0], &a[0])
        };

        calc_optical_flow_pyr_lk(
            prev_side,
            curr_side,
            &self.prev_pts,
            &mut self.curr_pts,
            &mut self.status,
            &self.lk,
        )?;

        // Drop points that did not survive, keeping correspondences aligned.
        let mut write = 0;
        for read in 0..self.curr_pts.len() {
            if self.status[read] == 1 {
                self.prev_pts[write] = self.prev_pts[read];
                self.curr_pts[write] = self.curr_pts[read];
                write += 1;
            }
        }
        self.prev_pts.truncate(write);
        self.curr_pts.truncate(write);

        if self.curr_pts.len() < self.config.point_threshold {
            return Ok(self.declare_lost("too few surviving points"));
        }

        let (h_inc, good) = self
            .estimator
            .estimate(&self.prev_pts, &self.curr_pts, &mut self.mask);
        if good < self.config.good_match_threshold_tracking {
            return Ok(self.declare_lost("incremental motion under-supported"));
        }

        // h_inc maps the previous frame onto the current one, so it composes
        // on the outside of the pattern-to-frame base.
        self.h_base = h_inc.mul(&self.h_base);

        let quad = project_reference_corners(&self.h_base, self.ref_w, self.ref_h, &self.variant);

        if let Some(prev_quad) = &self.prev_quad {
            if prev_quad.mean_displacement(&quad) > self.config.prune_threshold {
                return Ok(self.declare_lost("corner displacement over prune limit"));
            }
        }
        if !quad_is_valid(&quad) {
            return Ok(self.declare_lost("projected quad degenerate"));
        }

        self.prev_quad = Some(quad);
        Ok(TrackResult::Tracked(quad))
    }

    /// Drop all tracking state: points cleared, base homography back to
    /// identity, previous quad forgotten.
    pub fn reset(&mut self) {
        self.curr_pts.clear();
        self.prev_pts.clear();
        self.h_base = Mat3::identity();
        self.prev_quad = None;
    }

    fn declare_lost(&mut self, reason: &str) -> TrackResult {
        debug!("tracking lost: {reason}");
        self.reset();
        TrackResult::Lost
    }
}

/// Mean distance over all point pairs; zero for fewer than two points.
fn mean_pairwise_distance(points: &[Point2f]) -> f32 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }

    let mut sum = 0.0f32;
    let mut count = 0u32;
    for i in 0..n {
        for j in i + 1..n {
            sum += points[i].distance_to(points[j]);
            count += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    {
        sum / count as f32
    }
}
