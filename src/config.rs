/// Tunable parameters for the whole pipeline.
///
/// Constructed once at initialization and treated as immutable afterwards;
/// no stage reads process-wide mutable state during a tick.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Maximum corners detected per frame and tracked points kept.
    pub max_corners: usize,
    /// Number of pattern pyramid levels.
    pub num_train_levels: usize,
    /// Longer side of the trained pattern base plane, in pixels.
    pub max_pattern_size: usize,
    /// Absolute Hamming threshold for accepting a descriptor match.
    pub match_threshold: u32,
    /// Minimum surviving points before the tracker declares loss.
    pub point_threshold: usize,
    /// Minimum RANSAC inliers to accept a detection.
    pub good_match_threshold: usize,
    /// Minimum RANSAC inliers to keep tracking.
    pub good_match_threshold_tracking: usize,
    /// Mean corner displacement (px) beyond which tracking is pruned.
    pub prune_threshold: f32,
    /// Gaussian kernel size for the detection/description plane.
    pub blur_size: usize,
    /// Corner detector Laplacian response threshold.
    pub lap_threshold: i32,
    /// Corner detector minimum-eigenvalue threshold.
    pub eigen_threshold: i32,
    /// Maximum keypoints stored per pattern level.
    pub max_per_level: usize,
    /// Scale step between pattern pyramid levels.
    pub scale_inc: f64,
    /// Optical-flow pyramid depth.
    pub pyramid_levels: usize,
    /// Minimum mean pairwise point distance (px) before loss is declared.
    pub density_threshold: f32,
    /// Spacing of the synthetic fallback feature grid, in pixels.
    pub grid_distance: usize,
    /// Strictest interior angle (degrees) accepted for a detection quad.
    pub max_quad_angle_allowed: f32,
    /// Frames the last quad persists across detection dropouts; also the
    /// damping ramp length.
    pub max_persist_optical_frames: u32,
    /// Detector border margin on full-size planes, in pixels.
    pub detect_border: usize,
    /// Lucas-Kanade window side, in pixels.
    pub lk_win_size: usize,
    /// Lucas-Kanade iteration cap per level.
    pub lk_max_iterations: usize,
    /// Lucas-Kanade convergence threshold on the per-iteration step, px.
    pub lk_epsilon: f32,
    /// Lucas-Kanade minimum normalized eigenvalue of the gradient matrix.
    pub lk_min_eigen: f32,
    /// RANSAC reprojection threshold, px.
    pub ransac_reproj_threshold: f64,
    /// RANSAC success confidence.
    pub ransac_confidence: f64,
    /// RANSAC assumed outlier ratio for the initial iteration budget.
    pub ransac_outlier_ratio: f64,
    /// RANSAC iteration cap.
    pub ransac_max_iterations: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_corners: 300,
            num_train_levels: 8,
            max_pattern_size: 512,
            match_threshold: 48,
            point_threshold: 20,
            good_match_threshold: 20,
            good_match_threshold_tracking: 20,
            prune_threshold: 20.0,
            blur_size: 5,
            lap_threshold: 30,
            eigen_threshold: 25,
            max_per_level: 300,
            scale_inc: std::f64::consts::SQRT_2,
            pyramid_levels: 5,
            density_threshold: 25.0,
            grid_distance: 30,
            max_quad_angle_allowed: 120.0,
            max_persist_optical_frames: 6,
            detect_border: 17,
            lk_win_size: 50,
            lk_max_iterations: 50,
            lk_epsilon: 0.01,
            lk_min_eigen: 0.001,
            ransac_reproj_threshold: 3.0,
            ransac_confidence: 0.99,
            ransac_outlier_ratio: 0.5,
            ransac_max_iterations: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.max_corners, 300);
        assert_eq!(config.num_train_levels, 8);
        assert_eq!(config.match_threshold, 48);
        assert!((config.scale_inc - 1.414_213_562_373_095).abs() < 1e-12);
        assert_eq!(config.max_persist_optical_frames, 6);
    }
}
