/// Accuracy tests for the homography estimator against known transforms.
use approx::assert_relative_eq;
use planar_tracker::calib3d::{find_homography_dlt, HomographyEstimator, RansacParams};
use planar_tracker::core::{Mat3, Point2f};

fn scatter_points() -> Vec<Point2f> {
    let mut points = Vec::new();
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..40 {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let x = ((state >> 33) % 600) as f32;
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let y = ((state >> 33) % 440) as f32;
        points.push(Point2f::new(x + 20.0, y + 20.0));
    }
    points
}

#[test]
fn test_dlt_recovers_similarity_transform() {
    let angle = 0.35f64;
    let scale = 0.85f64;
    let (sin, cos) = angle.sin_cos();
    let truth = Mat3::from_rows([
        [scale * cos, -scale * sin, 120.0],
        [scale * sin, scale * cos, -40.0],
        [0.0, 0.0, 1.0],
    ]);

    let src = scatter_points();
    let dst: Vec<Point2f> = src.iter().map(|p| truth.project(*p)).collect();

    let h = find_homography_dlt(&src, &dst).expect("similarity should be solvable");
    for (s, d) in src.iter().zip(dst.iter()) {
        let p = h.project(*s);
        assert_relative_eq!(p.x, d.x, epsilon = 1e-2);
        assert_relative_eq!(p.y, d.y, epsilon = 1e-2);
    }
}

#[test]
fn test_dlt_normalized_to_unit_scale() {
    let src = scatter_points();
    let dst: Vec<Point2f> = src.iter().map(|p| Point2f::new(p.x + 11.0, p.y - 7.0)).collect();

    let h = find_homography_dlt(&src, &dst).unwrap();
    assert_relative_eq!(h.m[2][2], 1.0, epsilon = 1e-9);
}

#[test]
fn test_ransac_survives_forty_percent_outliers() {
    let truth = Mat3::from_rows([
        [1.1, 0.06, 33.0],
        [-0.04, 0.95, 18.0],
        [2e-4, -1e-4, 1.0],
    ]);

    let src = scatter_points();
    let mut dst: Vec<Point2f> = src.iter().map(|p| truth.project(*p)).collect();
    let n = dst.len();
    for (i, p) in dst.iter_mut().enumerate() {
        if i % 5 < 2 {
            // 40% gross outliers.
            p.x = (i * 71 % 600) as f32;
            p.y = (i * 37 % 440) as f32;
        }
    }

    let mut estimator = HomographyEstimator::new(RansacParams::default());
    let mut mask = Vec::new();
    let (h, count) = estimator.estimate(&src, &dst, &mut mask);

    assert!(count >= n / 2, "only {count} inliers of {n}");
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        if i % 5 < 2 {
            continue;
        }
        let p = h.project(*s);
        assert!((p.x - d.x).abs() < 1.5, "inlier {i} off by {}", (p.x - d.x).abs());
        assert!((p.y - d.y).abs() < 1.5);
    }

    // Outliers stay flagged out.
    let flagged: usize = mask.iter().filter(|&&m| m).count();
    assert_eq!(flagged, count);
}

#[test]
fn test_ransac_identity_on_failure() {
    let src = vec![Point2f::new(1.0, 1.0), Point2f::new(2.0, 2.0)];
    let dst = src.clone();

    let mut estimator = HomographyEstimator::new(RansacParams::default());
    let mut mask = Vec::new();
    let (h, count) = estimator.estimate(&src, &dst, &mut mask);

    assert_eq!(count, 0);
    assert_eq!(h, Mat3::identity());
    assert_eq!(mask.len(), 2);
}

#[test]
fn test_estimated_homography_is_invertible() {
    let truth = Mat3::from_rows([
        [0.92, 0.1, 60.0],
        [-0.07, 1.08, -25.0],
        [1e-4, 2e-4, 1.0],
    ]);
    let src = scatter_points();
    let dst: Vec<Point2f> = src.iter().map(|p| truth.project(*p)).collect();

    let h = find_homography_dlt(&src, &dst).unwrap();
    let inv = h.invert().expect("estimated homography must be invertible");

    for p in &src {
        let round_trip = inv.project(h.project(*p));
        assert_relative_eq!(round_trip.x, p.x, epsilon = 1e-3);
        assert_relative_eq!(round_trip.y, p.y, epsilon = 1e-3);
    }
}
