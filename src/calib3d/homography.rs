#![allow(clippy::cast_precision_loss)]
use crate::core::rng::Lcg;
use crate::core::types::Point2f;
use crate::core::Mat3;

/// Correspondences drawn per RANSAC hypothesis.
const SAMPLE_SIZE: usize = 4;

/// Seed for the estimator's sampling sequence.
const RANSAC_SEED: u64 = 12345;

/// RANSAC tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct RansacParams {
    /// Reprojection distance (px) under which a correspondence is an inlier.
    pub reproj_threshold: f64,
    /// Target probability of drawing at least one outlier-free sample.
    pub confidence: f64,
    /// Assumed outlier ratio for the initial iteration budget.
    pub outlier_ratio: f64,
    /// Hard iteration cap.
    pub max_iterations: usize,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reproj_threshold: 3.0,
            confidence: 0.99,
            outlier_ratio: 0.5,
            max_iterations: 1000,
        }
    }
}

/// Robust planar homography estimator.
///
/// Owns its sampling RNG so repeated runs over the same correspondences
/// produce the same result. Estimation failure is normal control flow: the
/// caller receives the identity and a zero inlier count, never an error.
pub struct HomographyEstimator {
    params: RansacParams,
    rng: Lcg,
}

impl HomographyEstimator {
    #[must_use]
    pub fn new(params: RansacParams) -> Self {
        Self {
            params,
            rng: Lcg::new(RANSAC_SEED),
        }
    }

    /// Fit `dst ~ H * src` by RANSAC.
    ///
    /// `mask` is resized to the correspondence count and flags the inliers
    /// of the winning model. Returns the model refit on all inliers and the
    /// inlier count; on failure the identity and 0.
    pub fn estimate(
        &mut self,
        src: &[Point2f],
        dst: &[Point2f],
        mask: &mut Vec<bool>,
    ) -> (Mat3, usize) {
        let n = src.len();
        mask.clear();
        mask.resize(n, false);

        if n < SAMPLE_SIZE || dst.len() != n {
            return (Mat3::identity(), 0);
        }

        let thr2 = self.params.reproj_threshold * self.params.reproj_threshold;

        let mut best_h: Option<Mat3> = None;
        let mut best_count = 0usize;
        let mut max_iterations = ransac_iterations(
            self.params.confidence,
            1.0 - self.params.outlier_ratio,
        )
        .min(self.params.max_iterations);

        let mut sample_src = [Point2f::default(); SAMPLE_SIZE];
        let mut sample_dst = [Point2f::default(); SAMPLE_SIZE];

        let mut iteration = 0;
        while iteration < max_iterations {
            iteration += 1;

            let mut picked = [0usize; SAMPLE_SIZE];
            let mut got = 0;
            while got < SAMPLE_SIZE {
                #[allow(clippy::cast_possible_truncation)]
                let candidate = self.rng.below(n as u32) as usize;
                if !picked[..got].contains(&candidate) {
                    picked[got] = candidate;
                    got += 1;
                }
            }
            for (slot, &idx) in picked.iter().enumerate() {
                sample_src[slot] = src[idx];
                sample_dst[slot] = dst[idx];
            }

            let Some(h) = find_homography_dlt(&sample_src, &sample_dst) else {
                continue;
            };

            let count = count_inliers(&h, src, dst, thr2);
            if count > best_count {
                best_count = count;
                best_h = Some(h);

                let inlier_ratio = count as f64 / n as f64;
                max_iterations =
                    ransac_iterations(self.params.confidence, inlier_ratio).min(max_iterations);
            }
        }

        let Some(h) = best_h else {
            return (Mat3::identity(), 0);
        };
        if best_count < SAMPLE_SIZE {
            return (Mat3::identity(), 0);
        }

        for (i, flag) in mask.iter_mut().enumerate() {
            *flag = reprojection_error2(&h, src[i], dst[i]) < thr2;
        }

        // Refit on every inlier of the winning model.
        let inlier_src: Vec<Point2f> = src
            .iter()
            .zip(mask.iter())
            .filter_map(|(p, &keep)| keep.then_some(*p))
            .collect();
        let inlier_dst: Vec<Point2f> = dst
            .iter()
            .zip(mask.iter())
            .filter_map(|(p, &keep)| keep.then_some(*p))
            .collect();

        let refined = find_homography_dlt(&inlier_src, &inlier_dst).unwrap_or(h);
        (refined, best_count)
    }
}

/// Least-squares DLT over N >= 4 correspondences with Hartley
/// normalization. `None` when the configuration is degenerate.
#[must_use]
pub fn find_homography_dlt(src: &[Point2f], dst: &[Point2f]) -> Option<Mat3> {
    let n = src.len();
    if n < SAMPLE_SIZE || dst.len() != n {
        return None;
    }

    let (t_src, norm_src) = normalize_points(src)?;
    let (t_dst, norm_dst) = normalize_points(dst)?;

    // Normal equations for the 8 unknowns with h22 fixed to 1.
    let mut ata = [[0.0f64; 8]; 8];
    let mut atb = [0.0f64; 8];

    for ((x, y), (u, v)) in norm_src.iter().zip(norm_dst.iter()) {
        let rows = [
            ([*x, *y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u], *u),
            ([0.0, 0.0, 0.0, *x, *y, 1.0, -x * v, -y * v], *v),
        ];
        for (a, b) in rows {
            for j in 0..8 {
                for k in 0..8 {
                    ata[j][k] += a[j] * a[k];
                }
                atb[j] += a[j] * b;
            }
        }
    }

    let h = solve_linear_8(&mut ata, &mut atb)?;

    let h_norm = Mat3::from_rows([
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], 1.0],
    ]);

    let t_dst_inv = t_dst.invert()?;
    let mut result = t_dst_inv.mul(&h_norm).mul(&t_src);

    let scale = result.m[2][2];
    if scale.abs() > 1e-12 {
        for row in &mut result.m {
            for value in row.iter_mut() {
                *value /= scale;
            }
        }
    }

    Some(result)
}

/// Translate the centroid to the origin and scale the mean distance to
/// sqrt(2). Returns the applied transform and the normalized coordinates.
fn normalize_points(points: &[Point2f]) -> Option<(Mat3, Vec<(f64, f64)>)> {
    let n = points.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in points {
        cx += f64::from(p.x);
        cy += f64::from(p.y);
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in points {
        let dx = f64::from(p.x) - cx;
        let dy = f64::from(p.y) - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;
    if mean_dist < 1e-9 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let transform = Mat3::from_rows([[s, 0.0, -s * cx], [0.0, s, -s * cy], [0.0, 0.0, 1.0]]);
    let normalized = points
        .iter()
        .map(|p| ((f64::from(p.x) - cx) * s, (f64::from(p.y) - cy) * s))
        .collect();

    Some((transform, normalized))
}

/// Gaussian elimination with partial pivoting; `None` on a vanishing pivot.
fn solve_linear_8(a: &mut [[f64; 8]; 8], b: &mut [f64; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let mut pivot_row = col;
        for row in col + 1..8 {
            if a[row][col].abs() > a[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            a.swap(col, pivot_row);
            b.swap(col, pivot_row);
        }

        for row in col + 1..8 {
            let factor = a[row][col] / a[col][col];
            for k in col..8 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; 8];
    for col in (0..8).rev() {
        let mut sum = b[col];
        for k in col + 1..8 {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }

    Some(x)
}

fn reprojection_error2(h: &Mat3, src: Point2f, dst: Point2f) -> f64 {
    let projected = h.project(src);
    let dx = f64::from(projected.x - dst.x);
    let dy = f64::from(projected.y - dst.y);
    dx * dx + dy * dy
}

fn count_inliers(h: &Mat3, src: &[Point2f], dst: &[Point2f], thr2: f64) -> usize {
    src.iter()
        .zip(dst.iter())
        .filter(|(s, d)| reprojection_error2(h, **s, **d) < thr2)
        .count()
}

/// Iterations needed to hit `confidence` given an inlier ratio.
fn ransac_iterations(confidence: f64, inlier_ratio: f64) -> usize {
    if inlier_ratio < 1e-10 {
        return usize::MAX;
    }
    let p_good_sample = inlier_ratio.powi(SAMPLE_SIZE as i32);
    let denom = 1.0 - p_good_sample;
    if denom < 1e-12 {
        return 1;
    }

    let needed = (1.0 - confidence).ln() / denom.ln();
    if !needed.is_finite() || needed < 1.0 {
        1
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            needed.ceil() as usize
        }
    }
}
