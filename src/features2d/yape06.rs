use crate::core::Mat;
use crate::error::{Error, Result};
use crate::features2d::KeyPoint;

/// Horizontal/vertical sampling reach of the Laplacian response.
const RESPONSE_RADIUS: usize = 5;
/// Diagonal sampling reach of the mixed second derivative.
const DIAG_RADIUS: usize = 3;

/// Laplacian-plus-eigenvalue corner detector.
///
/// A candidate pixel must carry a strong Laplacian response, then survives a
/// filter on the minimum eigenvalue of the local second-derivative matrix.
/// The response plane is owned by the detector and reused across frames.
pub struct Yape06 {
    pub laplacian_threshold: i32,
    pub min_eigen_value_threshold: i32,
    laplacian: Vec<i32>,
}

impl Yape06 {
    #[must_use]
    pub fn new(laplacian_threshold: i32, min_eigen_value_threshold: i32) -> Self {
        Self {
            laplacian_threshold,
            min_eigen_value_threshold,
            laplacian: Vec::new(),
        }
    }

    /// Detect corners, appending them to `keypoints` (cleared first).
    ///
    /// No keypoint is emitted within `border` pixels of any edge; the
    /// effective margin never drops below the detector's own sampling reach.
    pub fn detect(&mut self, src: &Mat, border: usize, keypoints: &mut Vec<KeyPoint>) -> Result<()> {
        if src.channels() != 1 {
            return Err(Error::InvalidParameter(
                "corner detection requires a grayscale plane".to_string(),
            ));
        }

        keypoints.clear();

        let cols = src.cols();
        let rows = src.rows();
        let margin = border.max(RESPONSE_RADIUS);
        if cols <= 2 * margin || rows <= 2 * margin {
            return Ok(());
        }

        self.laplacian.clear();
        self.laplacian.resize(rows * cols, 0);

        let data = src.data();
        let dxx = RESPONSE_RADIUS;
        let dyy = RESPONSE_RADIUS * cols;

        for row in margin..rows - margin {
            let base = row * cols;
            for col in margin..cols - margin {
                let p = base + col;
                let center = i32::from(data[p]);
                self.laplacian[p] = i32::from(data[p - dxx])
                    + i32::from(data[p + dxx])
                    + i32::from(data[p - dyy])
                    + i32::from(data[p + dyy])
                    - 4 * center;
            }
        }

        for row in margin..rows - margin {
            let base = row * cols;
            for col in margin..cols - margin {
                let p = base + col;
                let lap = self.laplacian[p];
                if lap <= -self.laplacian_threshold || lap >= self.laplacian_threshold {
                    let eigen = min_eigen_value(data, p, cols, lap);
                    if eigen >= self.min_eigen_value_threshold {
                        #[allow(clippy::cast_precision_loss)]
                        keypoints.push(KeyPoint::new(col as f32, row as f32, eigen as f32));
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for Yape06 {
    fn default() -> Self {
        Self::new(30, 25)
    }
}

/// Minimum eigenvalue (times two) of the second-derivative structure matrix
/// at flat offset `p`. `trace` is the precomputed Laplacian Ixx + Iyy.
fn min_eigen_value(data: &[u8], p: usize, cols: usize, trace: i32) -> i32 {
    let dxx = RESPONSE_RADIUS;
    let dyy = RESPONSE_RADIUS * cols;

    let ixx =
        i32::from(data[p - dxx]) - 2 * i32::from(data[p]) + i32::from(data[p + dxx]);
    let iyy =
        i32::from(data[p - dyy]) - 2 * i32::from(data[p]) + i32::from(data[p + dyy]);

    // Mixed derivative over the +-3 diagonals.
    let se = p + DIAG_RADIUS * cols + DIAG_RADIUS;
    let nw = p - DIAG_RADIUS * cols - DIAG_RADIUS;
    let ne = p - DIAG_RADIUS * cols + DIAG_RADIUS;
    let sw = p + DIAG_RADIUS * cols - DIAG_RADIUS;
    let ixy = i32::from(data[se]) + i32::from(data[nw]) - i32::from(data[ne]) - i32::from(data[sw]);

    let delta = f64::from(ixx - iyy) * f64::from(ixx - iyy) + 4.0 * f64::from(ixy) * f64::from(ixy);
    #[allow(clippy::cast_possible_truncation)]
    let sqrt_delta = delta.sqrt() as i32;

    (trace - sqrt_delta).abs().min((trace + sqrt_delta).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bright_square_image() -> Mat {
        let mut img = Mat::new(64, 64, 1).unwrap();
        for row in 24..40 {
            for col in 24..40 {
                img.set_pixel(row, col, 220);
            }
        }
        img
    }

    #[test]
    fn test_detects_square_corners() {
        let mut detector = Yape06::default();
        let mut kps = Vec::new();
        detector.detect(&bright_square_image(), 5, &mut kps).unwrap();

        assert!(!kps.is_empty());
        // Responses cluster around the square's boundary.
        for kp in &kps {
            assert!(kp.x >= 19.0 && kp.x <= 44.0);
            assert!(kp.y >= 19.0 && kp.y <= 44.0);
        }
    }

    #[test]
    fn test_flat_image_has_no_corners() {
        let mut img = Mat::new(64, 64, 1).unwrap();
        img.fill(128);

        let mut detector = Yape06::default();
        let mut kps = Vec::new();
        detector.detect(&img, 5, &mut kps).unwrap();
        assert!(kps.is_empty());
    }

    #[test]
    fn test_border_respected() {
        let mut img = Mat::new(80, 80, 1).unwrap();
        // Speckle the whole plane with strong isolated dots.
        for row in (2..78).step_by(6) {
            for col in (2..78).step_by(6) {
                img.set_pixel(row, col, 255);
            }
        }

        let border = 17;
        let mut detector = Yape06::default();
        let mut kps = Vec::new();
        detector.detect(&img, border, &mut kps).unwrap();

        assert!(!kps.is_empty());
        #[allow(clippy::cast_precision_loss)]
        let b = border as f32;
        for kp in &kps {
            assert!(kp.x >= b && kp.x < 80.0 - b);
            assert!(kp.y >= b && kp.y < 80.0 - b);
        }
    }

    #[test]
    fn test_tiny_image_yields_nothing() {
        let img = Mat::new(8, 8, 1).unwrap();
        let mut detector = Yape06::default();
        let mut kps = Vec::new();
        detector.detect(&img, 17, &mut kps).unwrap();
        assert!(kps.is_empty());
    }
}
