use crate::core::types::Point2f;

/// Smallest homogeneous denominator magnitude before projection clamps it.
const DENOM_EPS: f64 = 1e-8;

/// 3x3 matrix for planar homographies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub m: [[f64; 3]; 3],
}

impl Mat3 {
    #[must_use]
    pub fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    #[must_use]
    pub fn from_rows(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    #[must_use]
    pub fn det(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Matrix product `self * other`.
    #[must_use]
    pub fn mul(&self, other: &Mat3) -> Mat3 {
        let mut result = [[0.0; 3]; 3];
        for (i, row) in result.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                for k in 0..3 {
                    *cell += self.m[i][k] * other.m[k][j];
                }
            }
        }
        Mat3::from_rows(result)
    }

    /// Inverse by cofactor expansion; `None` when near-singular.
    #[must_use]
    pub fn invert(&self) -> Option<Mat3> {
        let det = self.det();
        if det.abs() < 1e-10 {
            return None;
        }

        let m = &self.m;
        let inv_det = 1.0 / det;

        Some(Mat3::from_rows([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ]))
    }

    /// Project a point through the homography, dividing by the homogeneous
    /// component. The denominator is clamped away from zero so degenerate
    /// matrices surface as divergence rather than non-finite coordinates.
    #[must_use]
    pub fn project(&self, point: Point2f) -> Point2f {
        let x = f64::from(point.x);
        let y = f64::from(point.y);

        let xp = self.m[0][0] * x + self.m[0][1] * y + self.m[0][2];
        let yp = self.m[1][0] * x + self.m[1][1] * y + self.m[1][2];
        let mut wp = self.m[2][0] * x + self.m[2][1] * y + self.m[2][2];

        if wp.abs() < DENOM_EPS {
            wp = if wp < 0.0 { -DENOM_EPS } else { DENOM_EPS };
        }

        #[allow(clippy::cast_possible_truncation)]
        Point2f::new((xp / wp) as f32, (yp / wp) as f32)
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_projection() {
        let h = Mat3::identity();
        let p = Point2f::new(5.0, 7.0);
        assert_eq!(h.project(p), p);
    }

    #[test]
    fn test_mul_identity() {
        let h = Mat3::from_rows([[2.0, 0.0, 3.0], [0.0, 2.0, -1.0], [0.0, 0.0, 1.0]]);
        let r = h.mul(&Mat3::identity());
        assert_eq!(r, h);
    }

    #[test]
    fn test_invert() {
        let m = Mat3::from_rows([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]);
        let inv = m.invert().unwrap();
        assert!((inv.m[0][0] - 0.5).abs() < 1e-12);
        assert!((inv.m[1][1] - 0.5).abs() < 1e-12);
        assert!((inv.m[2][2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invert_singular() {
        let m = Mat3::from_rows([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]);
        assert!(m.invert().is_none());
    }

    #[test]
    fn test_projection_round_trip() {
        let h = Mat3::from_rows([
            [1.1, 0.02, 14.0],
            [-0.03, 0.97, -6.0],
            [1e-4, -2e-4, 1.0],
        ]);
        let inv = h.invert().unwrap();
        let p = Point2f::new(123.0, 45.0);
        let back = inv.project(h.project(p));
        assert!((back.x - p.x).abs() < 1e-3);
        assert!((back.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn test_denominator_clamp() {
        let h = Mat3::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);
        let p = h.project(Point2f::new(1.0, 1.0));
        assert!(p.x.is_finite());
        assert!(p.y.is_finite());
    }
}
