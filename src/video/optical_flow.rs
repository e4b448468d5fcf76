use crate::core::types::Point2f;
use crate::core::Mat;
use crate::error::{Error, Result};
use crate::video::Pyramid;

/// Lucas-Kanade iteration parameters.
#[derive(Debug, Clone, Copy)]
pub struct LkParams {
    /// Integration window side, px.
    pub win_size: usize,
    /// Iteration cap per pyramid level.
    pub max_iterations: usize,
    /// Convergence threshold on the per-iteration step, px.
    pub epsilon: f32,
    /// Minimum normalized eigenvalue of the gradient matrix.
    pub min_eigen_threshold: f32,
}

impl Default for LkParams {
    fn default() -> Self {
        Self {
            win_size: 50,
            max_iterations: 50,
            epsilon: 0.01,
            min_eigen_threshold: 0.001,
        }
    }
}

/// Sparse pyramidal Lucas-Kanade optical flow.
///
/// For every input point the flow estimate is refined from the coarsest
/// pyramid level down to the base, iterating a 2x2 normal-equation solve
/// inside the integration window at each level. `status[i]` is 1 when point
/// i was tracked to a finite position on the base level.
pub fn calc_optical_flow_pyr_lk(
    prev_pyr: &Pyramid,
    curr_pyr: &Pyramid,
    prev_pts: &[Point2f],
    curr_pts: &mut Vec<Point2f>,
    status: &mut Vec<u8>,
    params: &LkParams,
) -> Result<()> {
    if !prev_pyr.is_built() || !curr_pyr.is_built() {
        return Err(Error::InvalidParameter(
            "optical flow requires built pyramids".to_string(),
        ));
    }
    let base_prev = prev_pyr.level(0);
    let base_curr = curr_pyr.level(0);
    if base_prev.rows() != base_curr.rows() || base_prev.cols() != base_curr.cols() {
        return Err(Error::InvalidDimensions(
            "pyramids must share base dimensions".to_string(),
        ));
    }

    let levels = prev_pyr.num_levels().min(curr_pyr.num_levels());
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let half = (params.win_size / 2) as i32;
    let side = (2 * half + 1) as usize;
    #[allow(clippy::cast_precision_loss)]
    let win_area = (side * side) as f32;

    curr_pts.clear();
    curr_pts.resize(prev_pts.len(), Point2f::default());
    status.clear();
    status.resize(prev_pts.len(), 0);

    // Window scratch reused across points: intensities with a 1px apron for
    // the central-difference gradients.
    let apron_side = side + 2;
    let mut patch = vec![0f32; apron_side * apron_side];
    let mut grad_x = vec![0f32; side * side];
    let mut grad_y = vec![0f32; side * side];
    let mut curr_patch = vec![0f32; side * side];

    for (i, &pt) in prev_pts.iter().enumerate() {
        let mut flow = Point2f::default();
        let mut tracked = true;

        for level in (0..levels).rev() {
            #[allow(clippy::cast_precision_loss)]
            let scale = 1.0 / (1u32 << level) as f32;
            let p = Point2f::new(pt.x * scale, pt.y * scale);
            let prev_img = prev_pyr.level(level);
            let curr_img = curr_pyr.level(level);

            if !window_fits(prev_img, p, half) {
                if level == 0 {
                    tracked = false;
                } else {
                    flow = flow * 2.0;
                }
                continue;
            }

            // Prev-image window with apron, plus gradients.
            fill_patch(prev_img, p, half + 1, apron_side, &mut patch);
            for row in 0..side {
                for col in 0..side {
                    grad_x[row * side + col] = (patch[(row + 1) * apron_side + (col + 2)]
                        - patch[(row + 1) * apron_side + col])
                        / 2.0;
                    grad_y[row * side + col] = (patch[(row + 2) * apron_side + (col + 1)]
                        - patch[row * apron_side + (col + 1)])
                        / 2.0;
                }
            }

            let mut a11 = 0f32;
            let mut a12 = 0f32;
            let mut a22 = 0f32;
            for k in 0..side * side {
                a11 += grad_x[k] * grad_x[k];
                a12 += grad_x[k] * grad_y[k];
                a22 += grad_y[k] * grad_y[k];
            }

            let det = a11 * a22 - a12 * a12;
            let trace = a11 + a22;
            let min_eig =
                (trace - ((a11 - a22) * (a11 - a22) + 4.0 * a12 * a12).sqrt()) / 2.0 / win_area;

            if min_eig < params.min_eigen_threshold || det.abs() < 1e-12 {
                if level == 0 {
                    tracked = false;
                } else {
                    flow = flow * 2.0;
                }
                continue;
            }

            let mut v = Point2f::default();
            for _ in 0..params.max_iterations {
                let q = Point2f::new(p.x + flow.x + v.x, p.y + flow.y + v.y);
                if !window_fits(curr_img, q, half) {
                    break;
                }
                fill_window(curr_img, q, half, side, &mut curr_patch);

                let mut b1 = 0f32;
                let mut b2 = 0f32;
                for row in 0..side {
                    for col in 0..side {
                        let delta = patch[(row + 1) * apron_side + (col + 1)]
                            - curr_patch[row * side + col];
                        b1 += delta * grad_x[row * side + col];
                        b2 += delta * grad_y[row * side + col];
                    }
                }

                let dx = (a22 * b1 - a12 * b2) / det;
                let dy = (a11 * b2 - a12 * b1) / det;
                v.x += dx;
                v.y += dy;

                if (dx * dx + dy * dy).sqrt() < params.epsilon {
                    break;
                }
            }

            flow = flow + v;
            if level > 0 {
                flow = flow * 2.0;
            }
        }

        let result = pt + flow;
        if tracked && result.x.is_finite() && result.y.is_finite() {
            curr_pts[i] = result;
            status[i] = 1;
        } else {
            curr_pts[i] = pt;
            status[i] = 0;
        }
    }

    Ok(())
}

/// The integration window plus the gradient apron must stay inside the
/// plane, including the far bilinear cell.
fn window_fits(img: &Mat, center: Point2f, half: i32) -> bool {
    #[allow(clippy::cast_precision_loss)]
    let margin = (half + 2) as f32;
    #[allow(clippy::cast_precision_loss)]
    let cols = img.cols() as f32;
    #[allow(clippy::cast_precision_loss)]
    let rows = img.rows() as f32;

    center.x >= margin && center.x < cols - margin && center.y >= margin && center.y < rows - margin
}

/// Bilinear sample normalized to 0..1. The caller keeps coordinates inside
/// the plane with one cell to spare.
#[inline]
fn sample_bilinear(img: &Mat, x: f32, y: f32) -> f32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let x0 = x.floor() as usize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let y0 = y.floor() as usize;
    #[allow(clippy::cast_precision_loss)]
    let fx = x - x0 as f32;
    #[allow(clippy::cast_precision_loss)]
    let fy = y - y0 as f32;

    let v00 = f32::from(img.pixel(y0, x0));
    let v01 = f32::from(img.pixel(y0, x0 + 1));
    let v10 = f32::from(img.pixel(y0 + 1, x0));
    let v11 = f32::from(img.pixel(y0 + 1, x0 + 1));

    let top = v00 * (1.0 - fx) + v01 * fx;
    let bottom = v10 * (1.0 - fx) + v11 * fx;
    (top * (1.0 - fy) + bottom * fy) / 255.0
}

fn fill_patch(img: &Mat, center: Point2f, half: i32, stride: usize, out: &mut [f32]) {
    #[allow(clippy::cast_precision_loss)]
    let half_f = half as f32;
    let span = (2 * half + 1) as usize;
    for row in 0..span {
        #[allow(clippy::cast_precision_loss)]
        let y = center.y - half_f + row as f32;
        for col in 0..span {
            #[allow(clippy::cast_precision_loss)]
            let x = center.x - half_f + col as f32;
            out[row * stride + col] = sample_bilinear(img, x, y);
        }
    }
}

fn fill_window(img: &Mat, center: Point2f, half: i32, side: usize, out: &mut [f32]) {
    #[allow(clippy::cast_precision_loss)]
    let half_f = half as f32;
    for row in 0..side {
        #[allow(clippy::cast_precision_loss)]
        let y = center.y - half_f + row as f32;
        for col in 0..side {
            #[allow(clippy::cast_precision_loss)]
            let x = center.x - half_f + col as f32;
            out[row * side + col] = sample_bilinear(img, x, y);
        }
    }
}
