use crate::core::Mat;
use crate::error::{Error, Result};

/// Apply a separable Gaussian blur to a grayscale plane.
///
/// The kernel size is clamped to the odd range 3..=9. A non-positive sigma
/// derives one from the kernel size.
pub fn gaussian_blur(src: &Mat, dst: &mut Mat, ksize: usize, sigma: f64) -> Result<()> {
    if src.channels() != 1 {
        return Err(Error::InvalidParameter(
            "gaussian_blur requires a grayscale plane".to_string(),
        ));
    }

    let ksize = ksize.clamp(3, 9) | 1;
    let kernel = gaussian_kernel(ksize, sigma);

    dst.ensure_shape(src.rows(), src.cols(), 1)?;

    let rows = src.rows();
    let cols = src.cols();
    let half = (ksize / 2) as i32;

    // Horizontal pass into a float scratch, vertical pass into dst.
    let mut temp = vec![0f32; rows * cols];

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let cols_i32 = cols as i32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let rows_i32 = rows as i32;

    for row in 0..rows {
        for col in 0..cols {
            let mut sum = 0f32;
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let col_i32 = col as i32;
            for (i, &k) in kernel.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let offset = i as i32 - half;
                #[allow(clippy::cast_sign_loss)]
                let c = (col_i32 + offset).clamp(0, cols_i32 - 1) as usize;
                sum += f32::from(src.pixel(row, c)) * k;
            }
            temp[row * cols + col] = sum;
        }
    }

    let out = dst.data_mut();
    for row in 0..rows {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let row_i32 = row as i32;
        for col in 0..cols {
            let mut sum = 0f32;
            for (i, &k) in kernel.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let offset = i as i32 - half;
                #[allow(clippy::cast_sign_loss)]
                let r = (row_i32 + offset).clamp(0, rows_i32 - 1) as usize;
                sum += temp[r * cols + col] * k;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                out[row * cols + col] = (sum + 0.5) as u8;
            }
        }
    }

    Ok(())
}

fn gaussian_kernel(ksize: usize, sigma: f64) -> Vec<f32> {
    let sigma = if sigma <= 0.0 {
        #[allow(clippy::cast_precision_loss)]
        {
            0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
        }
    } else {
        sigma
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let half = (ksize / 2) as i32;
    let mut kernel = Vec::with_capacity(ksize);
    let mut sum = 0.0;

    for i in -half..=half {
        let x = f64::from(i);
        let value = (-x * x / (2.0 * sigma * sigma)).exp();
        #[allow(clippy::cast_possible_truncation)]
        kernel.push(value as f32);
        sum += value;
    }

    #[allow(clippy::cast_possible_truncation)]
    let sum_f32 = sum as f32;
    for val in &mut kernel {
        *val /= sum_f32;
    }

    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_normalized() {
        for ksize in [3usize, 5, 7, 9] {
            let kernel = gaussian_kernel(ksize, 0.0);
            assert_eq!(kernel.len(), ksize);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_blur_uniform_is_uniform() {
        let mut src = Mat::new(16, 16, 1).unwrap();
        src.fill(100);
        let mut dst = Mat::new(1, 1, 1).unwrap();
        gaussian_blur(&src, &mut dst, 5, 0.0).unwrap();

        for row in 0..16 {
            for col in 0..16 {
                assert_eq!(dst.pixel(row, col), 100);
            }
        }
    }

    #[test]
    fn test_blur_spreads_impulse() {
        let mut src = Mat::new(9, 9, 1).unwrap();
        src.set_pixel(4, 4, 255);
        let mut dst = Mat::new(1, 1, 1).unwrap();
        gaussian_blur(&src, &mut dst, 5, 0.0).unwrap();

        assert!(dst.pixel(4, 4) < 255);
        assert!(dst.pixel(4, 3) > 0);
        assert!(dst.pixel(3, 4) > 0);
        // Energy far from the impulse stays zero.
        assert_eq!(dst.pixel(0, 0), 0);
    }

    #[test]
    fn test_even_kernel_size_rounded_up() {
        let mut src = Mat::new(8, 8, 1).unwrap();
        src.fill(7);
        let mut dst = Mat::new(1, 1, 1).unwrap();
        assert!(gaussian_blur(&src, &mut dst, 4, 0.0).is_ok());
    }
}
