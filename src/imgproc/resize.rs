use crate::core::Mat;
use crate::error::{Error, Result};

/// Area-averaging resample of a grayscale plane to an arbitrary size.
///
/// Each destination pixel averages the source box it covers, weighting the
/// fractional cells at the box edges by coverage. When the source dimensions
/// already equal the target the data is copied verbatim.
pub fn resample(src: &Mat, dst: &mut Mat, new_w: usize, new_h: usize) -> Result<()> {
    if src.channels() != 1 {
        return Err(Error::InvalidParameter(
            "resample requires a grayscale plane".to_string(),
        ));
    }
    if new_w == 0 || new_h == 0 {
        return Err(Error::InvalidDimensions(
            "target dimensions must be greater than 0".to_string(),
        ));
    }

    if new_w == src.cols() && new_h == src.rows() {
        dst.ensure_shape(new_h, new_w, 1)?;
        return dst.copy_from(src);
    }

    dst.ensure_shape(new_h, new_w, 1)?;

    let sw = src.cols();
    let sh = src.rows();
    #[allow(clippy::cast_precision_loss)]
    let x_ratio = sw as f64 / new_w as f64;
    #[allow(clippy::cast_precision_loss)]
    let y_ratio = sh as f64 / new_h as f64;

    for dy in 0..new_h {
        #[allow(clippy::cast_precision_loss)]
        let sy0 = dy as f64 * y_ratio;
        #[allow(clippy::cast_precision_loss)]
        let sy1 = (dy + 1) as f64 * y_ratio;

        for dx in 0..new_w {
            #[allow(clippy::cast_precision_loss)]
            let sx0 = dx as f64 * x_ratio;
            #[allow(clippy::cast_precision_loss)]
            let sx1 = (dx + 1) as f64 * x_ratio;

            let mut acc = 0.0f64;
            let mut weight = 0.0f64;

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let row_start = sy0.floor() as usize;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let row_end = (sy1.ceil() as usize).min(sh);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let col_start = sx0.floor() as usize;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let col_end = (sx1.ceil() as usize).min(sw);

            for row in row_start..row_end {
                #[allow(clippy::cast_precision_loss)]
                let cov_y = (sy1.min((row + 1) as f64) - sy0.max(row as f64)).max(0.0);
                for col in col_start..col_end {
                    #[allow(clippy::cast_precision_loss)]
                    let cov_x = (sx1.min((col + 1) as f64) - sx0.max(col as f64)).max(0.0);
                    let w = cov_x * cov_y;
                    acc += f64::from(src.pixel(row, col)) * w;
                    weight += w;
                }
            }

            let value = if weight > 0.0 { acc / weight } else { 0.0 };
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            dst.set_pixel(dy, dx, (value + 0.5) as u8);
        }
    }

    Ok(())
}

/// 2x downsample with a 2x2 box average.
pub fn pyr_down(src: &Mat, dst: &mut Mat) -> Result<()> {
    if src.channels() != 1 {
        return Err(Error::InvalidParameter(
            "pyr_down requires a grayscale plane".to_string(),
        ));
    }

    let new_h = src.rows() / 2;
    let new_w = src.cols() / 2;
    if new_h == 0 || new_w == 0 {
        return Err(Error::InvalidDimensions(
            "source too small to downsample".to_string(),
        ));
    }

    dst.ensure_shape(new_h, new_w, 1)?;

    for row in 0..new_h {
        for col in 0..new_w {
            let r2 = row * 2;
            let c2 = col * 2;
            let sum = u16::from(src.pixel(r2, c2))
                + u16::from(src.pixel(r2, c2 + 1))
                + u16::from(src.pixel(r2 + 1, c2))
                + u16::from(src.pixel(r2 + 1, c2 + 1));
            #[allow(clippy::cast_possible_truncation)]
            dst.set_pixel(row, col, ((sum + 2) / 4) as u8);
        }
    }

    Ok(())
}
