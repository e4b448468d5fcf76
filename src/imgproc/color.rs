use crate::core::Mat;
use crate::error::{Error, Result};

/// Convert a raw RGBA buffer to an 8-bit grayscale plane using the standard
/// luma weights. The destination is reshaped lazily.
pub fn rgba_buffer_to_gray(rgba: &[u8], width: usize, height: usize, dst: &mut Mat) -> Result<()> {
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

    dst.ensure_shape(height, width, 1)?;

    let out = dst.data_mut();
    for (gray, px) in out.iter_mut().zip(rgba.chunks_exact(4)) {
        let luma = 0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2]);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            *gray = (luma + 0.5).min(255.0) as u8;
        }
    }

    Ok(())
}

/// Convert a 4-channel RGBA plane to grayscale.
pub fn rgba_to_gray(src: &Mat, dst: &mut Mat) -> Result<()> {
    if src.channels() != 4 {
        return Err(Error::InvalidParameter(
            "source must have 4 channels".to_string(),
        ));
    }

    rgba_buffer_to_gray(src.data(), src.cols(), src.rows(), dst)
}
