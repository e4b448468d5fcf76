use crate::core::Mat;
use crate::error::{Error, Result};
use image::{GrayImage, ImageBuffer, Luma};
use std::path::Path;

/// Read a reference image from file as a 4-channel RGBA plane.
///
/// Convenience for file-based embedders; the pipeline itself only consumes
/// decoded buffers.
pub fn imread_rgba<P: AsRef<Path>>(path: P) -> Result<Mat> {
    let img = image::open(path)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Mat::from_raw(rgba.into_raw(), height as usize, width as usize, 4)
}

/// Write a grayscale plane to file. Useful for dumping pipeline
/// intermediates while debugging.
pub fn imwrite_gray<P: AsRef<Path>>(path: P, mat: &Mat) -> Result<()> {
    if mat.channels() != 1 {
        return Err(Error::InvalidParameter(
            "imwrite_gray requires a grayscale plane".to_string(),
        ));
    }

    #[allow(clippy::cast_possible_truncation)]
    let buffer: GrayImage = ImageBuffer::<Luma<u8>, _>::from_raw(
        mat.cols() as u32,
        mat.rows() as u32,
        mat.data().to_vec(),
    )
    .ok_or_else(|| Error::InvalidDimensions("plane does not match its dimensions".to_string()))?;

    buffer.save(path)?;
    Ok(())
}
