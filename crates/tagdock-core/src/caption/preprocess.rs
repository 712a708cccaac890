//! Image loading and pixel preparation for the captioner's vision tower.
//!
//! The SigLIP tower behind JoyCaption takes square RGB input scaled to
//! [-1, 1], laid out NCHW.

use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader};
use ndarray::Array4;

use crate::error::{CaptionError, CaptionResult};

const CHANNELS: usize = 3;
const PIXEL_MEAN: f32 = 0.5;
const PIXEL_STD: f32 = 0.5;

/// Decode an image file, sniffing the format when the extension is unknown.
pub fn load_image(path: &Path) -> CaptionResult<DynamicImage> {
    let image_error = |message: String| CaptionError::Image {
        path: path.to_path_buf(),
        message,
    };
    let mut reader = ImageReader::open(path).map_err(|e| image_error(format!("Failed to open: {e}")))?;
    if ImageFormat::from_path(path).is_err() {
        tracing::warn!("Unrecognized image extension for {:?}, guessing from contents", path);
        reader = reader
            .with_guessed_format()
            .map_err(|e| image_error(format!("Failed to read: {e}")))?;
    }
    reader
        .decode()
        .map_err(|e| image_error(format!("Failed to decode: {e}")))
}

/// Resize to `image_size` square and normalize into a `[1, 3, H, W]` tensor.
pub fn pixel_values(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let rgb = image
        .resize_exact(image_size, image_size, image::imageops::FilterType::Triangle)
        .to_rgb8();
    let size = image_size as usize;
    Array4::from_shape_fn((1, CHANNELS, size, size), |(_, c, y, x)| {
        let value = rgb.get_pixel(x as u32, y as u32)[c];
        (f32::from(value) / 255.0 - PIXEL_MEAN) / PIXEL_STD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_pixel_values_shape() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        assert_eq!(pixel_values(&image, 384).shape(), &[1, 3, 384, 384]);
    }

    #[test]
    fn test_pixel_values_channels_are_separate() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 255])));
        let pixels = pixel_values(&image, 4);
        assert!((pixels[[0, 0, 1, 1]] - 1.0).abs() < 1e-3);
        assert!((pixels[[0, 1, 1, 1]] + 1.0).abs() < 1e-3);
        assert!((pixels[[0, 2, 3, 0]] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_load_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbImage::from_pixel(5, 3, Rgb([200, 10, 10])).save(&path).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!((image.width(), image.height()), (5, 3));
    }

    #[test]
    fn test_load_image_missing_file() {
        let err = load_image(Path::new("/nonexistent/cat.png")).unwrap_err();
        assert!(matches!(err, CaptionError::Image { .. }));
        assert!(err.to_string().contains("cat.png"));
    }

    #[test]
    fn test_load_image_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("pic.png");
        RgbImage::new(2, 2).save(&png).unwrap();
        let odd = dir.path().join("pic.data");
        std::fs::rename(&png, &odd).unwrap();

        assert!(load_image(&odd).is_ok());
    }
}
