use crate::core;
use squaremark_detect::{DetectorParams, FrameDebug, Marker, MarkerDetector};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Detect(#[from] squaremark_detect::DetectError),
}

/// Convert an `image::GrayImage` into the lightweight `squaremark-core` view type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        stride: img.width() as usize,
        data: img.as_raw(),
    }
}

/// Read any image format supported by `image` and convert it to 8-bit grey.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(path)))]
pub fn load_gray_image(path: impl AsRef<Path>) -> Result<::image::GrayImage, ::image::ImageError> {
    Ok(::image::ImageReader::open(path)?.decode()?.to_luma8())
}

/// Run a one-off detector on a single image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_markers(
    img: &::image::GrayImage,
    params: DetectorParams,
) -> Result<Vec<Marker>, DetectError> {
    let mut detector = MarkerDetector::new(params);
    detect_markers_with(&mut detector, img, None)
}

/// Run an existing detector on the next frame.
///
/// The detector keeps its frame size between calls, so every frame of a
/// sequence must have the same dimensions.
pub fn detect_markers_with(
    detector: &mut MarkerDetector,
    img: &::image::GrayImage,
    debug: Option<&mut FrameDebug>,
) -> Result<Vec<Marker>, DetectError> {
    Ok(detector.detect_with_debug(&gray_view(img), debug)?)
}

pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h).filter(|&n| n > 0) else {
        return Err(DetectError::InvalidGrayDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DetectError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidGrayDimensions { width, height })
}

pub fn detect_markers_from_gray_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    params: DetectorParams,
) -> Result<Vec<Marker>, DetectError> {
    let img = gray_image_from_slice(width, height, pixels)?;
    detect_markers(&img, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_length_is_checked() {
        let err = gray_image_from_slice(4, 4, &[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            DetectError::InvalidGrayBuffer {
                expected: 16,
                got: 15
            }
        ));
        assert!(matches!(
            gray_image_from_slice(0, 4, &[]),
            Err(DetectError::InvalidGrayDimensions { .. })
        ));
    }

    #[test]
    fn view_borrows_the_image_buffer() {
        let img = gray_image_from_slice(3, 2, &[1, 2, 3, 4, 5, 6]).expect("image");
        let view = gray_view(&img);
        assert_eq!((view.width, view.height, view.stride), (3, 2, 3));
        assert_eq!(view.row(1), &[4, 5, 6]);
    }

    #[test]
    fn blank_buffer_has_no_markers() {
        let markers =
            detect_markers_from_gray_u8(64, 64, &[255u8; 64 * 64], DetectorParams::default())
                .expect("frame");
        assert!(markers.is_empty());
    }
}
