//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the only place pixels are touched. It
//! defines the five operations the adjustments need: identify, decode,
//! resize, crop and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` in [`tests`].

use crate::geometry::{CropBox, Dimensions};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Failed to encode {format:?}: {message}")]
    Encode { format: ImageFormat, message: String },
}

/// A decoded raster together with the format it was read from.
///
/// The format travels with the pixels so the encoder can pick the output
/// format once every adjustment has run.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub pixels: DynamicImage,
    pub format: ImageFormat,
}

impl DecodedImage {
    pub fn new(pixels: DynamicImage, format: ImageFormat) -> Self {
        Self { pixels, format }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixels.width(), self.pixels.height())
    }

    /// New pixels, same source format.
    pub fn with_pixels(&self, pixels: DynamicImage) -> Self {
        Self {
            pixels,
            format: self.format,
        }
    }
}

/// Trait for image backends.
///
/// Every operation returns a fresh image; inputs are never modified.
pub trait ImageBackend: Sync {
    /// Read the dimensions from the header without decoding pixels.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode a complete image.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Resample to exactly `size`.
    fn resize(
        &self,
        image: &DecodedImage,
        size: Dimensions,
        filter: FilterType,
    ) -> Result<DecodedImage, BackendError>;

    /// Cut out `bounds`, which must lie inside the image.
    fn crop(&self, image: &DecodedImage, bounds: CropBox) -> Result<DecodedImage, BackendError>;

    /// Encode for storage.
    fn encode(&self, image: &DecodedImage) -> Result<Vec<u8>, BackendError>;
}
