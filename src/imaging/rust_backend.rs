//! Pure Rust image backend on top of the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `ImageReader::decode` with format sniffing |
//! | Resize | `DynamicImage::resize_exact` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode | `DynamicImage::write_to` in the [output format](output_format) |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use crate::geometry::{CropBox, Dimensions};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Formats written back unchanged. Anything else is stored as PNG.
const KEEP_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Gif];

/// Format an adjusted image is encoded in, given the format it was read from.
pub fn output_format(source: ImageFormat) -> ImageFormat {
    if KEEP_FORMATS.contains(&source) {
        source
    } else {
        ImageFormat::Png
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Dimensions::new(width, height))
    }

    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let reader = reader(bytes)?;
        let format = reader
            .format()
            .ok_or_else(|| BackendError::Decode("Unrecognised image format".to_string()))?;
        let pixels = reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(DecodedImage::new(pixels, format))
    }

    fn resize(
        &self,
        image: &DecodedImage,
        size: Dimensions,
        filter: FilterType,
    ) -> Result<DecodedImage, BackendError> {
        if size.width == 0 || size.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Cannot resize to {size}"
            )));
        }
        Ok(image.with_pixels(image.pixels.resize_exact(size.width, size.height, filter)))
    }

    fn crop(&self, image: &DecodedImage, bounds: CropBox) -> Result<DecodedImage, BackendError> {
        let dims = image.dimensions();
        if bounds.x2 > dims.width || bounds.y2 > dims.height || bounds.width() == 0 || bounds.height() == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop {bounds} outside of {dims} image"
            )));
        }
        Ok(image.with_pixels(image.pixels.crop_imm(
            bounds.x1,
            bounds.y1,
            bounds.width(),
            bounds.height(),
        )))
    }

    fn encode(&self, image: &DecodedImage) -> Result<Vec<u8>, BackendError> {
        let format = output_format(image.format);
        // The JPEG encoder has no alpha channel.
        let flattened;
        let pixels = if format == ImageFormat::Jpeg && image.pixels.color().has_alpha() {
            flattened = DynamicImage::ImageRgb8(image.pixels.to_rgb8());
            &flattened
        } else {
            &image.pixels
        };

        let mut bytes = Vec::new();
        pixels
            .write_to(&mut Cursor::new(&mut bytes), format)
            .map_err(|e| BackendError::Encode {
                format,
                message: e.to_string(),
            })?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
        }))
    }

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        gradient(width, height)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    // =========================================================================
    // Output format policy
    // =========================================================================

    #[test]
    fn web_formats_are_kept() {
        assert_eq!(output_format(ImageFormat::Png), ImageFormat::Png);
        assert_eq!(output_format(ImageFormat::Jpeg), ImageFormat::Jpeg);
        assert_eq!(output_format(ImageFormat::Gif), ImageFormat::Gif);
    }

    #[test]
    fn other_formats_become_png() {
        assert_eq!(output_format(ImageFormat::Tiff), ImageFormat::Png);
        assert_eq!(output_format(ImageFormat::WebP), ImageFormat::Png);
    }

    // =========================================================================
    // Decode / identify
    // =========================================================================

    #[test]
    fn identify_reads_header() {
        let backend = RustBackend::new();
        let dims = backend.identify(&encoded(64, 32, ImageFormat::Png)).unwrap();
        assert_eq!(dims, Dimensions::new(64, 32));
    }

    #[test]
    fn decode_detects_format() {
        let backend = RustBackend::new();
        let image = backend.decode(&encoded(20, 10, ImageFormat::Jpeg)).unwrap();
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!(image.dimensions(), Dimensions::new(20, 10));
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        assert!(matches!(
            backend.decode(b"definitely not an image"),
            Err(BackendError::Decode(_))
        ));
    }

    // =========================================================================
    // Pixel operations
    // =========================================================================

    #[test]
    fn crop_copies_the_region() {
        let backend = RustBackend::new();
        let source = DecodedImage::new(gradient(100, 100), ImageFormat::Png);
        let cropped = backend.crop(&source, CropBox::new(20, 45, 70, 95)).unwrap();
        assert_eq!(cropped.dimensions(), Dimensions::new(50, 50));
        assert_eq!(
            cropped.pixels.to_rgb8().get_pixel(0, 0),
            source.pixels.to_rgb8().get_pixel(20, 45)
        );
    }

    #[test]
    fn crop_outside_image_errors() {
        let backend = RustBackend::new();
        let source = DecodedImage::new(gradient(10, 10), ImageFormat::Png);
        assert!(backend.crop(&source, CropBox::new(5, 5, 11, 10)).is_err());
    }

    #[test]
    fn resize_is_exact() {
        let backend = RustBackend::new();
        let source = DecodedImage::new(gradient(100, 100), ImageFormat::Png);
        let resized = backend
            .resize(&source, Dimensions::new(50, 40), FilterType::Lanczos3)
            .unwrap();
        assert_eq!(resized.dimensions(), Dimensions::new(50, 40));
    }

    // =========================================================================
    // Encode
    // =========================================================================

    #[test]
    fn encode_tiff_source_as_png() {
        let backend = RustBackend::new();
        let image = backend.decode(&encoded(8, 8, ImageFormat::Tiff)).unwrap();
        let bytes = backend.encode(&image).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn encode_rgba_jpeg_flattens_alpha() {
        let backend = RustBackend::new();
        let image = DecodedImage::new(DynamicImage::new_rgba8(8, 8), ImageFormat::Jpeg);
        let bytes = backend.encode(&image).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }
}
