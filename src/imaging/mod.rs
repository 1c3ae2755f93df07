//! Image backend: the only code that touches pixels.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image::ImageReader::decode` |
//! | **Resize** | `resize_exact` (Lanczos3 down, CatmullRom up) |
//! | **Crop** | `crop_imm` |
//! | **Encode** | `write_to`, PNG/JPEG/GIF kept, others as PNG |
//!
//! The module is split into:
//! - **Backend**: [`ImageBackend`] trait + [`DecodedImage`]
//! - **Rust backend**: [`RustBackend`], the `image`-crate implementation

pub mod backend;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, ImageBackend};
pub use rust_backend::{RustBackend, output_format};
