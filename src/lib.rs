//! # imgadjust
//!
//! Named, parameterised image adjustments that can be chained, serialized
//! to a compact string, and evaluated two ways: as pure dimension math, or
//! against real pixels.
//!
//! # Architecture: Calculate, Then Apply
//!
//! Every adjustment answers the same question twice:
//!
//! ```text
//! calculate   Dimensions + areas  →  Dimensions     (no pixels, no I/O)
//! apply       DecodedImage + areas →  DecodedImage   (resize / crop via a backend)
//! ```
//!
//! `apply` always produces exactly the dimensions `calculate` predicts. That
//! lets callers write `width`/`height` attributes for images that have not
//! been generated yet, and lets the expensive path be cached behind the
//! serialized pipeline string.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | `Dimensions`, `CropBox`, protected `Area`s and their validation |
//! | [`adjustment`] | The five adjustments, dimension math, crop placement search, registry, serialization |
//! | [`imaging`] | Decode/resize/crop/encode backend trait and its `image`-crate implementation |
//! | [`pipeline`] | Ordered adjustment chains and the cached [`Adjuster`] executor |
//! | [`areas`] | Where protected areas come from: memory or `.areas.json` sidecars |
//! | [`cache`] | Result cache keyed by image and pipeline: memory or content-addressed disk store |
//! | [`config`] | `imgadjust.toml` loading, merging and validation |
//! | [`logging`] | `env_logger` setup for the binary |
//!
//! # Design Decisions
//!
//! ## The Serialized Pipeline Is the Cache Key
//!
//! A pipeline such as `fit|25|50||>crop|25|` fully describes its output for
//! a given source. [`cache::CacheKey`] pairs it with the image identifier
//! and hashes both with SHA-256, so identical requests land on the same
//! stored file without any extra bookkeeping.
//!
//! ## Protected Areas Steer Crops
//!
//! Crops that have to throw pixels away pick the offset that cuts least
//! into the image's protected areas, weighted by priority (1 matters most).
//! With no areas the crop is centred. See [`adjustment::placement`].
//!
//! ## Degenerate Input Is Not an Error
//!
//! Targets larger than the source, sizes that round to zero and named crops
//! with no matching area all fall back to something sensible (usually the
//! source dimensions). Errors are reserved for malformed parameters,
//! unknown adjustments and real I/O or codec failures.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` crate behind the
//! [`imaging::ImageBackend`] trait. Tests swap in a recording mock; nothing
//! needs ImageMagick or other system libraries.

pub mod adjustment;
pub mod areas;
pub mod cache;
pub mod config;
pub mod geometry;
pub mod imaging;
pub mod logging;
pub mod pipeline;

pub use adjustment::{Adjustment, AdjustmentError, AdjustmentKind, Registry};
pub use geometry::{Area, CropBox, Dimensions};
pub use pipeline::{Adjusted, Adjuster, AdjustmentInfo, Outcome, Pipeline, PipelineError, Source};
