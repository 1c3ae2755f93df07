//! Adjustments: the five geometric transforms.
//!
//! | Slug | Variant | Result |
//! |---|---|---|
//! | `fit` | [`Adjustment::Fit`] | scaled to fit inside the bounds, ratio kept |
//! | `crop` | [`Adjustment::Crop`] | cut to the size, areas protected |
//! | `ratiocrop` | [`Adjustment::RatioCrop`] | cut to the aspect ratio, areas protected |
//! | `namedcrop` | [`Adjustment::NamedCrop`] | cut to one named area |
//! | `fill` | [`Adjustment::Fill`] | ratio crop then resize to the exact size |
//!
//! Every adjustment has two faces:
//!
//! - [`Adjustment::calculate`] is pure dimension math, cheap enough to run
//!   for every page render.
//! - [`Adjustment::apply`] does the pixel work through an
//!   [`ImageBackend`]. Its output always has the dimensions `calculate`
//!   predicted.
//!
//! The module is split into:
//! - **Parameters**: [`FitParams`] and friends, plus loose `name → value` parsing
//! - **Calculations**: [`calculations`], pure functions per variant
//! - **Placement**: [`placement`], the area-aware crop offset search
//! - **Registry**: [`registry`], slug lookup with a configured default
//! - **Serialization**: [`serialize`], the compact `fit|25|50>crop|25|` form

pub mod calculations;
mod params;
pub mod placement;
pub mod registry;
pub mod serialize;

pub use params::{CropParams, FillParams, FitParams, NamedCropParams, Ratio, RatioCropParams};
pub use placement::{Placement, PlacementStrategy, SearchOptions};
pub use registry::Registry;

use crate::geometry::{Area, Dimensions};
use crate::imaging::{BackendError, DecodedImage, ImageBackend};
use calculations::{
    crop_dimensions, fill_dimensions, fit_dimensions, named_crop_dimensions,
    ratio_crop_dimensions, resize_filter,
};
use log::debug;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdjustmentError {
    #[error("Parameter \"{parameter}\" not accepted by {kind}")]
    UnknownParameter {
        kind: AdjustmentKind,
        parameter: String,
    },
    #[error("Invalid value {value:?} for \"{parameter}\": {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("{kind} requires \"{parameter}\"")]
    MissingParameter {
        kind: AdjustmentKind,
        parameter: &'static str,
    },
    #[error("{kind} accepts at most {expected} parameters, got {got}")]
    TooManyValues {
        kind: AdjustmentKind,
        expected: usize,
        got: usize,
    },
    #[error("Unknown adjustment {0:?}")]
    UnknownAdjustment(String),
}

/// Fieldless tag of an [`Adjustment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdjustmentKind {
    Fit,
    Crop,
    RatioCrop,
    NamedCrop,
    Fill,
}

impl AdjustmentKind {
    pub const ALL: [AdjustmentKind; 5] = [
        AdjustmentKind::Fit,
        AdjustmentKind::Crop,
        AdjustmentKind::RatioCrop,
        AdjustmentKind::NamedCrop,
        AdjustmentKind::Fill,
    ];

    /// Registry key and serialized prefix.
    pub fn slug(self) -> &'static str {
        match self {
            AdjustmentKind::Fit => "fit",
            AdjustmentKind::Crop => "crop",
            AdjustmentKind::RatioCrop => "ratiocrop",
            AdjustmentKind::NamedCrop => "namedcrop",
            AdjustmentKind::Fill => "fill",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Accepted parameter names, in serialization order.
    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            AdjustmentKind::Fit | AdjustmentKind::Fill => {
                &["width", "height", "max_width", "max_height"]
            }
            AdjustmentKind::Crop => &["width", "height"],
            AdjustmentKind::RatioCrop => &["ratio"],
            AdjustmentKind::NamedCrop => &["name"],
        }
    }

    /// Whether `calculate` reads the areas. Only an optimisation hint.
    pub fn calculate_uses_areas(self) -> bool {
        matches!(self, AdjustmentKind::NamedCrop)
    }

    /// Whether `apply` reads the areas. Only an optimisation hint.
    pub fn apply_uses_areas(self) -> bool {
        !matches!(self, AdjustmentKind::Fit)
    }
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdjustmentKind::Fit => "Fit",
            AdjustmentKind::Crop => "Crop",
            AdjustmentKind::RatioCrop => "RatioCrop",
            AdjustmentKind::NamedCrop => "NamedCrop",
            AdjustmentKind::Fill => "Fill",
        })
    }
}

impl FromStr for AdjustmentKind {
    type Err = AdjustmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slug(s).ok_or_else(|| AdjustmentError::UnknownAdjustment(s.to_string()))
    }
}

/// One geometric transform with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    Fit(FitParams),
    Crop(CropParams),
    RatioCrop(RatioCropParams),
    NamedCrop(NamedCropParams),
    Fill(FillParams),
}

impl Adjustment {
    pub fn fit(width: Option<u32>, height: Option<u32>) -> Result<Self, AdjustmentError> {
        Adjustment::Fit(FitParams {
            width,
            height,
            ..Default::default()
        })
        .validated()
    }

    pub fn crop(width: Option<u32>, height: Option<u32>) -> Result<Self, AdjustmentError> {
        Adjustment::Crop(CropParams { width, height }).validated()
    }

    pub fn ratio_crop(ratio: &str) -> Result<Self, AdjustmentError> {
        Ok(Adjustment::RatioCrop(RatioCropParams {
            ratio: Some(Ratio::parse(ratio)?),
        }))
    }

    pub fn named_crop(name: &str) -> Result<Self, AdjustmentError> {
        Adjustment::NamedCrop(NamedCropParams {
            name: name.to_string(),
        })
        .validated()
    }

    pub fn fill(width: Option<u32>, height: Option<u32>) -> Result<Self, AdjustmentError> {
        Adjustment::Fill(FillParams {
            width,
            height,
            ..Default::default()
        })
        .validated()
    }

    /// Check the parameters are ones parsing would accept: set dimensions
    /// are at least 1 and names survive serialization unchanged. Struct
    /// literals skip the typed constructors, so [`Pipeline::new`] calls this
    /// on every stage.
    ///
    /// [`Pipeline::new`]: crate::pipeline::Pipeline::new
    pub fn validate(&self) -> Result<(), AdjustmentError> {
        match self {
            Adjustment::Fit(params) => params.validate(),
            Adjustment::Crop(params) => params.validate(),
            // Ratio is only built through its checked constructors.
            Adjustment::RatioCrop(_) => Ok(()),
            Adjustment::NamedCrop(named) => params::validate_name(&named.name),
            Adjustment::Fill(params) => params.validate(),
        }
    }

    fn validated(self) -> Result<Self, AdjustmentError> {
        self.validate()?;
        Ok(self)
    }

    /// Build from loose `name → value` pairs, as they arrive from a
    /// serialized pipeline or the command line. Blank values count as absent.
    pub fn from_params(
        kind: AdjustmentKind,
        pairs: &[(&str, Option<&str>)],
    ) -> Result<Self, AdjustmentError> {
        params::reject_unknown(kind, pairs)?;
        Ok(match kind {
            AdjustmentKind::Fit => Adjustment::Fit(params::fit_params(pairs)?),
            AdjustmentKind::Crop => Adjustment::Crop(params::crop_params(pairs)?),
            AdjustmentKind::RatioCrop => Adjustment::RatioCrop(params::ratio_crop_params(pairs)?),
            AdjustmentKind::NamedCrop => Adjustment::NamedCrop(params::named_crop_params(pairs)?),
            AdjustmentKind::Fill => Adjustment::Fill(params::fill_params(pairs)?),
        })
    }

    pub fn kind(&self) -> AdjustmentKind {
        match self {
            Adjustment::Fit(_) => AdjustmentKind::Fit,
            Adjustment::Crop(_) => AdjustmentKind::Crop,
            Adjustment::RatioCrop(_) => AdjustmentKind::RatioCrop,
            Adjustment::NamedCrop(_) => AdjustmentKind::NamedCrop,
            Adjustment::Fill(_) => AdjustmentKind::Fill,
        }
    }

    /// Declared parameters with their current values, in serialization order.
    pub fn param_values(&self) -> Vec<(&'static str, Option<String>)> {
        let text = |value: Option<u32>| value.map(|v| v.to_string());
        match self {
            Adjustment::Fit(FitParams {
                width,
                height,
                max_width,
                max_height,
            })
            | Adjustment::Fill(FillParams {
                width,
                height,
                max_width,
                max_height,
            }) => vec![
                ("width", text(*width)),
                ("height", text(*height)),
                ("max_width", text(*max_width)),
                ("max_height", text(*max_height)),
            ],
            Adjustment::Crop(CropParams { width, height }) => {
                vec![("width", text(*width)), ("height", text(*height))]
            }
            Adjustment::RatioCrop(RatioCropParams { ratio }) => {
                vec![("ratio", ratio.as_ref().map(|r| r.as_str().to_string()))]
            }
            Adjustment::NamedCrop(NamedCropParams { name }) => {
                vec![("name", Some(name.clone()))]
            }
        }
    }

    /// Dimensions `apply` would produce for an image of `dims`.
    pub fn calculate(&self, dims: Dimensions, areas: &[Area]) -> Dimensions {
        match self {
            Adjustment::Fit(params) => fit_dimensions(dims, params),
            Adjustment::Crop(params) => crop_dimensions(dims, params.width, params.height),
            Adjustment::RatioCrop(params) => match &params.ratio {
                Some(ratio) => ratio_crop_dimensions(dims, ratio.value()),
                None => dims,
            },
            Adjustment::NamedCrop(params) => {
                named_crop_dimensions(dims, find_named(areas, &params.name))
            }
            Adjustment::Fill(params) => fill_dimensions(dims, params),
        }
    }

    /// Run the transform on `image`. When nothing would change the result
    /// is an unmodified copy.
    pub fn apply(
        &self,
        backend: &impl ImageBackend,
        image: &DecodedImage,
        areas: &[Area],
        search: SearchOptions,
    ) -> Result<DecodedImage, BackendError> {
        let source = image.dimensions();
        let target = self.calculate(source, areas);
        if target == source {
            return Ok(image.clone());
        }

        match self {
            Adjustment::Fit(_) => backend.resize(image, target, resize_filter(source, target)),
            Adjustment::Crop(_) | Adjustment::RatioCrop(_) => {
                protected_crop(backend, image, target, areas, search)
            }
            Adjustment::NamedCrop(params) => {
                match find_named(areas, &params.name).and_then(|a| a.crop_box().clamp_to(source)) {
                    Some(bounds) => backend.crop(image, bounds),
                    None => Ok(image.clone()),
                }
            }
            Adjustment::Fill(_) => {
                let crop_size = ratio_crop_dimensions(source, target.ratio());
                let cropped = if crop_size == source {
                    image.clone()
                } else {
                    protected_crop(backend, image, crop_size, areas, search)?
                };
                let cropped_size = cropped.dimensions();
                if cropped_size == target {
                    return Ok(cropped);
                }
                backend.resize(&cropped, target, resize_filter(cropped_size, target))
            }
        }
    }
}

fn find_named<'a>(areas: &'a [Area], name: &str) -> Option<&'a Area> {
    areas.iter().find(|area| area.name == name)
}

fn protected_crop(
    backend: &impl ImageBackend,
    image: &DecodedImage,
    size: Dimensions,
    areas: &[Area],
    search: SearchOptions,
) -> Result<DecodedImage, BackendError> {
    let placement = placement::find_crop_offset(image.dimensions(), size, areas, search);
    let bounds = placement.crop_box(size);
    debug!("Cropping {} to {bounds} ({:?})", image.dimensions(), placement.strategy);
    backend.crop(image, bounds)
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize::serialize_adjustment(self))
    }
}
