//! Parameter types for adjustments.
//!
//! These structs describe *what* an adjustment was asked to do. They are
//! built either directly (struct literals, `Default` for the optional
//! bounds) or from loosely-typed `name → value` pairs with
//! [`Adjustment::from_params`](super::Adjustment::from_params), which is how
//! serialized pipelines and CLI flags come in.
//!
//! ## Types
//!
//! - [`FitParams`]: target `width`/`height` plus optional `max_width`/`max_height`.
//! - [`CropParams`]: target `width`/`height`; absent means "keep the source extent".
//! - [`RatioCropParams`]: a [`Ratio`] (`"W:H"` or a pre-divided float).
//! - [`NamedCropParams`]: the name of the [`Area`](crate::geometry::Area) to crop to.
//! - [`FillParams`]: same shape as [`FitParams`], exact output size.

use super::{AdjustmentError, AdjustmentKind};
use std::fmt;

/// Characters reserved by the serialized pipeline format.
const RESERVED: &[char] = &['|', '>'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CropParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioCropParams {
    pub ratio: Option<Ratio>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCropParams {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

/// A target aspect ratio (width / height).
///
/// Keeps the text it was parsed from so that serializing a pipeline gives
/// back exactly what was requested (`"16:9"` stays `"16:9"`, not `1.777…`).
#[derive(Debug, Clone, PartialEq)]
pub struct Ratio {
    text: String,
    value: f64,
}

impl Ratio {
    /// Parse `"W:H"` or a plain float such as `"1.5"`.
    pub fn parse(text: &str) -> Result<Self, AdjustmentError> {
        let text = text.trim();
        let value = match text.split_once(':') {
            Some((width, height)) => {
                parse_positive_float("ratio", text, width)?
                    / parse_positive_float("ratio", text, height)?
            }
            None => parse_positive_float("ratio", text, text)?,
        };
        Ok(Self {
            text: text.to_string(),
            value,
        })
    }

    /// The ratio of a pair of dimensions, written as `"W:H"`.
    pub fn from_dimensions(width: u32, height: u32) -> Result<Self, AdjustmentError> {
        let text = format!("{width}:{height}");
        if width == 0 || height == 0 {
            return Err(AdjustmentError::InvalidValue {
                parameter: "ratio".to_string(),
                value: text,
                reason: "must be a positive number".to_string(),
            });
        }
        Ok(Self {
            text,
            value: width as f64 / height as f64,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn parse_positive_float(parameter: &str, full: &str, part: &str) -> Result<f64, AdjustmentError> {
    let invalid = |reason: &str| AdjustmentError::InvalidValue {
        parameter: parameter.to_string(),
        value: full.to_string(),
        reason: reason.to_string(),
    };
    let value: f64 = part
        .trim()
        .parse()
        .map_err(|_| invalid("expected \"W:H\" or a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid("must be a positive number"));
    }
    Ok(value)
}

/// Parse a pixel dimension: a positive decimal integer.
pub(crate) fn parse_dimension(parameter: &str, value: &str) -> Result<u32, AdjustmentError> {
    let parsed: u32 = value
        .trim()
        .parse()
        .map_err(|_| AdjustmentError::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: "expected a whole number of pixels".to_string(),
        })?;
    check_dimension(parameter, Some(parsed))?;
    Ok(parsed)
}

/// A set pixel dimension must be at least 1.
pub(super) fn check_dimension(parameter: &str, value: Option<u32>) -> Result<(), AdjustmentError> {
    if value == Some(0) {
        return Err(AdjustmentError::InvalidValue {
            parameter: parameter.to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

impl FitParams {
    pub(super) fn validate(&self) -> Result<(), AdjustmentError> {
        check_dimension("width", self.width)?;
        check_dimension("height", self.height)?;
        check_dimension("max_width", self.max_width)?;
        check_dimension("max_height", self.max_height)
    }
}

impl CropParams {
    pub(super) fn validate(&self) -> Result<(), AdjustmentError> {
        check_dimension("width", self.width)?;
        check_dimension("height", self.height)
    }
}

impl FillParams {
    pub(super) fn validate(&self) -> Result<(), AdjustmentError> {
        check_dimension("width", self.width)?;
        check_dimension("height", self.height)?;
        check_dimension("max_width", self.max_width)?;
        check_dimension("max_height", self.max_height)
    }
}

/// Last value supplied for `name`, with blank values treated as absent.
fn lookup<'a>(params: &[(&str, Option<&'a str>)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| *value)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn dimension(params: &[(&str, Option<&str>)], name: &str) -> Result<Option<u32>, AdjustmentError> {
    lookup(params, name)
        .map(|value| parse_dimension(name, value))
        .transpose()
}

pub(super) fn reject_unknown(
    kind: AdjustmentKind,
    params: &[(&str, Option<&str>)],
) -> Result<(), AdjustmentError> {
    let accepted = kind.parameters();
    match params.iter().find(|(key, _)| !accepted.contains(key)) {
        Some((key, _)) => Err(AdjustmentError::UnknownParameter {
            kind,
            parameter: key.to_string(),
        }),
        None => Ok(()),
    }
}

pub(super) fn fit_params(params: &[(&str, Option<&str>)]) -> Result<FitParams, AdjustmentError> {
    Ok(FitParams {
        width: dimension(params, "width")?,
        height: dimension(params, "height")?,
        max_width: dimension(params, "max_width")?,
        max_height: dimension(params, "max_height")?,
    })
}

pub(super) fn crop_params(params: &[(&str, Option<&str>)]) -> Result<CropParams, AdjustmentError> {
    Ok(CropParams {
        width: dimension(params, "width")?,
        height: dimension(params, "height")?,
    })
}

pub(super) fn ratio_crop_params(
    params: &[(&str, Option<&str>)],
) -> Result<RatioCropParams, AdjustmentError> {
    Ok(RatioCropParams {
        ratio: lookup(params, "ratio").map(Ratio::parse).transpose()?,
    })
}

pub(super) fn named_crop_params(
    params: &[(&str, Option<&str>)],
) -> Result<NamedCropParams, AdjustmentError> {
    let name = lookup(params, "name").ok_or(AdjustmentError::MissingParameter {
        kind: AdjustmentKind::NamedCrop,
        parameter: "name",
    })?;
    validate_name(name)?;
    Ok(NamedCropParams {
        name: name.to_string(),
    })
}

pub(super) fn fill_params(params: &[(&str, Option<&str>)]) -> Result<FillParams, AdjustmentError> {
    Ok(FillParams {
        width: dimension(params, "width")?,
        height: dimension(params, "height")?,
        max_width: dimension(params, "max_width")?,
        max_height: dimension(params, "max_height")?,
    })
}

/// Area names end up inside serialized pipelines, so the separators are off
/// limits. Parsing trims values, so a name must already be trimmed.
pub(super) fn validate_name(name: &str) -> Result<(), AdjustmentError> {
    if name.is_empty() {
        return Err(AdjustmentError::MissingParameter {
            kind: AdjustmentKind::NamedCrop,
            parameter: "name",
        });
    }
    if name.trim() != name {
        return Err(AdjustmentError::InvalidValue {
            parameter: "name".to_string(),
            value: name.to_string(),
            reason: "must not start or end with whitespace".to_string(),
        });
    }
    if name.contains(RESERVED) {
        return Err(AdjustmentError::InvalidValue {
            parameter: "name".to_string(),
            value: name.to_string(),
            reason: "must not contain '|' or '>'".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_parses_colon_form() {
        let ratio = Ratio::parse("16:9").unwrap();
        assert!((ratio.value() - 16.0 / 9.0).abs() < 1e-12);
        assert_eq!(ratio.as_str(), "16:9");
    }

    #[test]
    fn ratio_parses_plain_float() {
        assert_eq!(Ratio::parse("0.5").unwrap().value(), 0.5);
        assert_eq!(Ratio::parse(" 2 ").unwrap().as_str(), "2");
    }

    #[test]
    fn ratio_rejects_zero_and_garbage() {
        assert!(Ratio::parse("0:3").is_err());
        assert!(Ratio::parse("3:0").is_err());
        assert!(Ratio::parse("-1").is_err());
        assert!(Ratio::parse("wide").is_err());
        assert!(Ratio::parse("1:2:3").is_err());
        assert!(Ratio::parse("inf").is_err());
    }

    #[test]
    fn ratio_from_dimensions() {
        let ratio = Ratio::from_dimensions(50, 40).unwrap();
        assert_eq!(ratio.as_str(), "50:40");
        assert_eq!(ratio.value(), 1.25);
        assert_eq!(Ratio::parse("50:40").unwrap(), ratio);
    }

    #[test]
    fn ratio_from_zero_dimension_rejected() {
        assert!(matches!(
            Ratio::from_dimensions(0, 5),
            Err(AdjustmentError::InvalidValue { .. })
        ));
        assert!(Ratio::from_dimensions(5, 0).is_err());
    }

    #[test]
    fn zero_dimension_in_params_rejected() {
        let params = FitParams {
            max_height: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(AdjustmentError::InvalidValue { parameter, .. }) if parameter == "max_height"
        ));
        assert!(CropParams { width: Some(0), height: None }.validate().is_err());
        assert!(FillParams::default().validate().is_ok());
    }

    #[test]
    fn dimension_accepts_padded_integers() {
        assert_eq!(parse_dimension("width", " 100 ").unwrap(), 100);
    }

    #[test]
    fn dimension_rejects_zero_negative_and_fractions() {
        for bad in ["0", "-5", "2.5", "wide", ""] {
            assert!(
                matches!(
                    parse_dimension("width", bad),
                    Err(AdjustmentError::InvalidValue { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn lookup_treats_blank_as_absent() {
        let params = [("width", Some("  ")), ("height", None)];
        assert_eq!(lookup(&params, "width"), None);
        assert_eq!(lookup(&params, "height"), None);
    }

    #[test]
    fn lookup_last_value_wins() {
        let params = [("width", Some("10")), ("width", Some("20"))];
        assert_eq!(lookup(&params, "width"), Some("20"));
    }

    #[test]
    fn names_with_separators_rejected() {
        assert!(validate_name("face").is_ok());
        assert!(validate_name("a|b").is_err());
        assert!(validate_name("a>b").is_err());
    }

    #[test]
    fn blank_and_padded_names_rejected() {
        assert!(matches!(
            validate_name(""),
            Err(AdjustmentError::MissingParameter { parameter: "name", .. })
        ));
        assert!(matches!(
            validate_name(" face "),
            Err(AdjustmentError::InvalidValue { .. })
        ));
        assert!(validate_name("left eye").is_ok());
    }
}
