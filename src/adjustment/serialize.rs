//! Compact string form of a pipeline.
//!
//! One stage is `slug|v1|v2|…` with values in the kind's declared parameter
//! order and an empty position for an absent value. Stages are joined with
//! `>`:
//!
//! ```text
//! fit|25|50||>crop|25|
//! ```
//!
//! Parsing accepts fewer positions than declared (the rest are absent) and
//! rejects more. An unknown slug is a lookup failure,
//! [`AdjustmentError::UnknownAdjustment`].

use super::{Adjustment, AdjustmentError, AdjustmentKind};

pub const STAGE_SEPARATOR: char = '>';
pub const PARAM_SEPARATOR: char = '|';

pub fn serialize_adjustment(adjustment: &Adjustment) -> String {
    let mut out = adjustment.kind().slug().to_string();
    for (_, value) in adjustment.param_values() {
        out.push(PARAM_SEPARATOR);
        if let Some(value) = value {
            out.push_str(&value);
        }
    }
    out
}

pub fn serialize(adjustments: &[Adjustment]) -> String {
    adjustments
        .iter()
        .map(serialize_adjustment)
        .collect::<Vec<_>>()
        .join(&STAGE_SEPARATOR.to_string())
}

pub fn deserialize_adjustment(stage: &str) -> Result<Adjustment, AdjustmentError> {
    let mut parts = stage.split(PARAM_SEPARATOR);
    let slug = parts.next().unwrap_or_default();
    let kind: AdjustmentKind = slug.parse()?;
    let values: Vec<&str> = parts.collect();
    let names = kind.parameters();
    if values.len() > names.len() {
        return Err(AdjustmentError::TooManyValues {
            kind,
            expected: names.len(),
            got: values.len(),
        });
    }
    let params: Vec<(&str, Option<&str>)> = names
        .iter()
        .zip(values)
        .map(|(name, value)| (*name, Some(value)))
        .collect();
    Adjustment::from_params(kind, &params)
}

pub fn deserialize(requested: &str) -> Result<Vec<Adjustment>, AdjustmentError> {
    requested
        .split(STAGE_SEPARATOR)
        .map(deserialize_adjustment)
        .collect()
}

/// Kinds named by each stage of `requested`, without parsing parameters.
/// `None` for a stage whose slug is unknown.
pub fn stage_kinds(requested: &str) -> impl Iterator<Item = Option<AdjustmentKind>> + '_ {
    requested.split(STAGE_SEPARATOR).map(|stage| {
        let slug = stage.split(PARAM_SEPARATOR).next().unwrap_or_default();
        AdjustmentKind::from_slug(slug)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::{FillParams, FitParams, Ratio, RatioCropParams};
    use proptest::prelude::*;

    // =========================================================================
    // serialize
    // =========================================================================

    #[test]
    fn serializes_every_declared_position() {
        let pipeline = [Adjustment::fit(Some(25), Some(50)).unwrap(), Adjustment::crop(Some(25), None).unwrap()];
        assert_eq!(serialize(&pipeline), "fit|25|50||>crop|25|");
    }

    #[test]
    fn serializes_ratio_text_verbatim() {
        let adj = Adjustment::ratio_crop("16:9").unwrap();
        assert_eq!(serialize_adjustment(&adj), "ratiocrop|16:9");
        assert_eq!(
            serialize_adjustment(&Adjustment::RatioCrop(RatioCropParams::default())),
            "ratiocrop|"
        );
    }

    #[test]
    fn serializes_fill_bounds() {
        let adj = Adjustment::Fill(FillParams {
            width: Some(50),
            max_height: Some(200),
            ..Default::default()
        });
        assert_eq!(serialize_adjustment(&adj), "fill|50|||200");
    }

    #[test]
    fn display_is_serialized_form() {
        assert_eq!(Adjustment::named_crop("face").unwrap().to_string(), "namedcrop|face");
    }

    // =========================================================================
    // deserialize
    // =========================================================================

    #[test]
    fn accepts_short_form() {
        let stages = deserialize("fit|25|50>crop|25|").unwrap();
        assert_eq!(
            stages,
            vec![Adjustment::fit(Some(25), Some(50)).unwrap(), Adjustment::crop(Some(25), None).unwrap()]
        );
    }

    #[test]
    fn bare_slug_has_no_parameters() {
        assert_eq!(deserialize_adjustment("fit").unwrap(), Adjustment::fit(None, None).unwrap());
    }

    #[test]
    fn unknown_slug_is_lookup_failure() {
        assert_eq!(
            deserialize("fit|25|>resize|10"),
            Err(AdjustmentError::UnknownAdjustment("resize".to_string()))
        );
        assert_eq!(
            deserialize(""),
            Err(AdjustmentError::UnknownAdjustment(String::new()))
        );
    }

    #[test]
    fn too_many_positions_rejected() {
        assert_eq!(
            deserialize_adjustment("crop|1|2|3"),
            Err(AdjustmentError::TooManyValues {
                kind: AdjustmentKind::Crop,
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn invalid_value_reported() {
        assert!(matches!(
            deserialize_adjustment("fill|0|"),
            Err(AdjustmentError::InvalidValue { .. })
        ));
    }

    #[test]
    fn stage_kinds_reads_slugs_only() {
        let kinds: Vec<_> = stage_kinds("fit|10|>namedcrop|face>bogus").collect();
        assert_eq!(
            kinds,
            vec![Some(AdjustmentKind::Fit), Some(AdjustmentKind::NamedCrop), None]
        );
    }

    // =========================================================================
    // Round trip
    // =========================================================================

    fn stage_strategy() -> impl Strategy<Value = Adjustment> {
        let side = proptest::option::of(1u32..10_000);
        prop_oneof![
            (side.clone(), side.clone(), side.clone(), side.clone()).prop_map(|(w, h, mw, mh)| {
                Adjustment::Fit(FitParams { width: w, height: h, max_width: mw, max_height: mh })
            }),
            (side.clone(), side.clone()).prop_map(|(w, h)| Adjustment::crop(w, h).unwrap()),
            proptest::option::of((1u32..100, 1u32..100)).prop_map(|ratio| {
                Adjustment::RatioCrop(RatioCropParams {
                    ratio: ratio.map(|(w, h)| Ratio::from_dimensions(w, h).unwrap()),
                })
            }),
            "[a-z][a-z0-9 _-]{0,19}"
                .prop_filter_map("padded name", |name| Adjustment::named_crop(&name).ok()),
            (side.clone(), side.clone(), side.clone(), side).prop_map(|(w, h, mw, mh)| {
                Adjustment::Fill(FillParams { width: w, height: h, max_width: mw, max_height: mh })
            }),
        ]
    }

    proptest! {
        #[test]
        fn round_trip_preserves_parameters(
            stages in proptest::collection::vec(stage_strategy(), 1..5)
        ) {
            let text = serialize(&stages);
            prop_assert_eq!(deserialize(&text).unwrap(), stages);
        }
    }
}
