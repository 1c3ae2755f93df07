//! Pure dimension math for every adjustment.
//!
//! Nothing here touches pixels, so each function is testable with plain
//! numbers. Rounding follows round-half-to-even throughout, which keeps the
//! results identical to the long-standing reference outputs (`round(2.5) == 2`).
//!
//! Any computed side that comes out below one pixel makes the whole result
//! fall back to the source dimensions.

use super::params::{FillParams, FitParams};
use crate::geometry::{Area, Dimensions};
use image::imageops::FilterType;

fn round(value: f64) -> f64 {
    value.round_ties_even()
}

/// Convert float sides back to pixels, or return `source` if either is degenerate.
fn positive_or_source(source: Dimensions, width: f64, height: f64) -> Dimensions {
    if !(width >= 1.0 && height >= 1.0) {
        return source;
    }
    Dimensions::new(
        width.min(u32::MAX as f64) as u32,
        height.min(u32::MAX as f64) as u32,
    )
}

/// Scale to fit inside the requested bounds, preserving aspect ratio.
///
/// # Examples
/// ```
/// # use imgadjust::adjustment::calculations::fit_dimensions;
/// # use imgadjust::adjustment::FitParams;
/// # use imgadjust::geometry::Dimensions;
/// let params = FitParams { width: Some(50), ..Default::default() };
/// assert_eq!(fit_dimensions(Dimensions::new(100, 100), &params), Dimensions::new(50, 50));
///
/// // Both bounds: the image fits inside the box
/// let params = FitParams { width: Some(50), height: Some(40), ..Default::default() };
/// assert_eq!(fit_dimensions(Dimensions::new(100, 100), &params), Dimensions::new(40, 40));
/// ```
pub fn fit_dimensions(source: Dimensions, params: &FitParams) -> Dimensions {
    let ratio = source.ratio();
    let (width, height) = match (params.width, params.height) {
        (None, None) => return source,
        (Some(width), None) => {
            let mut width = width as f64;
            let mut height = round(width / ratio);
            if let Some(max_height) = params.max_height
                && height > max_height as f64
            {
                height = max_height as f64;
                width = round(height * ratio);
            }
            (width, height)
        }
        (None, Some(height)) => {
            let mut height = height as f64;
            let mut width = round(height * ratio);
            if let Some(max_width) = params.max_width
                && width > max_width as f64
            {
                width = max_width as f64;
                height = round(width / ratio);
            }
            (width, height)
        }
        (Some(width), Some(height)) => {
            let (width, height) = (width as f64, height as f64);
            (
                width.min(round(height * ratio)),
                height.min(round(width / ratio)),
            )
        }
    };
    positive_or_source(source, width, height)
}

/// Clamp each requested side to the source. Absent sides keep the source extent.
pub fn crop_dimensions(source: Dimensions, width: Option<u32>, height: Option<u32>) -> Dimensions {
    positive_or_source(
        source,
        width.map_or(source.width, |w| w.min(source.width)) as f64,
        height.map_or(source.height, |h| h.min(source.height)) as f64,
    )
}

/// Largest box of aspect `ratio` (width / height) that fits in the source.
///
/// A target wider than the source keeps the full width and cuts the
/// height; otherwise the full height is kept and the width is cut.
pub fn ratio_crop_dimensions(source: Dimensions, ratio: f64) -> Dimensions {
    let (width, height) = if ratio > source.ratio() {
        (source.width as f64, round(source.width as f64 / ratio))
    } else {
        (round(source.height as f64 * ratio), source.height as f64)
    };
    positive_or_source(source, width, height)
}

/// Size of the named area, clamped to the image. Identity when not found.
pub fn named_crop_dimensions(source: Dimensions, area: Option<&Area>) -> Dimensions {
    area.and_then(|area| area.crop_box().clamp_to(source))
        .map_or(source, |bounds| bounds.dimensions())
}

/// Exact output size of a fill. The free side is derived by truncation
/// and may only be limited by its `max_*` bound.
pub fn fill_dimensions(source: Dimensions, params: &FillParams) -> Dimensions {
    let ratio = source.ratio();
    let (width, height) = match (params.width, params.height) {
        (None, None) => return source,
        (Some(width), None) => {
            let mut height = (width as f64 / ratio).trunc();
            if let Some(max_height) = params.max_height {
                height = height.min(max_height as f64);
            }
            (width as f64, height)
        }
        (None, Some(height)) => {
            let mut width = (height as f64 * ratio).trunc();
            if let Some(max_width) = params.max_width {
                width = width.min(max_width as f64);
            }
            (width, height as f64)
        }
        (Some(width), Some(height)) => (width as f64, height as f64),
    };
    positive_or_source(source, width, height)
}

/// Top-left offset that centres `target` inside `source`.
pub fn centered_offset(source: Dimensions, target: Dimensions) -> (u32, u32) {
    (
        source.width.saturating_sub(target.width) / 2,
        source.height.saturating_sub(target.height) / 2,
    )
}

/// Resampling filter for a resize: the expensive one when shrinking.
pub fn resize_filter(source: Dimensions, target: Dimensions) -> FilterType {
    if target.width < source.width {
        FilterType::Lanczos3
    } else {
        FilterType::CatmullRom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions::new(width, height)
    }

    fn fit(width: Option<u32>, height: Option<u32>) -> FitParams {
        FitParams {
            width,
            height,
            ..Default::default()
        }
    }

    fn fill(width: Option<u32>, height: Option<u32>) -> FillParams {
        FillParams {
            width,
            height,
            ..Default::default()
        }
    }

    // =========================================================================
    // fit_dimensions
    // =========================================================================

    #[test]
    fn fit_without_bounds_is_identity() {
        assert_eq!(fit_dimensions(dims(100, 100), &fit(None, None)), dims(100, 100));
    }

    #[test]
    fn fit_width_only() {
        assert_eq!(fit_dimensions(dims(100, 100), &fit(Some(50), None)), dims(50, 50));
        assert_eq!(fit_dimensions(dims(400, 300), &fit(Some(200), None)), dims(200, 150));
    }

    #[test]
    fn fit_height_only() {
        assert_eq!(fit_dimensions(dims(100, 100), &fit(None, Some(50))), dims(50, 50));
    }

    #[test]
    fn fit_both_stays_inside_box() {
        assert_eq!(fit_dimensions(dims(100, 100), &fit(Some(50), Some(50))), dims(50, 50));
        assert_eq!(fit_dimensions(dims(100, 100), &fit(Some(50), Some(40))), dims(40, 40));
        assert_eq!(fit_dimensions(dims(400, 200), &fit(Some(100), Some(100))), dims(100, 50));
    }

    #[test]
    fn fit_upscales_when_asked() {
        assert_eq!(fit_dimensions(dims(100, 100), &fit(Some(200), None)), dims(200, 200));
    }

    #[test]
    fn fit_width_clamped_by_max_height() {
        let params = FitParams {
            width: Some(100),
            max_height: Some(50),
            ..Default::default()
        };
        assert_eq!(fit_dimensions(dims(100, 100), &params), dims(50, 50));
    }

    #[test]
    fn fit_height_clamped_by_max_width() {
        let params = FitParams {
            height: Some(100),
            max_width: Some(100),
            ..Default::default()
        };
        assert_eq!(fit_dimensions(dims(400, 200), &params), dims(100, 50));
    }

    #[test]
    fn fit_max_bound_not_reached() {
        let params = FitParams {
            width: Some(50),
            max_height: Some(200),
            ..Default::default()
        };
        assert_eq!(fit_dimensions(dims(100, 100), &params), dims(50, 50));
    }

    #[test]
    fn fit_rounds_half_to_even() {
        // 25 / 10 = 2.5 → 2, 35 / 10 = 3.5 → 4
        assert_eq!(fit_dimensions(dims(100, 10), &fit(Some(25), None)), dims(25, 2));
        assert_eq!(fit_dimensions(dims(100, 10), &fit(Some(35), None)), dims(35, 4));
    }

    #[test]
    fn fit_degenerate_falls_back_to_source() {
        // 1 / 1000 rounds to 0
        assert_eq!(fit_dimensions(dims(1000, 1), &fit(Some(1), None)), dims(1000, 1));
    }

    // =========================================================================
    // crop_dimensions
    // =========================================================================

    #[test]
    fn crop_clamps_to_source() {
        assert_eq!(crop_dimensions(dims(100, 100), Some(50), Some(50)), dims(50, 50));
        assert_eq!(crop_dimensions(dims(100, 100), Some(500), Some(20)), dims(100, 20));
    }

    #[test]
    fn crop_absent_side_keeps_source() {
        assert_eq!(crop_dimensions(dims(100, 80), Some(25), None), dims(25, 80));
        assert_eq!(crop_dimensions(dims(100, 80), None, None), dims(100, 80));
    }

    #[test]
    fn crop_zero_side_falls_back_to_source() {
        assert_eq!(crop_dimensions(dims(100, 100), Some(0), None), dims(100, 100));
        assert_eq!(crop_dimensions(dims(100, 100), Some(40), Some(0)), dims(100, 100));
    }

    // =========================================================================
    // ratio_crop_dimensions
    // =========================================================================

    #[test]
    fn ratio_crop_tall_target_cuts_width() {
        assert_eq!(ratio_crop_dimensions(dims(100, 100), 0.5), dims(50, 100));
    }

    #[test]
    fn ratio_crop_wide_target_cuts_height() {
        assert_eq!(ratio_crop_dimensions(dims(100, 100), 2.0), dims(100, 50));
        assert_eq!(ratio_crop_dimensions(dims(160, 160), 16.0 / 9.0), dims(160, 90));
    }

    #[test]
    fn ratio_crop_same_ratio_is_identity() {
        assert_eq!(ratio_crop_dimensions(dims(300, 200), 1.5), dims(300, 200));
    }

    #[test]
    fn ratio_crop_extreme_ratio_falls_back() {
        assert_eq!(ratio_crop_dimensions(dims(10, 10), 100.0), dims(10, 10));
    }

    // =========================================================================
    // named_crop_dimensions
    // =========================================================================

    #[test]
    fn named_crop_uses_area_size() {
        let area = Area::new(21, 46, 70, 95).with_name("face");
        assert_eq!(named_crop_dimensions(dims(100, 100), Some(&area)), dims(49, 49));
    }

    #[test]
    fn named_crop_missing_area_is_identity() {
        assert_eq!(named_crop_dimensions(dims(100, 100), None), dims(100, 100));
    }

    #[test]
    fn named_crop_clamps_overhanging_area() {
        let area = Area::new(80, 90, 150, 150);
        assert_eq!(named_crop_dimensions(dims(100, 100), Some(&area)), dims(20, 10));
    }

    // =========================================================================
    // fill_dimensions
    // =========================================================================

    #[test]
    fn fill_both_is_exact() {
        assert_eq!(fill_dimensions(dims(100, 100), &fill(Some(50), Some(50))), dims(50, 50));
        assert_eq!(fill_dimensions(dims(100, 100), &fill(Some(50), Some(40))), dims(50, 40));
    }

    #[test]
    fn fill_single_side() {
        assert_eq!(fill_dimensions(dims(100, 100), &fill(Some(50), None)), dims(50, 50));
        assert_eq!(fill_dimensions(dims(100, 100), &fill(None, Some(50))), dims(50, 50));
    }

    #[test]
    fn fill_truncates_derived_side() {
        // 50 / (3/2) = 33.3 → 33, and 100 / 1.5 = 66.6 → 66
        assert_eq!(fill_dimensions(dims(300, 200), &fill(Some(50), None)), dims(50, 33));
        assert_eq!(fill_dimensions(dims(300, 200), &fill(Some(100), None)), dims(100, 66));
    }

    #[test]
    fn fill_max_bounds_limit_free_side() {
        let params = FillParams {
            width: Some(100),
            max_height: Some(50),
            ..Default::default()
        };
        assert_eq!(fill_dimensions(dims(100, 100), &params), dims(100, 50));

        let params = FillParams {
            height: Some(100),
            max_width: Some(50),
            ..Default::default()
        };
        assert_eq!(fill_dimensions(dims(100, 100), &params), dims(50, 100));

        let params = FillParams {
            width: Some(50),
            max_height: Some(200),
            ..Default::default()
        };
        assert_eq!(fill_dimensions(dims(100, 100), &params), dims(50, 50));
    }

    // =========================================================================
    // helpers
    // =========================================================================

    #[test]
    fn center_offset_truncates() {
        assert_eq!(centered_offset(dims(100, 100), dims(50, 50)), (25, 25));
        assert_eq!(centered_offset(dims(101, 100), dims(50, 49)), (25, 25));
    }

    #[test]
    fn filter_depends_on_width_direction() {
        assert_eq!(resize_filter(dims(100, 100), dims(50, 50)), FilterType::Lanczos3);
        assert_eq!(resize_filter(dims(100, 100), dims(200, 200)), FilterType::CatmullRom);
        assert_eq!(resize_filter(dims(100, 100), dims(100, 50)), FilterType::CatmullRom);
    }
}
