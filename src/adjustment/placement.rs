//! Crop placement: where to cut a `target`-sized box out of an image.
//!
//! With no areas the box is centred. Otherwise every legal top-left offset
//! is scored by how much of the protected areas it would cut away, and the
//! cheapest offset wins.
//!
//! ## Scoring
//!
//! For a candidate box `R = (x1, y1, x2, y2)` each area contributes:
//!
//! | Relation to `R` | Penalty |
//! |---|---|
//! | fully enclosed | `0` |
//! | fully outside | `area` |
//! | partially cut | `area - kept_width * kept_height` |
//!
//! divided by the area's `priority`. Note the direction: a *higher* priority
//! lowers the penalty, so the search cares less about that area.
//!
//! ## Scan order and ties
//!
//! Offsets are visited with `x` in the outer loop and `y` in the inner loop.
//! The first offset reaching the strict minimum is kept, so among equally
//! good offsets the smallest `x` wins, then the smallest `y`. A running
//! total that already exceeds the best total stops summing early; that only
//! skips work and never changes the chosen offset.

use super::calculations::centered_offset;
use crate::geometry::{Area, CropBox, Dimensions};
use log::{debug, warn};

/// How a [`Placement`] was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStrategy {
    /// No areas to protect.
    Centered,
    /// Exhaustive penalty search.
    Searched,
    /// Search space larger than the configured budget; centred instead.
    BudgetExceeded,
}

/// Result of a crop placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    /// Total priority-weighted penalty of the chosen offset.
    pub penalty: f64,
    /// Number of offsets scored.
    pub candidates: u64,
    pub strategy: PlacementStrategy,
}

impl Placement {
    pub fn crop_box(&self, size: Dimensions) -> CropBox {
        CropBox::at(self.x, self.y, size)
    }
}

/// Tuning for the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of offsets to score. `None` searches everything.
    pub budget: Option<u64>,
}

impl SearchOptions {
    /// Options from a config value where `0` means unlimited.
    pub fn with_budget(budget: u64) -> Self {
        Self {
            budget: (budget > 0).then_some(budget),
        }
    }
}

/// Penalty of `area` for a box of `size` at `(x, y)`.
pub fn penalty(area: &Area, x: u32, y: u32, size: Dimensions) -> f64 {
    let x1 = x as i64;
    let y1 = y as i64;
    let x2 = x1 + size.width as i64;
    let y2 = y1 + size.height as i64;
    let (ax1, ay1, ax2, ay2) = (
        area.x1 as i64,
        area.y1 as i64,
        area.x2 as i64,
        area.y2 as i64,
    );
    let full = area.area() as i64;

    let lost = if ax1 >= x1 && ax2 <= x2 && ay1 >= y1 && ay2 <= y2 {
        0
    } else if ax2 < x1 || ax1 > x2 || ay2 < y1 || ay1 > y2 {
        full
    } else {
        let kept_width = (ax2 - x1).min(x2 - ax1).min(area.width() as i64);
        let kept_height = (ay2 - y1).min(y2 - ay1).min(area.height() as i64);
        full - kept_width * kept_height
    };
    lost as f64 / area.priority.max(1) as f64
}

/// Choose the top-left corner of a `target` crop inside `source`.
///
/// `target` must not exceed `source` on either side.
pub fn find_crop_offset(
    source: Dimensions,
    target: Dimensions,
    areas: &[Area],
    options: SearchOptions,
) -> Placement {
    let max_x = source.width.saturating_sub(target.width);
    let max_y = source.height.saturating_sub(target.height);
    let candidates = (max_x as u64 + 1) * (max_y as u64 + 1);

    let centered = |strategy| {
        let (x, y) = centered_offset(source, target);
        Placement {
            x,
            y,
            penalty: 0.0,
            candidates: 0,
            strategy,
        }
    };

    if areas.is_empty() {
        return centered(PlacementStrategy::Centered);
    }
    if let Some(budget) = options.budget
        && candidates > budget
    {
        warn!(
            "Crop search for {target} in {source} needs {candidates} candidates \
             (budget {budget}), centring instead"
        );
        return centered(PlacementStrategy::BudgetExceeded);
    }

    let mut best = (0, 0, f64::INFINITY);
    for x in 0..=max_x {
        for y in 0..=max_y {
            let mut total = 0.0;
            for area in areas {
                total += penalty(area, x, y, target);
                if total > best.2 {
                    break;
                }
            }
            if total < best.2 {
                best = (x, y, total);
            }
        }
    }

    let (x, y, penalty) = best;
    debug!(
        "Crop search for {target} in {source}: {candidates} candidates, {} areas, \
         best ({x}, {y}) penalty {penalty}",
        areas.len()
    );
    Placement {
        x,
        y,
        penalty,
        candidates,
        strategy: PlacementStrategy::Searched,
    }
}
