//! Geometry primitives shared by every adjustment.
//!
//! - [`Dimensions`]: a `(width, height)` pair in pixels.
//! - [`CropBox`]: the rectangle `(x1, y1, x2, y2)` cut out of an image.
//! - [`Area`]: a caller-supplied protected rectangle with a name and a
//!   priority. Areas are read-only input: the engine never mutates them.
//!
//! ## Priority
//!
//! An area's crop penalty is **divided** by its priority, so a larger
//! priority value makes the area matter *less* to the crop search. The name
//! is historical and kept as-is; see [`crate::adjustment::placement`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Priority given to areas that don't specify one.
pub const DEFAULT_PRIORITY: u32 = 3;

/// Width and height of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Dimensions> for (u32, u32) {
    fn from(dims: Dimensions) -> Self {
        (dims.width, dims.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A crop rectangle: left/top inclusive, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box of `size` whose top-left corner sits at `(x, y)`.
    pub fn at(x: u32, y: u32, size: Dimensions) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x + size.width,
            y2: y + size.height,
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Intersect with an image of `bounds`. Returns `None` when nothing
    /// of the box lies inside the image.
    pub fn clamp_to(&self, bounds: Dimensions) -> Option<Self> {
        let x1 = self.x1.min(bounds.width);
        let y1 = self.y1.min(bounds.height);
        let x2 = self.x2.min(bounds.width);
        let y2 = self.y2.min(bounds.height);
        if x2 > x1 && y2 > y1 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }
}

impl fmt::Display for CropBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AreaError {
    #[error("Invalid area: {}", .0.join(" "))]
    Invalid(Vec<String>),
}

/// A protected rectangle within an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    /// Identifier used by the named crop. Empty for anonymous areas.
    #[serde(default)]
    pub name: String,
    /// Penalty divisor: higher values *reduce* the area's influence.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

impl Area {
    /// Anonymous area with the default priority.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            name: String::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Pixel area covered by the rectangle.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn crop_box(&self) -> CropBox {
        CropBox::new(self.x1, self.y1, self.x2, self.y2)
    }

    /// Check the rectangle is well formed. Every violated rule is reported.
    pub fn validate(&self) -> Result<(), AreaError> {
        let mut errors = Vec::new();
        if self.x1 >= self.x2 {
            errors.push("X1 must be less than X2.".to_string());
        }
        if self.y1 >= self.y2 {
            errors.push("Y1 must be less than Y2.".to_string());
        }
        if self.priority < 1 {
            errors.push("Priority must be at least 1.".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AreaError::Invalid(errors))
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(
                f,
                "({}, {}, {}, {} / {})",
                self.x1, self.y1, self.x2, self.y2, self.priority
            )
        } else {
            f.write_str(&self.name)
        }
    }
}
