use serde::{Deserialize, Serialize};

/// Fraction of the region's own width/height added on every side.
pub const DEFAULT_REGION_MARGIN: f64 = 0.1;

/// Region expressed as fractions of the screen, `(x0, y0)` top-left and `(x1, y1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl NormRect {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

/// Absolute pixel rectangle, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn full(screen: (u32, u32)) -> Self {
        Self {
            left: 0,
            top: 0,
            right: screen.0,
            bottom: screen.1,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

fn clamp_axis(value: i64, max: u32) -> u32 {
    value.clamp(0, max as i64) as u32
}

/// Resolve a relative region into pixels for the given screen size.
///
/// Fractions are scaled and truncated, then the rectangle grows by `margin`
/// of its own extent on each side and is clamped to the screen. Inverted
/// input is not rejected; it comes out empty.
pub fn resolve_region(rel: &NormRect, screen: (u32, u32), margin: f64) -> PixelRect {
    let (w, h) = (screen.0 as f64, screen.1 as f64);

    let x0 = (rel.x0 * w) as i64;
    let y0 = (rel.y0 * h) as i64;
    let x1 = (rel.x1 * w) as i64;
    let y1 = (rel.y1 * h) as i64;

    let margin_x = ((x1 - x0) as f64 * margin) as i64;
    let margin_y = ((y1 - y0) as f64 * margin) as i64;

    PixelRect {
        left: clamp_axis(x0 - margin_x, screen.0),
        top: clamp_axis(y0 - margin_y, screen.1),
        right: clamp_axis(x1 + margin_x, screen.0),
        bottom: clamp_axis(y1 + margin_y, screen.1),
    }
}
