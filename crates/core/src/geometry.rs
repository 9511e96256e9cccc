//! Point, size and rectangle types for the two coordinate spaces
//!
//! Anchors live in *normalized* page space: `[0,1] × [0,1]` per page, origin at
//! the top-left corner, x to the right, y downward. Pointer events and overlay
//! primitives live in *screen* space (layout pixels of the viewer surface).

use serde::{Deserialize, Serialize};

/// Slack allowed when deciding whether a normalized value lies on the page.
///
/// Forward/inverse mapping in f32 can land a hair outside `[0,1]` for points
/// that were exactly on the edge.
pub const BOUNDS_EPSILON: f32 = 1e-4;

/// Point in normalized page space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Whether the point lies on the page (edges inclusive, with slack)
    pub fn is_on_page(&self) -> bool {
        in_unit_range(self.x) && in_unit_range(self.y)
    }

    /// Clamp both components into `[0,1]`
    pub fn clamped(&self) -> Self {
        Self {
            x: clamp_unit(self.x),
            y: clamp_unit(self.y),
        }
    }
}

/// Point in screen space (layout pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another screen point
    pub fn distance_to(&self, other: &ScreenPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Rendered page size in layout pixels at zoom 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

impl PageDimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A page with no usable area cannot be mapped into
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Axis-aligned rectangle in normalized page space
///
/// `(x, y)` is the top-left corner; `width`/`height` are fractions of the
/// page dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle spanning two corners in any order, clamped to the page
    pub fn from_corners(a: NormalizedPoint, b: NormalizedPoint) -> Self {
        let a = a.clamped();
        let b = b.clamped();
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: a.x.max(b.x) - x,
            height: a.y.max(b.y) - y,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> NormalizedPoint {
        NormalizedPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Intersect with the unit page; records coming from callers may spill over
    pub fn clamped_to_page(&self) -> Self {
        Self::from_corners(
            NormalizedPoint::new(self.x, self.y),
            NormalizedPoint::new(self.right(), self.bottom()),
        )
    }
}

/// Axis-aligned rectangle in screen space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: &ScreenPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

fn in_unit_range(value: f32) -> bool {
    value.is_finite() && value >= -BOUNDS_EPSILON && value <= 1.0 + BOUNDS_EPSILON
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_is_order_independent() {
        let a = NormalizedPoint::new(0.6, 0.6);
        let b = NormalizedPoint::new(0.3, 0.3);

        let forward = NormalizedRect::from_corners(a, b);
        let backward = NormalizedRect::from_corners(b, a);

        assert_eq!(forward, backward);
        assert!((forward.x - 0.3).abs() < 1e-6);
        assert!((forward.y - 0.3).abs() < 1e-6);
        assert!((forward.width - 0.3).abs() < 1e-6);
        assert!((forward.height - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_from_corners_clamps_to_page() {
        let rect = NormalizedRect::from_corners(
            NormalizedPoint::new(-0.5, 0.8),
            NormalizedPoint::new(0.4, 1.7),
        );

        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 0.8);
        assert!((rect.width - 0.4).abs() < 1e-6);
        assert!((rect.height - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_point_on_page_edges() {
        assert!(NormalizedPoint::new(0.0, 0.0).is_on_page());
        assert!(NormalizedPoint::new(1.0, 1.0).is_on_page());
        assert!(NormalizedPoint::new(1.00001, 0.5).is_on_page());
        assert!(!NormalizedPoint::new(1.01, 0.5).is_on_page());
        assert!(!NormalizedPoint::new(0.5, f32::NAN).is_on_page());
    }

    #[test]
    fn test_screen_distance() {
        let a = ScreenPoint::new(0.0, 0.0);
        let b = ScreenPoint::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_degenerate_dimensions() {
        assert!(PageDimensions::new(0.0, 100.0).is_degenerate());
        assert!(PageDimensions::new(f32::INFINITY, 100.0).is_degenerate());
        assert!(!PageDimensions::new(612.0, 792.0).is_degenerate());
    }
}
