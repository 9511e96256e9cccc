//! Normalized <-> screen coordinate conversion
//!
//! Pure functions of the current [`ViewState`] and the rendered page size:
//!
//! ```text
//! screen_x = norm_x * page_width  * zoom + pan_x
//! screen_y = norm_y * page_height * zoom + pan_y
//! ```
//!
//! Pointer events routinely land outside the document while panning, so the
//! checked inverse returns [`Projection::OutOfBounds`] instead of failing.

use crate::geometry::{NormalizedPoint, NormalizedRect, PageDimensions, ScreenPoint, ScreenRect};
use crate::view::{PageTransform, ViewState};

/// Result of mapping a screen point back onto the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Inside(NormalizedPoint),
    OutOfBounds,
}

impl Projection {
    pub fn inside(self) -> Option<NormalizedPoint> {
        match self {
            Projection::Inside(point) => Some(point),
            Projection::OutOfBounds => None,
        }
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, Projection::Inside(_))
    }
}

/// Converter bound to one view state and one page size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    transform: PageTransform,
}

impl CoordinateMapper {
    pub fn new(view: &ViewState, page: PageDimensions) -> Self {
        Self {
            transform: view.transform(page),
        }
    }

    pub fn from_transform(transform: PageTransform) -> Self {
        Self { transform }
    }

    pub fn transform(&self) -> &PageTransform {
        &self.transform
    }

    /// Normalized page point to screen point
    pub fn project(&self, point: NormalizedPoint) -> ScreenPoint {
        let t = &self.transform;
        ScreenPoint::new(
            point.x * t.scale_x + t.offset_x,
            point.y * t.scale_y + t.offset_y,
        )
    }

    /// Screen point to normalized page space without bounds checking
    ///
    /// Yields NaN components when the transform has zero scale.
    pub fn unproject(&self, point: ScreenPoint) -> NormalizedPoint {
        let t = &self.transform;
        if !t.is_invertible() {
            return NormalizedPoint::new(f32::NAN, f32::NAN);
        }
        NormalizedPoint::new(
            (point.x - t.offset_x) / t.scale_x,
            (point.y - t.offset_y) / t.scale_y,
        )
    }

    /// Screen point to normalized page space, or `OutOfBounds` off the page
    ///
    /// Values within [`crate::geometry::BOUNDS_EPSILON`] of an edge count as
    /// on the page and are clamped onto it.
    pub fn to_normalized(&self, point: ScreenPoint) -> Projection {
        let normalized = self.unproject(point);
        if normalized.is_on_page() {
            Projection::Inside(normalized.clamped())
        } else {
            Projection::OutOfBounds
        }
    }

    /// Screen point to normalized space, clamped onto the page edge
    ///
    /// Used while a gesture that started on the page keeps dragging past it.
    pub fn to_normalized_clamped(&self, point: ScreenPoint) -> Option<NormalizedPoint> {
        let normalized = self.unproject(point);
        if normalized.x.is_finite() && normalized.y.is_finite() {
            Some(normalized.clamped())
        } else {
            None
        }
    }

    pub fn project_rect(&self, rect: &NormalizedRect) -> ScreenRect {
        let top_left = self.project(NormalizedPoint::new(rect.x, rect.y));
        ScreenRect::new(
            top_left.x,
            top_left.y,
            rect.width * self.transform.scale_x,
            rect.height * self.transform.scale_y,
        )
    }

    /// Screen rectangle covered by the whole page
    pub fn page_rect(&self) -> ScreenRect {
        self.project_rect(&NormalizedRect::new(0.0, 0.0, 1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(zoom: f32, pan_x: f32, pan_y: f32) -> CoordinateMapper {
        let view = ViewState {
            zoom,
            pan_x,
            pan_y,
            current_page: 1,
        };
        CoordinateMapper::new(&view, PageDimensions::new(800.0, 600.0))
    }

    #[test]
    fn test_project_identity_view() {
        let m = mapper(1.0, 0.0, 0.0);
        let p = m.project(NormalizedPoint::new(0.5, 0.5));
        assert_eq!(p, ScreenPoint::new(400.0, 300.0));
    }

    #[test]
    fn test_project_with_zoom_and_pan() {
        let m = mapper(2.0, 40.0, -10.0);
        let p = m.project(NormalizedPoint::new(0.25, 0.5));
        assert_eq!(p, ScreenPoint::new(0.25 * 800.0 * 2.0 + 40.0, 0.5 * 600.0 * 2.0 - 10.0));
    }

    #[test]
    fn test_to_normalized_out_of_bounds() {
        let m = mapper(1.0, 100.0, 100.0);
        assert_eq!(m.to_normalized(ScreenPoint::new(50.0, 150.0)), Projection::OutOfBounds);
        assert_eq!(m.to_normalized(ScreenPoint::new(950.0, 150.0)), Projection::OutOfBounds);
        assert!(m.to_normalized(ScreenPoint::new(500.0, 400.0)).is_inside());
    }

    #[test]
    fn test_to_normalized_edges_are_inside() {
        let m = mapper(1.5, 13.0, 7.0);
        for corner in [
            NormalizedPoint::new(0.0, 0.0),
            NormalizedPoint::new(1.0, 0.0),
            NormalizedPoint::new(0.0, 1.0),
            NormalizedPoint::new(1.0, 1.0),
        ] {
            let back = m.to_normalized(m.project(corner)).inside().unwrap();
            assert!((back.x - corner.x).abs() < 1e-5);
            assert!((back.y - corner.y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_clamped_inverse_follows_drag_past_edge() {
        let m = mapper(1.0, 0.0, 0.0);
        let p = m.to_normalized_clamped(ScreenPoint::new(-20.0, 900.0)).unwrap();
        assert_eq!(p, NormalizedPoint::new(0.0, 1.0));
    }

    #[test]
    fn test_zero_scale_is_never_inside() {
        let view = ViewState::default();
        let m = CoordinateMapper::new(&view, PageDimensions::new(0.0, 0.0));
        assert_eq!(m.to_normalized(ScreenPoint::new(0.0, 0.0)), Projection::OutOfBounds);
        assert!(m.to_normalized_clamped(ScreenPoint::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_project_rect() {
        let m = mapper(2.0, 10.0, 20.0);
        let r = m.project_rect(&NormalizedRect::new(0.1, 0.2, 0.5, 0.25));
        assert!((r.x - 170.0).abs() < 1e-3);
        assert!((r.y - 260.0).abs() < 1e-3);
        assert!((r.width - 800.0).abs() < 1e-3);
        assert!((r.height - 300.0).abs() < 1e-3);
    }
}
