//! Zoom/pan view state
//!
//! [`ViewState`] is ephemeral and owned by exactly one viewer. The
//! [`ZoomPanController`] is the only thing that mutates it; zoom is clamped
//! after every operation, pan is never clamped (the page may be dragged fully
//! off-screen).

use crate::config::EngineConfig;
use crate::geometry::{PageDimensions, ScreenPoint};

/// Default lower zoom bound
pub const MIN_ZOOM: f32 = 0.5;

/// Default upper zoom bound
pub const MAX_ZOOM: f32 = 4.0;

/// Default zoomIn/zoomOut increment
pub const ZOOM_STEP: f32 = 0.25;

/// Current zoom, pan offset and page of a viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,

    /// Page number (1-based)
    pub current_page: u32,
}

impl ViewState {
    /// Fresh view of `page`: zoom 1, no pan
    pub fn for_page(page: u32) -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            current_page: page,
        }
    }

    /// Affine transform from normalized page space into screen space
    pub fn transform(&self, page: PageDimensions) -> PageTransform {
        PageTransform {
            scale_x: page.width * self.zoom,
            scale_y: page.height * self.zoom,
            offset_x: self.pan_x,
            offset_y: self.pan_y,
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::for_page(1)
    }
}

/// Scale-then-translate transform shared by the mapper and the renderer
///
/// `screen = normalized * scale + offset`, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl PageTransform {
    pub fn is_invertible(&self) -> bool {
        self.scale_x.is_finite()
            && self.scale_y.is_finite()
            && self.scale_x != 0.0
            && self.scale_y != 0.0
    }
}

/// Zoom bounds and step sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ZoomLimits {
    /// Ordered `(min, max)`; a non-finite or non-positive end falls back to its default
    pub fn bounds(&self) -> (f32, f32) {
        let usable = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        let low = usable(self.min, MIN_ZOOM);
        let high = usable(self.max, MAX_ZOOM);
        if low <= high {
            (low, high)
        } else {
            (high, low)
        }
    }

    pub fn clamp(&self, zoom: f32) -> f32 {
        let (low, high) = self.bounds();
        let zoom = if zoom.is_nan() { 1.0 } else { zoom };
        zoom.max(low).min(high)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
            step: ZOOM_STEP,
        }
    }
}

impl From<&EngineConfig> for ZoomLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            min: config.min_zoom,
            max: config.max_zoom,
            step: config.zoom_step,
        }
    }
}

/// Owner of zoom level and pan offset
#[derive(Debug, Clone)]
pub struct ZoomPanController {
    state: ViewState,
    limits: ZoomLimits,
}

impl ZoomPanController {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            state: ViewState::for_page(1),
            limits,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn limits(&self) -> &ZoomLimits {
        &self.limits
    }

    pub fn zoom(&self) -> f32 {
        self.state.zoom
    }

    pub fn zoom_in(&mut self) {
        self.zoom_to(self.state.zoom + self.limits.step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_to(self.state.zoom - self.limits.step);
    }

    /// Set zoom directly, clamped to the limits. Pan is left untouched.
    pub fn zoom_to(&mut self, zoom: f32) {
        self.state.zoom = self.limits.clamp(zoom);
    }

    /// Back to zoom 1 with no pan, same page
    pub fn reset_view(&mut self) {
        self.state = ViewState::for_page(self.state.current_page);
        self.state.zoom = self.limits.clamp(1.0);
    }

    /// Unconditional pan
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.state.pan_x += dx;
            self.state.pan_y += dy;
        }
    }

    /// Change zoom by `delta` keeping the content under `pivot` stationary
    ///
    /// The normalized point under the pivot before the change maps back to the
    /// same screen position afterwards. Since the transform is a per-axis
    /// scale plus offset, this reduces to scaling the pivot-to-origin vector
    /// by the zoom ratio and does not need the page dimensions.
    pub fn zoom_at(&mut self, delta: f32, pivot: ScreenPoint) {
        let old_zoom = self.state.zoom;
        let new_zoom = self.limits.clamp(old_zoom + delta);
        if new_zoom == old_zoom || !pivot.x.is_finite() || !pivot.y.is_finite() {
            return;
        }

        let ratio = new_zoom / old_zoom;
        self.state.pan_x = pivot.x - (pivot.x - self.state.pan_x) * ratio;
        self.state.pan_y = pivot.y - (pivot.y - self.state.pan_y) * ratio;
        self.state.zoom = new_zoom;
    }

    /// Switch page; the view always resets, even when the page is unchanged
    pub fn set_page(&mut self, page: u32) {
        self.state = ViewState::for_page(page);
        self.state.zoom = self.limits.clamp(1.0);
    }

    pub fn transform(&self, page: PageDimensions) -> PageTransform {
        self.state.transform(page)
    }
}

impl Default for ZoomPanController {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}
