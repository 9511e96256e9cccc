//! Pointer gesture state machine
//!
//! Every pointer-down starts exactly one gesture (pan, draw, place or drag)
//! and every gesture reaches `Idle` again: on pointer-up, on
//! [`InteractionController::pointer_cancel`], on a mode change, or when a new
//! pointer-down arrives while the previous gesture never saw its pointer-up.
//! Only pointer-up emits domain events.

use crate::overlay::{hit_annotation, hit_marker};
use blueprint_core::{
    AnchorId, Annotation, CoordinateMapper, EngineConfig, Marker, MarkerId, NormalizedPoint,
    NormalizedRect, PageDimensions, Projection, ScreenPoint, ViewerEvent, ZoomPanController,
};

/// Tool selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Pan,
    Draw,
    PlaceMarker,
}

/// Endpoints of an active rectangle-draw gesture, in normalized space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawState {
    pub start: NormalizedPoint,
    pub current: NormalizedPoint,
}

impl DrawState {
    pub fn new(start: NormalizedPoint, current: NormalizedPoint) -> Self {
        Self { start, current }
    }

    /// Rectangle spanned by the gesture, independent of drag direction
    pub fn rect(&self) -> NormalizedRect {
        NormalizedRect::from_corners(self.start, self.current)
    }
}

/// Gesture in progress
#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    Idle,
    Panning {
        origin: ScreenPoint,
        last: ScreenPoint,
        /// Annotation under the press, activated if the press turns out to be a click
        pressed_annotation: Option<AnchorId>,
    },
    Drawing(DrawState),
    PlacingMarker {
        origin: ScreenPoint,
        point: NormalizedPoint,
    },
    DraggingMarker {
        marker_id: MarkerId,
        origin: ScreenPoint,
        position: NormalizedPoint,
        moved: bool,
    },
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::Panning { .. } => "panning",
            GestureState::Drawing(_) => "drawing",
            GestureState::PlacingMarker { .. } => "placing_marker",
            GestureState::DraggingMarker { .. } => "dragging_marker",
        }
    }
}

/// The viewed page and anchors a pointer event is interpreted against
pub struct Surface<'a> {
    pub view: &'a mut ZoomPanController,
    pub page_size: PageDimensions,
    pub annotations: &'a [Annotation],
    pub markers: &'a [Marker],
}

impl Surface<'_> {
    fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.view.state(), self.page_size)
    }

    fn page(&self) -> u32 {
        self.view.state().current_page
    }
}

/// Thresholds that turn raw pointer travel into gesture decisions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureThresholds {
    pub min_draw_size: f32,
    pub marker_hit_radius_px: f32,
    pub click_tolerance_px: f32,
    /// Badge radius for annotation click hit tests
    pub badge_radius_px: f32,
}

impl From<&EngineConfig> for GestureThresholds {
    fn from(config: &EngineConfig) -> Self {
        Self {
            min_draw_size: config.min_draw_size,
            marker_hit_radius_px: config.marker_hit_radius_px,
            click_tolerance_px: config.click_tolerance_px,
            badge_radius_px: crate::overlay::OverlayStyle::default().badge_radius,
        }
    }
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: ToolMode,
    state: GestureState,
    thresholds: GestureThresholds,
}

impl InteractionController {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            mode: ToolMode::Pan,
            state: GestureState::Idle,
            thresholds,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Switch tool; any gesture in progress is dropped without emitting
    pub fn set_mode(&mut self, mode: ToolMode) {
        if !self.is_idle() {
            tracing::debug!(from = self.state.name(), ?mode, "mode change aborts gesture");
        }
        self.mode = mode;
        self.state = GestureState::Idle;
    }

    pub fn set_draw_mode(&mut self, enabled: bool) {
        match (enabled, self.mode) {
            (true, _) => self.set_mode(ToolMode::Draw),
            (false, ToolMode::Draw) => self.set_mode(ToolMode::Pan),
            (false, _) => self.set_mode(self.mode),
        }
    }

    pub fn set_marker_place_mode(&mut self, enabled: bool) {
        match (enabled, self.mode) {
            (true, _) => self.set_mode(ToolMode::PlaceMarker),
            (false, ToolMode::PlaceMarker) => self.set_mode(ToolMode::Pan),
            (false, _) => self.set_mode(self.mode),
        }
    }

    /// Current draw rectangle endpoints, for the overlay
    pub fn draw_state(&self) -> Option<&DrawState> {
        match &self.state {
            GestureState::Drawing(draw) => Some(draw),
            _ => None,
        }
    }

    /// Marker being dragged and its provisional position, once it has moved
    pub fn dragged_marker(&self) -> Option<(&MarkerId, NormalizedPoint)> {
        match &self.state {
            GestureState::DraggingMarker {
                marker_id,
                position,
                moved: true,
                ..
            } => Some((marker_id, *position)),
            _ => None,
        }
    }

    /// Terminate whatever gesture is open without emitting anything
    ///
    /// For pointer capture loss, the pointer leaving the window, or teardown.
    pub fn pointer_cancel(&mut self) {
        if !self.is_idle() {
            tracing::debug!(state = self.state.name(), "gesture cancelled");
        }
        self.state = GestureState::Idle;
    }

    pub fn pointer_down(&mut self, surface: &mut Surface<'_>, point: ScreenPoint) {
        if !self.is_idle() {
            tracing::debug!(state = self.state.name(), "terminating stale gesture");
            self.state = GestureState::Idle;
        }
        if !point.x.is_finite() || !point.y.is_finite() {
            return;
        }

        let view = *surface.view.state();
        if let Some(marker) = hit_marker(
            &view,
            surface.page_size,
            surface.markers,
            point,
            self.thresholds.marker_hit_radius_px,
        ) {
            self.state = GestureState::DraggingMarker {
                marker_id: marker.marker_id.clone(),
                origin: point,
                position: marker.position,
                moved: false,
            };
        } else {
            let projection = surface.mapper().to_normalized(point);
            self.state = match (self.mode, projection) {
                (ToolMode::Draw, Projection::Inside(start)) => {
                    GestureState::Drawing(DrawState::new(start, start))
                }
                (ToolMode::PlaceMarker, Projection::Inside(target)) => GestureState::PlacingMarker {
                    origin: point,
                    point: target,
                },
                (ToolMode::Pan, _) => GestureState::Panning {
                    origin: point,
                    last: point,
                    pressed_annotation: hit_annotation(
                        &view,
                        surface.page_size,
                        surface.annotations,
                        point,
                        self.thresholds.badge_radius_px,
                    )
                    .map(|annotation| annotation.anchor_id.clone()),
                },
                // Off-page press in a tool mode grabs the canvas instead
                (_, Projection::OutOfBounds) => GestureState::Panning {
                    origin: point,
                    last: point,
                    pressed_annotation: None,
                },
            };
        }

        tracing::debug!(state = self.state.name(), x = point.x, y = point.y, "gesture started");
    }

    pub fn pointer_move(&mut self, surface: &mut Surface<'_>, point: ScreenPoint) {
        if !point.x.is_finite() || !point.y.is_finite() {
            return;
        }
        let tolerance = self.thresholds.click_tolerance_px;

        match &mut self.state {
            GestureState::Idle => {}
            GestureState::Panning { last, .. } => {
                surface.view.pan_by(point.x - last.x, point.y - last.y);
                *last = point;
            }
            GestureState::Drawing(draw) => {
                if let Some(current) = surface.mapper().to_normalized_clamped(point) {
                    draw.current = current;
                }
            }
            GestureState::PlacingMarker { origin, .. } => {
                if origin.distance_to(&point) > tolerance {
                    let origin = *origin;
                    tracing::debug!("marker placement turned into pan");
                    surface.view.pan_by(point.x - origin.x, point.y - origin.y);
                    self.state = GestureState::Panning {
                        origin,
                        last: point,
                        pressed_annotation: None,
                    };
                }
            }
            GestureState::DraggingMarker {
                origin,
                position,
                moved,
                ..
            } => {
                if !*moved && origin.distance_to(&point) > tolerance {
                    *moved = true;
                }
                if *moved {
                    if let Some(next) = surface.mapper().to_normalized_clamped(point) {
                        *position = next;
                    }
                }
            }
        }
    }

    /// Finish the gesture at `point` and report what it amounted to
    pub fn pointer_up(&mut self, surface: &mut Surface<'_>, point: ScreenPoint) -> Option<ViewerEvent> {
        self.pointer_move(surface, point);
        let page = surface.page();
        let state = std::mem::replace(&mut self.state, GestureState::Idle);

        let event = match state {
            GestureState::Idle => None,
            GestureState::Panning {
                origin,
                pressed_annotation,
                ..
            } => pressed_annotation
                .filter(|_| origin.distance_to(&point) <= self.thresholds.click_tolerance_px)
                .map(|anchor_id| ViewerEvent::AnnotationActivated { anchor_id }),
            GestureState::Drawing(draw) => {
                let rect = draw.rect();
                let min = self.thresholds.min_draw_size;
                if rect.width > min && rect.height > min {
                    Some(ViewerEvent::draw_committed(rect, page))
                } else {
                    tracing::debug!(width = rect.width, height = rect.height, "draw below threshold discarded");
                    None
                }
            }
            GestureState::PlacingMarker { point, .. } => {
                Some(ViewerEvent::marker_place_requested(point, page))
            }
            GestureState::DraggingMarker {
                marker_id,
                origin,
                position,
                ..
            } => {
                // Net displacement decides; a drag that returns home is a click
                if origin.distance_to(&point) > self.thresholds.click_tolerance_px {
                    Some(ViewerEvent::marker_moved(marker_id, position))
                } else {
                    Some(ViewerEvent::MarkerActivated { marker_id })
                }
            }
        };

        if let Some(event) = &event {
            tracing::debug!(kind = event.kind(), page, "gesture emitted event");
        }
        event
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(GestureThresholds::default())
    }
}
