//! Annotation overlay rendering and hit testing
//!
//! [`AnnotationOverlay::render`] is a pure function of its input: the same
//! view state, page size, anchor lists and draft always produce the same
//! frame. Only anchors on the viewed page are drawn or hit-tested.

use crate::interaction::DrawState;
use crate::scene::{OverlayFrame, OverlayTarget, Primitive, StrokeStyle};
use blueprint_core::{
    annotations_on_page, markers_on_page, Annotation, Color, CoordinateMapper, Marker, MarkerId,
    NormalizedPoint, PageDimensions, ScreenPoint, StatusPalette, ViewState,
};

/// Sizes and colors of overlay primitives, in screen pixels
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub palette: StatusPalette,
    pub stroke_width: f32,
    /// Alpha of the status-colored rectangle fill
    pub fill_alpha: u8,
    pub badge_radius: f32,
    pub badge_text_color: Color,
    pub label_size: f32,
    pub marker_radius: f32,
    pub marker_color: Color,
    pub marker_outline: Color,
    pub draft_color: Color,
    pub draft_dash: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            palette: StatusPalette::default(),
            stroke_width: 2.0,
            fill_alpha: 48,
            badge_radius: 11.0,
            badge_text_color: Color::WHITE,
            label_size: 10.0,
            marker_radius: 7.0,
            marker_color: Color::BLUE,
            marker_outline: Color::WHITE,
            draft_color: Color::BLUE,
            draft_dash: 6.0,
        }
    }
}

impl OverlayStyle {
    /// Multiply every pixel size by `factor` (report export at higher zoom)
    pub fn scaled(mut self, factor: f32) -> Self {
        self.stroke_width *= factor;
        self.badge_radius *= factor;
        self.label_size *= factor;
        self.marker_radius *= factor;
        self.draft_dash *= factor;
        self
    }
}

/// Everything one overlay pass depends on
#[derive(Debug, Clone, Copy)]
pub struct OverlayInput<'a> {
    pub view: &'a ViewState,
    pub page_size: PageDimensions,
    pub annotations: &'a [Annotation],
    pub markers: &'a [Marker],
    pub draft: Option<&'a DrawState>,
    /// Marker currently being dragged and its provisional position
    pub dragged_marker: Option<(&'a MarkerId, NormalizedPoint)>,
}

impl<'a> OverlayInput<'a> {
    pub fn new(
        view: &'a ViewState,
        page_size: PageDimensions,
        annotations: &'a [Annotation],
        markers: &'a [Marker],
    ) -> Self {
        Self {
            view,
            page_size,
            annotations,
            markers,
            draft: None,
            dragged_marker: None,
        }
    }

    pub fn with_draft(mut self, draft: Option<&'a DrawState>) -> Self {
        self.draft = draft;
        self
    }

    pub fn with_dragged_marker(mut self, dragged: Option<(&'a MarkerId, NormalizedPoint)>) -> Self {
        self.dragged_marker = dragged;
        self
    }
}

/// Stateless overlay renderer
#[derive(Debug, Clone, Default)]
pub struct AnnotationOverlay {
    style: OverlayStyle,
}

impl AnnotationOverlay {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn render(&self, input: &OverlayInput<'_>) -> OverlayFrame {
        let page = input.view.current_page;
        let mapper = CoordinateMapper::new(input.view, input.page_size);
        let style = &self.style;
        let mut frame = OverlayFrame::new(page);

        for annotation in annotations_on_page(input.annotations, page) {
            let target = OverlayTarget::Annotation(annotation.anchor_id.clone());
            let color = style.palette.color_for(&annotation.status);
            let rect = mapper.project_rect(&annotation.rect.clamped_to_page());

            frame.push(
                target.clone(),
                Primitive::Rectangle {
                    rect,
                    fill: Some(color.with_alpha(style.fill_alpha)),
                    stroke: color,
                    stroke_width: style.stroke_width,
                    style: StrokeStyle::Solid,
                },
            );
            frame.push(
                target.clone(),
                Primitive::Circle {
                    center: rect.center(),
                    radius: style.badge_radius,
                    fill: Some(color),
                    stroke: Color::WHITE,
                    stroke_width: style.stroke_width / 2.0,
                },
            );
            frame.push(
                target,
                Primitive::Label {
                    center: rect.center(),
                    text: annotation.badge_text().to_string(),
                    color: style.badge_text_color,
                    size: style.label_size,
                },
            );
        }

        for marker in markers_on_page(input.markers, page) {
            let position = match input.dragged_marker {
                Some((id, position)) if *id == marker.marker_id => position,
                _ => marker.position,
            };
            let tip = mapper.project(position);
            let target = OverlayTarget::Marker(marker.marker_id.clone());

            frame.push(
                target.clone(),
                Primitive::Pin {
                    tip,
                    radius: style.marker_radius,
                    fill: style.marker_color,
                    outline: style.marker_outline,
                },
            );
            if !marker.label.is_empty() {
                frame.push(
                    target,
                    Primitive::Label {
                        center: ScreenPoint::new(tip.x, tip.y + style.marker_radius + style.label_size),
                        text: marker.label.clone(),
                        color: style.marker_color,
                        size: style.label_size,
                    },
                );
            }
        }

        if let Some(draft) = input.draft {
            frame.push(
                OverlayTarget::Draft,
                Primitive::Rectangle {
                    rect: mapper.project_rect(&draft.rect()),
                    fill: None,
                    stroke: style.draft_color,
                    stroke_width: style.stroke_width,
                    style: StrokeStyle::Dashed {
                        dash: style.draft_dash,
                        gap: style.draft_dash / 2.0,
                    },
                },
            );
        }

        frame
    }
}

/// Marker whose glyph lies within `radius_px` of `point` on the viewed page
///
/// The radius is in screen pixels, so the hit area does not grow with zoom.
/// The closest marker wins; ties go to the one supplied last.
pub fn hit_marker<'a>(
    view: &ViewState,
    page_size: PageDimensions,
    markers: &'a [Marker],
    point: ScreenPoint,
    radius_px: f32,
) -> Option<&'a Marker> {
    let mapper = CoordinateMapper::new(view, page_size);
    let mut best: Option<(&Marker, f32)> = None;

    for marker in markers_on_page(markers, view.current_page) {
        let distance = mapper.project(marker.position).distance_to(&point);
        if distance > radius_px {
            continue;
        }
        if best.map_or(true, |(_, d)| distance <= d) {
            best = Some((marker, distance));
        }
    }

    best.map(|(marker, _)| marker)
}

/// Annotation whose rectangle or badge contains `point` on the viewed page
///
/// Later annotations are drawn on top, so the last match wins.
pub fn hit_annotation<'a>(
    view: &ViewState,
    page_size: PageDimensions,
    annotations: &'a [Annotation],
    point: ScreenPoint,
    badge_radius_px: f32,
) -> Option<&'a Annotation> {
    let mapper = CoordinateMapper::new(view, page_size);

    annotations_on_page(annotations, view.current_page)
        .filter(|annotation| {
            let rect = mapper.project_rect(&annotation.rect.clamped_to_page());
            rect.contains(&point) || rect.center().distance_to(&point) <= badge_radius_px
        })
        .last()
}
