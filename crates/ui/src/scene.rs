//! Screen-space drawing primitives
//!
//! The overlay and the viewer describe what to draw as flat lists of
//! primitives; a host toolkit (or the report painter) turns them into pixels.
//! Every primitive optionally names the anchor it belongs to so callers can
//! tell overlay items apart without re-deriving geometry.

use blueprint_core::{AnchorId, Color, MarkerId, ScreenPoint, ScreenRect};

/// Outline style of a rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeStyle {
    Solid,
    Dashed { dash: f32, gap: f32 },
}

/// Visual primitive types that can be rendered
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Axis-aligned rectangle with optional fill
    Rectangle {
        rect: ScreenRect,
        fill: Option<Color>,
        stroke: Color,
        stroke_width: f32,
        style: StrokeStyle,
    },
    /// Circle (filled when `fill` is set)
    Circle {
        center: ScreenPoint,
        radius: f32,
        fill: Option<Color>,
        stroke: Color,
        stroke_width: f32,
    },
    /// Text centered on `center`
    Label {
        center: ScreenPoint,
        text: String,
        color: Color,
        size: f32,
    },
    /// Map-pin marker glyph whose tip sits on `tip`
    Pin {
        tip: ScreenPoint,
        radius: f32,
        fill: Color,
        outline: Color,
    },
}

/// What an overlay item represents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverlayTarget {
    Annotation(AnchorId),
    Marker(MarkerId),
    /// In-progress rectangle of an active draw gesture
    Draft,
}

/// Primitive tagged with the anchor it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub target: OverlayTarget,
    pub primitive: Primitive,
}

impl OverlayItem {
    pub fn new(target: OverlayTarget, primitive: Primitive) -> Self {
        Self { target, primitive }
    }
}

/// Overlay for one page under one view state, in paint order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayFrame {
    pub page: u32,
    pub items: Vec<OverlayItem>,
}

impl OverlayFrame {
    pub fn new(page: u32) -> Self {
        Self {
            page,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, target: OverlayTarget, primitive: Primitive) {
        self.items.push(OverlayItem::new(target, primitive));
    }

    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.items.iter().map(|item| &item.primitive)
    }

    /// Items derived from `target`
    pub fn items_for<'a>(&'a self, target: &'a OverlayTarget) -> impl Iterator<Item = &'a OverlayItem> {
        self.items.iter().filter(move |item| &item.target == target)
    }

    pub fn contains_annotation(&self, anchor_id: &AnchorId) -> bool {
        self.items
            .iter()
            .any(|item| matches!(&item.target, OverlayTarget::Annotation(id) if id == anchor_id))
    }

    pub fn contains_marker(&self, marker_id: &MarkerId) -> bool {
        self.items
            .iter()
            .any(|item| matches!(&item.target, OverlayTarget::Marker(id) if id == marker_id))
    }

    pub fn draft(&self) -> Option<&Primitive> {
        self.items
            .iter()
            .find(|item| item.target == OverlayTarget::Draft)
            .map(|item| &item.primitive)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
