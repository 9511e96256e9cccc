//! Anchor records supplied by the caller
//!
//! Annotations (rectangles) and markers (points) are owned and persisted by
//! the caller. The engine receives fresh copies on every update and never
//! mutates them; every render pass re-derives overlay geometry from the latest
//! records. All coordinates are normalized page space (see [`crate::geometry`]).

use crate::geometry::{NormalizedPoint, NormalizedRect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-assigned identifier of a rectangle anchor (usually a task id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub String);

impl AnchorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-assigned identifier of a point marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-defined status string, carried through unchanged
///
/// The engine only interprets it for display, through [`StatusPalette`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusTag(pub String);

impl StatusTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Convert to normalized RGBA values (0.0 to 1.0)
    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

impl Color {
    pub const RED: Color = Color::rgb(220, 38, 38);
    pub const ORANGE: Color = Color::rgb(234, 88, 12);
    pub const GREEN: Color = Color::rgb(22, 163, 74);
    pub const BLUE: Color = Color::rgb(37, 99, 235);
    pub const GRAY: Color = Color::rgb(107, 114, 128);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
}

/// Known task states a status tag can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Open,
    InProgress,
    Completed,
    Blocked,
    /// Any tag the palette has no entry for
    Unknown,
}

impl StatusKind {
    /// Resolve a caller tag; matching ignores case, spaces, dashes and underscores
    pub fn from_tag(tag: &StatusTag) -> Self {
        let key: String = tag
            .as_str()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "open" | "new" | "todo" => StatusKind::Open,
            "inprogress" | "active" | "started" => StatusKind::InProgress,
            "done" | "completed" | "closed" | "resolved" => StatusKind::Completed,
            "blocked" | "onhold" => StatusKind::Blocked,
            _ => StatusKind::Unknown,
        }
    }
}

/// Status-to-color lookup with an explicit default for unknown tags
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPalette {
    pub open: Color,
    pub in_progress: Color,
    pub completed: Color,
    pub blocked: Color,
    pub unknown: Color,
}

impl StatusPalette {
    pub fn color(&self, kind: StatusKind) -> Color {
        match kind {
            StatusKind::Open => self.open,
            StatusKind::InProgress => self.in_progress,
            StatusKind::Completed => self.completed,
            StatusKind::Blocked => self.blocked,
            StatusKind::Unknown => self.unknown,
        }
    }

    pub fn color_for(&self, tag: &StatusTag) -> Color {
        self.color(StatusKind::from_tag(tag))
    }
}

impl Default for StatusPalette {
    fn default() -> Self {
        Self {
            open: Color::RED,
            in_progress: Color::ORANGE,
            completed: Color::GREEN,
            blocked: Color::BLUE,
            unknown: Color::GRAY,
        }
    }
}

/// Rectangle anchor tied to one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub anchor_id: AnchorId,

    /// Page number (1-based)
    pub page: u32,

    #[serde(flatten)]
    pub rect: NormalizedRect,

    #[serde(default)]
    pub status: StatusTag,

    /// Badge text; falls back to the anchor id
    #[serde(default)]
    pub label: Option<String>,
}

impl Annotation {
    pub fn new(anchor_id: impl Into<String>, page: u32, rect: NormalizedRect) -> Self {
        Self {
            anchor_id: AnchorId::new(anchor_id),
            page,
            rect,
            status: StatusTag::default(),
            label: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = StatusTag::new(status);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Text shown inside the badge
    pub fn badge_text(&self) -> &str {
        self.label.as_deref().unwrap_or(self.anchor_id.as_str())
    }

    pub fn is_on_page(&self, page: u32) -> bool {
        self.page == page
    }
}

/// Point anchor tied to one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub marker_id: MarkerId,

    /// Page number (1-based)
    pub page: u32,

    #[serde(flatten)]
    pub position: NormalizedPoint,

    #[serde(default)]
    pub label: String,
}

impl Marker {
    pub fn new(marker_id: impl Into<String>, page: u32, position: NormalizedPoint) -> Self {
        Self {
            marker_id: MarkerId::new(marker_id),
            page,
            position,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_on_page(&self, page: u32) -> bool {
        self.page == page
    }
}

/// Annotations on `page`, in caller order
pub fn annotations_on_page(annotations: &[Annotation], page: u32) -> impl Iterator<Item = &Annotation> {
    annotations.iter().filter(move |a| a.is_on_page(page))
}

/// Markers on `page`, in caller order
pub fn markers_on_page(markers: &[Marker], page: u32) -> impl Iterator<Item = &Marker> {
    markers.iter().filter(move |m| m.is_on_page(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_normalization() {
        let color = Color::rgb(255, 128, 0);
        let (r, g, b, a) = color.to_normalized();
        assert!((r - 1.0).abs() < 0.001);
        assert!((g - 0.502).abs() < 0.01);
        assert!((b - 0.0).abs() < 0.001);
        assert!((a - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_status_kind_aliases() {
        assert_eq!(StatusKind::from_tag(&StatusTag::new("open")), StatusKind::Open);
        assert_eq!(
            StatusKind::from_tag(&StatusTag::new("In Progress")),
            StatusKind::InProgress
        );
        assert_eq!(
            StatusKind::from_tag(&StatusTag::new("in_progress")),
            StatusKind::InProgress
        );
        assert_eq!(StatusKind::from_tag(&StatusTag::new("DONE")), StatusKind::Completed);
        assert_eq!(StatusKind::from_tag(&StatusTag::new("on-hold")), StatusKind::Blocked);
        assert_eq!(StatusKind::from_tag(&StatusTag::new("")), StatusKind::Unknown);
        assert_eq!(StatusKind::from_tag(&StatusTag::new("wat")), StatusKind::Unknown);
    }

    #[test]
    fn test_palette_unknown_falls_back_to_default() {
        let palette = StatusPalette::default();
        assert_eq!(palette.color_for(&StatusTag::new("open")), Color::RED);
        assert_eq!(palette.color_for(&StatusTag::new("review")), palette.unknown);
    }

    #[test]
    fn test_badge_text_falls_back_to_id() {
        let annotation = Annotation::new("T-17", 1, NormalizedRect::new(0.1, 0.1, 0.2, 0.2));
        assert_eq!(annotation.badge_text(), "T-17");

        let labelled = annotation.with_label("17");
        assert_eq!(labelled.badge_text(), "17");
    }

    #[test]
    fn test_page_filters() {
        let annotations = vec![
            Annotation::new("a", 1, NormalizedRect::new(0.1, 0.1, 0.1, 0.1)),
            Annotation::new("b", 2, NormalizedRect::new(0.1, 0.1, 0.1, 0.1)),
        ];
        let markers = vec![
            Marker::new("m1", 2, NormalizedPoint::new(0.5, 0.5)),
            Marker::new("m2", 2, NormalizedPoint::new(0.6, 0.5)),
        ];

        let page_one: Vec<_> = annotations_on_page(&annotations, 1).collect();
        assert_eq!(page_one.len(), 1);
        assert_eq!(page_one[0].anchor_id.as_str(), "a");
        assert_eq!(markers_on_page(&markers, 1).count(), 0);
        assert_eq!(markers_on_page(&markers, 2).count(), 2);
    }

    #[test]
    fn test_records_deserialize_from_flat_json() {
        let annotation: Annotation = serde_json::from_str(
            r#"{"anchor_id":"42","page":1,"x":0.2,"y":0.2,"width":0.1,"height":0.1,"status":"open"}"#,
        )
        .unwrap();
        assert_eq!(annotation.anchor_id, AnchorId::new("42"));
        assert_eq!(annotation.rect, NormalizedRect::new(0.2, 0.2, 0.1, 0.1));
        assert_eq!(annotation.status, StatusTag::new("open"));
        assert_eq!(annotation.label, None);

        let marker: Marker =
            serde_json::from_str(r#"{"marker_id":"m-1","page":3,"x":0.5,"y":0.25}"#).unwrap();
        assert_eq!(marker.page, 3);
        assert_eq!(marker.position, NormalizedPoint::new(0.5, 0.25));
        assert!(marker.label.is_empty());
    }
}
