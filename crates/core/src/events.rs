//! Domain events emitted to the caller
//!
//! The caller persists whatever these describe and feeds the updated anchor
//! lists back in; the engine never creates or stores anchors itself.

use crate::annotation::{AnchorId, MarkerId};
use crate::geometry::{NormalizedPoint, NormalizedRect};
use serde::{Deserialize, Serialize};

/// Tagged by `type`, using the same names as [`ViewerEvent::kind`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    /// A rectangle draw gesture finished above the size threshold
    DrawCommitted {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        page: u32,
    },

    /// A click in marker-place mode; the caller mints the marker id
    MarkerPlaceRequested { x: f32, y: f32, page: u32 },

    /// An existing marker was dragged to a new position
    MarkerMoved { marker_id: MarkerId, x: f32, y: f32 },

    /// A marker was clicked without moving it
    MarkerActivated { marker_id: MarkerId },

    /// An annotation rectangle or its badge was clicked
    AnnotationActivated { anchor_id: AnchorId },
}

impl ViewerEvent {
    pub fn draw_committed(rect: NormalizedRect, page: u32) -> Self {
        ViewerEvent::DrawCommitted {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            page,
        }
    }

    pub fn marker_place_requested(point: NormalizedPoint, page: u32) -> Self {
        ViewerEvent::MarkerPlaceRequested {
            x: point.x,
            y: point.y,
            page,
        }
    }

    pub fn marker_moved(marker_id: MarkerId, point: NormalizedPoint) -> Self {
        ViewerEvent::MarkerMoved {
            marker_id,
            x: point.x,
            y: point.y,
        }
    }

    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ViewerEvent::DrawCommitted { .. } => "draw_committed",
            ViewerEvent::MarkerPlaceRequested { .. } => "marker_place_requested",
            ViewerEvent::MarkerMoved { .. } => "marker_moved",
            ViewerEvent::MarkerActivated { .. } => "marker_activated",
            ViewerEvent::AnnotationActivated { .. } => "annotation_activated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_committed_carries_rect_fields() {
        let event = ViewerEvent::draw_committed(NormalizedRect::new(0.5, 0.5, 0.15, 0.1), 1);
        assert_eq!(
            event,
            ViewerEvent::DrawCommitted {
                x: 0.5,
                y: 0.5,
                width: 0.15,
                height: 0.1,
                page: 1
            }
        );
        assert_eq!(event.kind(), "draw_committed");
    }

    #[test]
    fn test_marker_moved_constructor() {
        let event = ViewerEvent::marker_moved(MarkerId::new("m"), NormalizedPoint::new(0.3, 0.7));
        assert!(matches!(
            event,
            ViewerEvent::MarkerMoved { ref marker_id, x, y } if marker_id.as_str() == "m" && x == 0.3 && y == 0.7
        ));
    }

    #[test]
    fn test_events_serialize_with_kind_tag() {
        let event = ViewerEvent::MarkerActivated {
            marker_id: MarkerId::new("m1"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["marker_id"], "m1");

        let placed = ViewerEvent::marker_place_requested(NormalizedPoint::new(0.5, 0.25), 3);
        let text = serde_json::to_string(&placed).unwrap();
        assert_eq!(serde_json::from_str::<ViewerEvent>(&text).unwrap(), placed);
    }
}
