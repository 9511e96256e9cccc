//! Blueprint Core Library
//!
//! Coordinate model, anchors and view state for the blueprint annotation engine.

pub mod annotation;
pub mod config;
pub mod events;
pub mod geometry;
pub mod mapper;
pub mod view;

pub use annotation::{
    annotations_on_page, markers_on_page, AnchorId, Annotation, Color, Marker, MarkerId,
    StatusKind, StatusPalette, StatusTag,
};
pub use config::{ConfigError, EngineConfig};
pub use events::ViewerEvent;
pub use geometry::{
    NormalizedPoint, NormalizedRect, PageDimensions, ScreenPoint, ScreenRect, BOUNDS_EPSILON,
};
pub use mapper::{CoordinateMapper, Projection};
pub use view::{
    PageTransform, ViewState, ZoomLimits, ZoomPanController, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP,
};
