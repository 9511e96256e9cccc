//! Blueprint UI Library
//!
//! Pointer gestures, the annotation overlay, the interactive viewer and the
//! batch report renderer. Nothing here talks to a windowing toolkit: hosts
//! feed pointer events in and paint the returned frames.

pub mod interaction;
pub mod overlay;
pub mod paint;
pub mod report;
pub mod scene;
pub mod viewer;

pub use interaction::{
    DrawState, GestureState, GestureThresholds, InteractionController, Surface, ToolMode,
};
pub use overlay::{hit_annotation, hit_marker, AnnotationOverlay, OverlayInput, OverlayStyle};
pub use paint::{paint_frame, paint_primitive};
pub use report::{
    ManifestRow, MultiPageReportRenderer, Report, ReportError, ReportManifest, ReportPage,
    ReportPageStatus, ReportResult,
};
pub use scene::{OverlayFrame, OverlayItem, OverlayTarget, Primitive, StrokeStyle};
pub use viewer::{
    BlueprintAnnotationViewer, DocumentLoadError, DocumentLoader, DocumentStatus, EventListener,
    PageLayer, PageStatus, ViewerFrame,
};
