//! Interactive single-document viewer
//!
//! Composes view state, page rasterization, gesture handling and the overlay
//! into one surface. The viewer owns only ephemeral state; anchors come in
//! through [`BlueprintAnnotationViewer::set_annotations`] and
//! [`BlueprintAnnotationViewer::set_markers`] and leave as [`ViewerEvent`]s.
//!
//! View state resets whenever the page or the document changes, and never
//! when a raster completes.

use crate::interaction::{InteractionController, GestureThresholds, Surface, ToolMode};
use crate::overlay::{AnnotationOverlay, OverlayInput, OverlayStyle};
use crate::scene::OverlayFrame;
use blueprint_core::{
    Annotation, ConfigError, CoordinateMapper, EngineConfig, Marker, PageDimensions, ScreenPoint,
    ScreenRect, ViewState, ViewerEvent, ZoomLimits, ZoomPanController,
};
use blueprint_render::{
    Bitmap, DocumentError, PageRasterizer, PageSize, RasterCompletion, RasterError, RasterKey,
    SharedDocument,
};
use std::time::{Duration, Instant};

/// Produces the document on first open and on every retry
pub type DocumentLoader = Box<dyn FnMut() -> Result<SharedDocument, DocumentError>>;

/// Receives every event the viewer emits
pub type EventListener = Box<dyn FnMut(&ViewerEvent)>;

/// Terminal document failure; only a retry leaves this state
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("document failed to load: {message}")]
pub struct DocumentLoadError {
    pub message: String,
}

impl DocumentLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<DocumentError> for DocumentLoadError {
    fn from(error: DocumentError) -> Self {
        Self::new(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentStatus {
    /// Nothing opened yet, or torn down
    Empty,
    Ready,
    Failed(DocumentLoadError),
}

/// Raster state of the viewed page
#[derive(Debug, Clone, PartialEq)]
pub enum PageStatus {
    /// Waiting for the first bitmap
    Pending,
    Ready,
    /// Page failed to measure or rasterize and is shown as a placeholder
    Unavailable(RasterError),
}

/// What sits under the overlay
#[derive(Debug, Clone)]
pub enum PageLayer {
    /// Bitmap stretched over `rect`; may be of lower resolution than the view
    Bitmap { bitmap: Bitmap, rect: ScreenRect },
    Loading { rect: ScreenRect },
    Placeholder { rect: Option<ScreenRect>, message: String },
    Failed { message: String },
    Empty,
}

/// Everything a host needs to paint one frame
#[derive(Debug, Clone)]
pub struct ViewerFrame {
    pub view: ViewState,
    pub layer: PageLayer,
    pub overlay: OverlayFrame,
}

pub struct BlueprintAnnotationViewer {
    config: EngineConfig,
    view: ZoomPanController,
    interaction: InteractionController,
    overlay: AnnotationOverlay,
    rasterizer: PageRasterizer,

    document: Option<SharedDocument>,
    load_error: Option<DocumentLoadError>,
    loader: Option<DocumentLoader>,
    initial_page: u32,

    /// Size of the viewed page in points
    page_size: Option<PageSize>,
    bitmap: Option<Bitmap>,
    raster_error: Option<RasterError>,

    annotations: Vec<Annotation>,
    markers: Vec<Marker>,
    listener: Option<EventListener>,
    torn_down: bool,
}

impl BlueprintAnnotationViewer {
    /// Build a viewer; rejects configs that fail [`EngineConfig::validate`]
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            view: ZoomPanController::new(ZoomLimits::from(&config)),
            interaction: InteractionController::new(GestureThresholds::from(&config)),
            overlay: AnnotationOverlay::default(),
            rasterizer: PageRasterizer::new(),
            config,
            document: None,
            load_error: None,
            loader: None,
            initial_page: 1,
            page_size: None,
            bitmap: None,
            raster_error: None,
            annotations: Vec::new(),
            markers: Vec::new(),
            listener: None,
            torn_down: false,
        })
    }

    pub fn with_overlay_style(mut self, style: OverlayStyle) -> Self {
        self.interaction = InteractionController::new(GestureThresholds {
            badge_radius_px: style.badge_radius,
            ..GestureThresholds::from(&self.config)
        });
        self.overlay = AnnotationOverlay::new(style);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register the event listener, replacing any previous one
    pub fn set_listener(&mut self, listener: impl FnMut(&ViewerEvent) + 'static) {
        if self.torn_down {
            return;
        }
        self.listener = Some(Box::new(listener));
    }

    /// Callback run off the UI thread when a raster is ready to be polled
    pub fn set_raster_notifier(&mut self, notifier: impl Fn(RasterKey) + Send + Sync + 'static) {
        self.rasterizer.set_notifier(notifier);
    }

    // ---- Document lifecycle ----

    /// Show `document`, starting at `initial_page` (clamped to the page range)
    ///
    /// Rasters of the previous document are cancelled and the view resets.
    pub fn set_document(&mut self, document: SharedDocument, initial_page: u32) {
        if self.torn_down {
            return;
        }
        self.release_document();

        let page_count = document.page_count();
        if page_count == 0 {
            self.fail(DocumentLoadError::new("document has no pages"));
            return;
        }

        let page = initial_page.clamp(1, page_count);
        tracing::info!(document = %document.id(), page_count, page, "document opened in viewer");
        self.document = Some(document);
        self.load_error = None;
        self.view.set_page(page);
        self.load_page();
    }

    /// Open through `loader`; on failure the viewer waits for [`Self::retry`]
    pub fn open_with(
        &mut self,
        loader: impl FnMut() -> Result<SharedDocument, DocumentError> + 'static,
        initial_page: u32,
    ) {
        if self.torn_down {
            return;
        }
        self.loader = Some(Box::new(loader));
        self.initial_page = initial_page;
        self.load();
    }

    /// Re-run the loader after a failure; returns whether the document is now ready
    pub fn retry(&mut self) -> bool {
        if self.torn_down || self.load_error.is_none() || self.loader.is_none() {
            return false;
        }
        tracing::info!("retrying document load");
        self.load();
        self.document_status() == DocumentStatus::Ready
    }

    fn load(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        match loader() {
            Ok(document) => {
                let page = self.initial_page;
                self.set_document(document, page);
            }
            Err(error) => {
                self.release_document();
                self.fail(error.into());
            }
        }
    }

    fn fail(&mut self, error: DocumentLoadError) {
        tracing::warn!(%error, "document unavailable");
        self.load_error = Some(error);
        self.interaction.pointer_cancel();
    }

    fn release_document(&mut self) {
        if let Some(previous) = self.document.take() {
            self.rasterizer.cancel_document(previous.id());
        }
        self.page_size = None;
        self.bitmap = None;
        self.raster_error = None;
        self.interaction.pointer_cancel();
    }

    /// Cancel all rasters and stop reacting to input for good
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let cancelled = self.rasterizer.cancel_all();
        tracing::debug!(cancelled, "viewer torn down");
        self.interaction.pointer_cancel();
        self.listener = None;
        self.loader = None;
        self.document = None;
        self.bitmap = None;
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn document(&self) -> Option<&SharedDocument> {
        self.document.as_ref()
    }

    pub fn document_status(&self) -> DocumentStatus {
        match (&self.load_error, &self.document) {
            (Some(error), _) => DocumentStatus::Failed(error.clone()),
            (None, Some(_)) => DocumentStatus::Ready,
            (None, None) => DocumentStatus::Empty,
        }
    }

    // ---- Anchors ----

    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
    }

    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    // ---- Pages ----

    pub fn current_page(&self) -> u32 {
        self.view.state().current_page
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |document| document.page_count())
    }

    /// Switch to `page` (clamped); returns whether the page changed
    pub fn go_to_page(&mut self, page: u32) -> bool {
        let Some(document) = self.active_document() else {
            return false;
        };
        let page = page.clamp(1, document.page_count());
        let previous = self.current_page();
        if page == previous {
            return false;
        }

        self.rasterizer.cancel_page(&RasterKey::new(document.id(), previous));
        self.page_size = None;
        self.bitmap = None;
        self.raster_error = None;
        self.interaction.pointer_cancel();
        self.view.set_page(page);
        tracing::debug!(from = previous, to = page, "page changed");
        self.load_page();
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page().saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.current_page().saturating_sub(1).max(1))
    }

    fn active_document(&self) -> Option<SharedDocument> {
        if self.torn_down || self.load_error.is_some() {
            return None;
        }
        self.document.clone()
    }

    fn load_page(&mut self) {
        let Some(document) = self.active_document() else {
            return;
        };
        let page = self.current_page();
        match document.page_size(page) {
            Ok(size) => {
                self.page_size = Some(size);
                self.request_raster(&document);
            }
            Err(error) => {
                tracing::warn!(document = %document.id(), page, %error, "page unavailable");
                self.raster_error = Some(error);
            }
        }
    }

    /// Raster scale wanted for the current zoom
    ///
    /// Zoom is rounded up to a step multiple so small zoom changes reuse the
    /// current raster.
    pub fn desired_scale(&self) -> f32 {
        let zoom = self.view.zoom();
        let step = self.config.zoom_step;
        let render_zoom = if step > 0.0 {
            (zoom / step).ceil() * step
        } else {
            zoom
        };
        self.config.base_scale * self.config.device_pixel_ratio * render_zoom
    }

    fn request_raster(&mut self, document: &SharedDocument) {
        let scale = self.desired_scale();
        self.rasterizer.request(document, self.current_page(), scale);
    }

    /// Request a sharper raster when the view outgrew the current one
    fn maybe_upgrade(&mut self) {
        let Some(document) = self.active_document() else {
            return;
        };
        if self.page_size.is_none() || self.raster_error.is_some() {
            return;
        }
        let key = RasterKey::new(document.id(), self.current_page());
        let pending = self.rasterizer.pending_scale(&key);
        let shown = self.bitmap.as_ref().map(|bitmap| bitmap.scale);
        let best = pending.into_iter().chain(shown).fold(0.0_f32, f32::max);

        let desired = self.desired_scale();
        if best < desired {
            tracing::debug!(page = key.page, from = best, to = desired, "requesting sharper raster");
            self.request_raster(&document);
        }
    }

    /// Swap in finished rasters for the viewed page; returns whether anything changed
    pub fn poll(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        let completions = self.rasterizer.poll();
        self.apply(completions)
    }

    /// Block until a raster for the viewed page lands or `timeout` passes
    pub fn wait_for_raster(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.torn_down {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let completions = self.rasterizer.wait(remaining);
            if self.apply(completions) {
                return true;
            }
            if remaining.is_zero() || self.rasterizer.pending_count() == 0 {
                break;
            }
        }
        false
    }

    fn apply(&mut self, completions: Vec<RasterCompletion>) -> bool {
        let Some(document) = self.active_document() else {
            return false;
        };
        let current = RasterKey::new(document.id(), self.current_page());
        let mut changed = false;

        for completion in completions {
            if completion.key != current {
                tracing::debug!(
                    document = %completion.key.document,
                    page = completion.key.page,
                    "ignoring raster for inactive page"
                );
                continue;
            }
            match completion.result {
                Ok(bitmap) => {
                    self.bitmap = Some(bitmap);
                    self.raster_error = None;
                    changed = true;
                }
                Err(error) if self.bitmap.is_some() => {
                    tracing::warn!(page = current.page, %error, "sharper raster failed, keeping current");
                }
                Err(error) => {
                    self.raster_error = Some(error);
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn page_status(&self) -> PageStatus {
        match (&self.raster_error, &self.bitmap) {
            (Some(error), _) => PageStatus::Unavailable(error.clone()),
            (None, Some(_)) => PageStatus::Ready,
            (None, None) => PageStatus::Pending,
        }
    }

    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    pub fn is_raster_pending(&self) -> bool {
        self.document.as_ref().is_some_and(|document| {
            self.rasterizer
                .is_pending(&RasterKey::new(document.id(), self.current_page()))
        })
    }

    /// Layout size of the viewed page at zoom 1
    pub fn page_dimensions(&self) -> Option<PageDimensions> {
        self.page_size.map(|size| {
            PageDimensions::new(
                size.width_pt * self.config.base_scale,
                size.height_pt * self.config.base_scale,
            )
        })
    }

    // ---- View ----

    pub fn view_state(&self) -> &ViewState {
        self.view.state()
    }

    pub fn zoom_in(&mut self) {
        if self.active_document().is_some() {
            self.view.zoom_in();
            self.maybe_upgrade();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.active_document().is_some() {
            self.view.zoom_out();
        }
    }

    pub fn zoom_to(&mut self, zoom: f32) {
        if self.active_document().is_some() {
            self.view.zoom_to(zoom);
            self.maybe_upgrade();
        }
    }

    pub fn reset_view(&mut self) {
        if self.active_document().is_some() {
            self.view.reset_view();
        }
    }

    /// Wheel zoom by `ticks` notches around the pointer
    pub fn wheel(&mut self, ticks: f32, pivot: ScreenPoint) {
        if self.active_document().is_none() || !ticks.is_finite() {
            return;
        }
        self.view.zoom_at(ticks * self.config.wheel_zoom_step, pivot);
        self.maybe_upgrade();
    }

    // ---- Input ----

    pub fn mode(&self) -> ToolMode {
        self.interaction.mode()
    }

    pub fn set_mode(&mut self, mode: ToolMode) {
        self.interaction.set_mode(mode);
    }

    pub fn set_draw_mode(&mut self, enabled: bool) {
        self.interaction.set_draw_mode(enabled);
    }

    pub fn set_marker_place_mode(&mut self, enabled: bool) {
        self.interaction.set_marker_place_mode(enabled);
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    /// Page size when the viewed page accepts pointer input
    fn interactive_page(&self) -> Option<PageDimensions> {
        self.active_document()?;
        if self.raster_error.is_some() {
            return None;
        }
        self.page_dimensions()
    }

    pub fn pointer_down(&mut self, point: ScreenPoint) {
        let Some(page_size) = self.interactive_page() else {
            return;
        };
        let mut surface = Surface {
            view: &mut self.view,
            page_size,
            annotations: &self.annotations,
            markers: &self.markers,
        };
        self.interaction.pointer_down(&mut surface, point);
    }

    pub fn pointer_move(&mut self, point: ScreenPoint) {
        let Some(page_size) = self.interactive_page() else {
            return;
        };
        let mut surface = Surface {
            view: &mut self.view,
            page_size,
            annotations: &self.annotations,
            markers: &self.markers,
        };
        self.interaction.pointer_move(&mut surface, point);
    }

    /// End the gesture; the resulting event goes to the listener and is returned
    pub fn pointer_up(&mut self, point: ScreenPoint) -> Option<ViewerEvent> {
        let Some(page_size) = self.interactive_page() else {
            self.interaction.pointer_cancel();
            return None;
        };
        let mut surface = Surface {
            view: &mut self.view,
            page_size,
            annotations: &self.annotations,
            markers: &self.markers,
        };
        let event = self.interaction.pointer_up(&mut surface, point)?;
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
        Some(event)
    }

    pub fn pointer_cancel(&mut self) {
        self.interaction.pointer_cancel();
    }

    // ---- Output ----

    pub fn render(&self) -> ViewerFrame {
        let view = *self.view.state();
        let mut overlay = OverlayFrame::new(view.current_page);

        let layer = if self.torn_down {
            PageLayer::Empty
        } else if let Some(error) = &self.load_error {
            PageLayer::Failed {
                message: error.to_string(),
            }
        } else if self.document.is_none() {
            PageLayer::Empty
        } else {
            let page_rect = self
                .page_dimensions()
                .map(|dims| CoordinateMapper::new(&view, dims).page_rect());
            match (&self.raster_error, &self.bitmap, page_rect) {
                (Some(error), _, rect) => PageLayer::Placeholder {
                    rect,
                    message: format!("page {} unavailable: {error}", view.current_page),
                },
                (None, Some(bitmap), Some(rect)) => PageLayer::Bitmap {
                    bitmap: bitmap.clone(),
                    rect,
                },
                (None, _, Some(rect)) => PageLayer::Loading { rect },
                (None, _, None) => PageLayer::Empty,
            }
        };

        if let Some(page_size) = self.interactive_page() {
            let input = OverlayInput::new(&view, page_size, &self.annotations, &self.markers)
                .with_draft(self.interaction.draw_state())
                .with_dragged_marker(self.interaction.dragged_marker());
            overlay = self.overlay.render(&input);
        }

        ViewerFrame {
            view,
            layer,
            overlay,
        }
    }
}
