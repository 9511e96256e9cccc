//! Batch report rendering
//!
//! Rasterizes every page of a document once at the configured export scale
//! and burns the page's anchors into the pixels. A page that fails to
//! rasterize is recorded as skipped and the export moves on.

use crate::overlay::{AnnotationOverlay, OverlayInput, OverlayStyle};
use crate::paint::paint_frame;
use blueprint_core::{
    annotations_on_page, markers_on_page, Annotation, EngineConfig, Marker, PageDimensions,
    ViewState,
};
use blueprint_render::{rasterize_blocking, DocumentHandle, DocumentId, RasterError, RgbaImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Error types for report output
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image encode error: {0}")]
    Image(#[from] image::ImageError),
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportPageStatus {
    Rendered,
    Skipped(RasterError),
}

#[derive(Debug, Clone)]
pub struct ReportPage {
    /// Page number (1-based)
    pub page: u32,
    pub status: ReportPageStatus,
    /// Burned-in raster; `None` for skipped pages
    pub image: Option<RgbaImage>,
    pub annotations: usize,
    pub markers: usize,
}

impl ReportPage {
    pub fn is_rendered(&self) -> bool {
        self.status == ReportPageStatus::Rendered
    }

    pub fn file_name(&self) -> String {
        format!("page-{}.png", self.page)
    }
}

/// Result of one batch export
#[derive(Debug, Clone)]
pub struct Report {
    pub document: DocumentId,
    pub scale: f32,
    pub pages: Vec<ReportPage>,
}

impl Report {
    pub fn rendered_count(&self) -> usize {
        self.pages.iter().filter(|page| page.is_rendered()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.pages.len() - self.rendered_count()
    }

    pub fn page(&self, page: u32) -> Option<&ReportPage> {
        self.pages.iter().find(|entry| entry.page == page)
    }

    /// Manifest rows without written files
    pub fn manifest(&self) -> ReportManifest {
        ReportManifest {
            rows: self.pages.iter().map(|page| ManifestRow::new(page, None)).collect(),
        }
    }

    /// Write `page-N.png` for every rendered page plus `manifest.csv` into `dir`
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> ReportResult<ReportManifest> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut rows = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let file = match &page.image {
                Some(image) => {
                    let name = page.file_name();
                    image.save(dir.join(&name))?;
                    Some(name)
                }
                None => None,
            };
            rows.push(ManifestRow::new(page, file));
        }

        let manifest = ReportManifest { rows };
        manifest.save(dir.join(ReportManifest::FILE_NAME))?;
        tracing::info!(
            dir = %dir.display(),
            rendered = self.rendered_count(),
            skipped = self.skipped_count(),
            "report written"
        );
        Ok(manifest)
    }
}

/// One manifest line
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    pub page: u32,
    pub status: &'static str,
    pub annotations: usize,
    pub markers: usize,
    pub file: Option<String>,
    pub error: Option<String>,
}

impl ManifestRow {
    fn new(page: &ReportPage, file: Option<String>) -> Self {
        let (status, error) = match &page.status {
            ReportPageStatus::Rendered => ("rendered", None),
            ReportPageStatus::Skipped(error) => ("skipped", Some(error.to_string())),
        };
        Self {
            page: page.page,
            status,
            annotations: page.annotations,
            markers: page.markers,
            file,
            error,
        }
    }
}

/// Per-page summary of an export, written as CSV
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportManifest {
    pub rows: Vec<ManifestRow>,
}

impl ReportManifest {
    pub const FILE_NAME: &'static str = "manifest.csv";

    /// CSV columns: page, status, annotations, markers, file, error
    pub fn write_csv<W: Write>(&self, writer: W) -> ReportResult<()> {
        let mut csv_writer = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
        csv_writer.write_record(["page", "status", "annotations", "markers", "file", "error"])?;

        for row in &self.rows {
            csv_writer.write_record([
                row.page.to_string(),
                row.status.to_string(),
                row.annotations.to_string(),
                row.markers.to_string(),
                row.file.clone().unwrap_or_default(),
                row.error.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> ReportResult<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ReportResult<PathBuf> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::File::create(&path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        Ok(path)
    }
}

/// Renders every page of a document with its anchors burned in
#[derive(Debug, Clone)]
pub struct MultiPageReportRenderer {
    config: EngineConfig,
    style: OverlayStyle,
}

impl MultiPageReportRenderer {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            style: OverlayStyle::default(),
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    /// Zoom the overlay is laid out at
    pub fn export_scale(&self) -> f32 {
        self.config.export_scale
    }

    pub fn render(
        &self,
        document: &dyn DocumentHandle,
        annotations: &[Annotation],
        markers: &[Marker],
    ) -> Report {
        let page_count = document.page_count();
        tracing::info!(document = %document.id(), page_count, scale = self.export_scale(), "rendering report");

        let pages = (1..=page_count)
            .map(|page| {
                let (status, image) = match self.render_page(document, page, annotations, markers) {
                    Ok(image) => (ReportPageStatus::Rendered, Some(image)),
                    Err(error) => {
                        tracing::warn!(document = %document.id(), page, %error, "skipping report page");
                        (ReportPageStatus::Skipped(error), None)
                    }
                };
                ReportPage {
                    page,
                    status,
                    image,
                    annotations: annotations_on_page(annotations, page).count(),
                    markers: markers_on_page(markers, page).count(),
                }
            })
            .collect();

        Report {
            document: document.id(),
            scale: self.export_scale(),
            pages,
        }
    }

    /// Rasterize `page` and paint its anchors over it
    pub fn render_page(
        &self,
        document: &dyn DocumentHandle,
        page: u32,
        annotations: &[Annotation],
        markers: &[Marker],
    ) -> Result<RgbaImage, RasterError> {
        let zoom = self.export_scale();
        let size = document.page_size(page)?;
        let dims = PageDimensions::new(
            size.width_pt * self.config.base_scale,
            size.height_pt * self.config.base_scale,
        );

        let bitmap = rasterize_blocking(document, page, self.config.base_scale * zoom)?;
        let mut image = Arc::try_unwrap(bitmap.image).unwrap_or_else(|shared| (*shared).clone());

        let mut view = ViewState::for_page(page);
        view.zoom = zoom;
        let overlay = AnnotationOverlay::new(self.style.clone().scaled(zoom));
        let frame = overlay.render(&OverlayInput::new(&view, dims, annotations, markers));
        paint_frame(&mut image, &frame);

        Ok(image)
    }
}
