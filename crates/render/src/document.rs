//! Paginated document abstraction
//!
//! A [`DocumentHandle`] is the only way the engine reaches document content:
//! page count, page geometry and a per-page rasterize operation. PDF files
//! and flat images are two implementations of the same trait.

use blueprint_scheduler::CancellationToken;
use image::{ImageBuffer, Rgba};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Largest raster edge a backend will produce, in pixels
pub const MAX_RASTER_EDGE: u32 = 16_384;

/// Process-unique identifier of an opened document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

impl DocumentId {
    /// Allocate a fresh identifier
    pub fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Page size in PDF points (1/72 inch); image pages use one point per pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// US Letter, used when a PDF page carries no usable MediaBox
    pub const LETTER: PageSize = PageSize {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    /// Pixel size of a raster of this page at `scale`
    pub fn raster_dimensions(&self, scale: f32) -> Result<(u32, u32), RasterError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RasterError::InvalidScale(scale));
        }
        let width = (self.width_pt * scale).round().max(1.0);
        let height = (self.height_pt * scale).round().max(1.0);
        if width > MAX_RASTER_EDGE as f32 || height > MAX_RASTER_EDGE as f32 {
            return Err(RasterError::TooLarge {
                width: width as u64,
                height: height as u64,
            });
        }
        Ok((width as u32, height as u32))
    }
}

/// Errors raised while opening a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("encrypted PDFs are not supported")]
    Encrypted,
    #[error("document has no pages")]
    Empty,
    #[error("unrecognized document format")]
    UnsupportedFormat,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Terminal failure state of a single page raster
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("invalid render scale {0}")]
    InvalidScale(f32),
    #[error("raster of {width}x{height} px exceeds the size limit")]
    TooLarge { width: u64, height: u64 },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("rasterization cancelled")]
    Cancelled,
    #[error("rasterizer panicked: {0}")]
    Panicked(String),
}

/// Paginated document the engine can measure and rasterize
///
/// Pages are numbered from 1. Implementations must be shareable across the
/// raster worker threads and must not mutate the underlying document.
pub trait DocumentHandle: Send + Sync {
    fn id(&self) -> DocumentId;

    fn page_count(&self) -> u32;

    fn page_size(&self, page: u32) -> Result<PageSize, RasterError>;

    /// Render `page` at `scale` raster pixels per point
    ///
    /// Long-running backends should check `cancel` and bail out with
    /// [`RasterError::Cancelled`].
    fn rasterize(
        &self,
        page: u32,
        scale: f32,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, RasterError>;

    /// Short backend name for logs and reports
    fn kind(&self) -> &'static str;
}

/// Shared, type-erased handle as passed around by the viewer
pub type SharedDocument = Arc<dyn DocumentHandle>;

/// Look up a 1-based page in a size table
pub(crate) fn page_from_table(sizes: &[PageSize], page: u32) -> Result<PageSize, RasterError> {
    let out_of_range = || RasterError::PageOutOfRange {
        page,
        page_count: sizes.len() as u32,
    };
    if page == 0 {
        return Err(out_of_range());
    }
    sizes.get(page as usize - 1).copied().ok_or_else(out_of_range)
}

/// A rendered page, ready to be swapped into a view
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub document: DocumentId,
    pub page: u32,
    /// Raster pixels per page point
    pub scale: f32,
    pub image: Arc<RgbaImage>,
}

impl Bitmap {
    pub fn new(document: DocumentId, page: u32, scale: f32, image: RgbaImage) -> Self {
        Self {
            document,
            page,
            scale,
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Open a document from disk, picking the backend by content
///
/// PDF files go to the pdfium backend when the `pdfium` feature is enabled
/// and the library binds, otherwise to the lopdf geometry backend. Anything
/// else is tried as a flat image.
pub fn open_path(path: impl AsRef<Path>) -> Result<SharedDocument, DocumentError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let document = open_bytes(bytes)?;
    tracing::info!(
        path = %path.display(),
        id = %document.id(),
        backend = document.kind(),
        pages = document.page_count(),
        "opened document"
    );
    Ok(document)
}

/// Open a document from memory, picking the backend by content
pub fn open_bytes(bytes: Vec<u8>) -> Result<SharedDocument, DocumentError> {
    if is_pdf(&bytes) {
        #[cfg(feature = "pdfium")]
        {
            match crate::pdfium::PdfiumDocument::from_bytes(bytes.clone()) {
                Ok(document) => return Ok(Arc::new(document)),
                Err(err) => {
                    tracing::warn!(error = %err, "pdfium unavailable, using geometry backend");
                }
            }
        }
        return Ok(Arc::new(crate::pdf::PdfDocument::from_bytes(bytes)?));
    }

    match image::guess_format(&bytes) {
        Ok(_) => Ok(Arc::new(crate::image_doc::ImageDocument::from_bytes(&bytes)?)),
        Err(_) => Err(DocumentError::UnsupportedFormat),
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    // Header may be preceded by junk within the first KiB
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|window| window == b"%PDF-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ids_are_unique() {
        let a = DocumentId::next();
        let b = DocumentId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_raster_dimensions_round_and_floor_at_one() {
        let size = PageSize::new(612.0, 792.0);
        assert_eq!(size.raster_dimensions(1.0).unwrap(), (612, 792));
        assert_eq!(size.raster_dimensions(0.5).unwrap(), (306, 396));
        assert_eq!(PageSize::new(0.2, 0.2).raster_dimensions(1.0).unwrap(), (1, 1));
    }

    #[test]
    fn test_raster_dimensions_reject_bad_scale() {
        let size = PageSize::LETTER;
        assert_eq!(size.raster_dimensions(0.0), Err(RasterError::InvalidScale(0.0)));
        assert!(matches!(
            size.raster_dimensions(f32::NAN),
            Err(RasterError::InvalidScale(_))
        ));
        assert!(matches!(
            size.raster_dimensions(100.0),
            Err(RasterError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_page_table_is_one_based() {
        let sizes = [PageSize::new(100.0, 200.0), PageSize::new(300.0, 400.0)];
        assert_eq!(page_from_table(&sizes, 1).unwrap(), sizes[0]);
        assert_eq!(page_from_table(&sizes, 2).unwrap(), sizes[1]);
        assert_eq!(
            page_from_table(&sizes, 0),
            Err(RasterError::PageOutOfRange {
                page: 0,
                page_count: 2
            })
        );
        assert!(page_from_table(&sizes, 3).is_err());
    }

    #[test]
    fn test_unknown_bytes_are_rejected() {
        let err = open_bytes(b"definitely not a document".to_vec())
            .err()
            .expect("garbage should not open");
        assert!(matches!(err, DocumentError::UnsupportedFormat));
    }

    #[test]
    fn test_opens_documents_from_disk() {
        let dir = tempfile::tempdir().unwrap();

        let pdf_path = dir.path().join("plan.pdf");
        let bytes = crate::pdf::build_test_pdf(&[(612.0, 792.0), (1224.0, 792.0)]).unwrap();
        std::fs::write(&pdf_path, bytes).unwrap();
        let pdf = open_path(&pdf_path).unwrap();
        assert_eq!(pdf.page_count(), 2);
        assert_eq!(pdf.page_size(2).unwrap(), PageSize::new(1224.0, 792.0));

        let png_path = dir.path().join("photo.png");
        RgbaImage::from_pixel(64, 48, Rgba([200, 200, 200, 255]))
            .save(&png_path)
            .unwrap();
        let photo = open_path(&png_path).unwrap();
        assert_eq!(photo.kind(), "image");
        assert_eq!(photo.page_size(1).unwrap(), PageSize::new(64.0, 48.0));

        assert!(open_path(dir.path().join("missing.pdf")).is_err());
    }
}
