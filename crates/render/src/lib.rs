//! Blueprint Render Library
//!
//! Document backends and asynchronous, cancellable page rasterization.

pub mod document;
pub mod image_doc;
pub mod pdf;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod rasterizer;

pub use document::{
    open_bytes, open_path, Bitmap, DocumentError, DocumentHandle, DocumentId, PageSize,
    RasterError, RgbaImage, SharedDocument, MAX_RASTER_EDGE,
};
pub use image_doc::ImageDocument;
#[cfg(any(test, feature = "test-fixtures"))]
pub use pdf::build_test_pdf;
pub use pdf::PdfDocument;
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumDocument;
pub use rasterizer::{rasterize_blocking, PageRasterizer, RasterCompletion, RasterKey, RasterNotifier};
