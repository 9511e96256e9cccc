//! Content rasterization through PDFium
//!
//! PDFium is not safe to drive from several threads at once, so every call
//! binds the library under a process-wide lock and loads the page from the
//! retained bytes.

use crate::document::{
    page_from_table, DocumentError, DocumentHandle, DocumentId, PageSize, RasterError, RgbaImage,
};
use blueprint_scheduler::CancellationToken;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

pub struct PdfiumDocument {
    id: DocumentId,
    bytes: Vec<u8>,
    page_sizes: Vec<PageSize>,
}

/// Bind PDFium: executable directory, then working directory, then system paths
fn bind_pdfium() -> Result<Pdfium, String> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    if let Some(ref dir) = exe_dir {
        if let Ok(bindings) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        {
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| format!("failed to bind pdfium: {e}"))
}

impl PdfiumDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DocumentError> {
        let _guard = PDFIUM_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let pdfium = bind_pdfium().map_err(DocumentError::Backend)?;
        let document = pdfium
            .load_pdf_from_byte_slice(&bytes, None)
            .map_err(|e| DocumentError::Backend(e.to_string()))?;

        let page_sizes: Vec<PageSize> = document
            .pages()
            .iter()
            .map(|page| PageSize::new(page.width().value, page.height().value))
            .collect();
        drop(document);

        if page_sizes.is_empty() {
            return Err(DocumentError::Empty);
        }

        Ok(Self {
            id: DocumentId::next(),
            bytes,
            page_sizes,
        })
    }
}

impl DocumentHandle for PdfiumDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize, RasterError> {
        page_from_table(&self.page_sizes, page)
    }

    fn rasterize(
        &self,
        page: u32,
        scale: f32,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, RasterError> {
        let (width, height) = self.page_size(page)?.raster_dimensions(scale)?;

        let _guard = PDFIUM_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() {
            return Err(RasterError::Cancelled);
        }

        let pdfium = bind_pdfium().map_err(RasterError::Backend)?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(|e| RasterError::Decode(e.to_string()))?;
        let index = u16::try_from(page - 1).map_err(|_| RasterError::PageOutOfRange {
            page,
            page_count: self.page_count(),
        })?;
        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|e| RasterError::Decode(e.to_string()))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| RasterError::Backend(e.to_string()))?;
        let rgba = bitmap.as_rgba_bytes().to_vec();

        RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            RasterError::Backend(format!("pdfium returned a buffer not matching {width}x{height}"))
        })
    }

    fn kind(&self) -> &'static str {
        "pdfium"
    }
}
