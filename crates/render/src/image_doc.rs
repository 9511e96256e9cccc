//! Flat raster image as a single-page document
//!
//! Photos and scanned plans have no vector content; the page is the image,
//! one point per source pixel.

use crate::document::{
    page_from_table, DocumentError, DocumentHandle, DocumentId, PageSize, RasterError, RgbaImage,
};
use blueprint_scheduler::CancellationToken;
use image::imageops::{self, FilterType};
use std::path::Path;

pub struct ImageDocument {
    id: DocumentId,
    image: RgbaImage,
}

impl ImageDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Self::from_image(image)
    }

    pub fn from_image(image: RgbaImage) -> Result<Self, DocumentError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DocumentError::Empty);
        }
        Ok(Self {
            id: DocumentId::next(),
            image,
        })
    }

    fn size(&self) -> PageSize {
        PageSize::new(self.image.width() as f32, self.image.height() as f32)
    }
}

impl DocumentHandle for ImageDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn page_count(&self) -> u32 {
        1
    }

    fn page_size(&self, page: u32) -> Result<PageSize, RasterError> {
        page_from_table(&[self.size()], page)
    }

    fn rasterize(
        &self,
        page: u32,
        scale: f32,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, RasterError> {
        let (width, height) = self.page_size(page)?.raster_dimensions(scale)?;
        if cancel.is_cancelled() {
            return Err(RasterError::Cancelled);
        }

        if (width, height) == self.image.dimensions() {
            return Ok(self.image.clone());
        }

        let filter = if scale < 1.0 {
            FilterType::Triangle
        } else {
            FilterType::CatmullRom
        };
        Ok(imageops::resize(&self.image, width, height, filter))
    }

    fn kind(&self) -> &'static str {
        "image"
    }
}
