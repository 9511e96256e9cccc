//! PDF geometry backend built on lopdf
//!
//! Reads the page tree and MediaBox sizes. Rasterization produces a
//! page-sized white canvas with a hairline border; the pdfium backend does
//! real content rendering when that feature is enabled.

use crate::document::{
    page_from_table, DocumentError, DocumentHandle, DocumentId, PageSize, RasterError, RgbaImage,
};
use blueprint_scheduler::CancellationToken;
use image::Rgba;
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

const PAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PAGE_BORDER: Rgba<u8> = Rgba([220, 220, 220, 255]);

/// Inherited attributes are looked up at most this many levels up the page tree
const MAX_PARENT_DEPTH: usize = 32;

pub struct PdfDocument {
    id: DocumentId,
    page_sizes: Vec<PageSize>,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DocumentError> {
        let page_sizes = parse_sizes(&bytes)?;
        Ok(Self {
            id: DocumentId::next(),
            page_sizes,
        })
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        &self.page_sizes
    }
}

fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, DocumentError> {
    if bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(DocumentError::Encrypted);
    }

    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();
    let mut sizes = Vec::with_capacity(pages.len());

    for (_, object_id) in pages {
        let dict = doc.get_dictionary(object_id)?;
        let size = media_box(&doc, dict).unwrap_or(PageSize::LETTER);
        sizes.push(size);
    }

    if sizes.is_empty() {
        return Err(DocumentError::Empty);
    }

    Ok(sizes)
}

/// MediaBox of a page, following `/Parent` for inherited boxes
fn media_box(doc: &Document, page: &Dictionary) -> Option<PageSize> {
    let mut dict = page;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Some(size) = dict.get(b"MediaBox").ok().and_then(|obj| rect_size(doc, obj)) {
            return Some(size);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn rect_size(doc: &Document, obj: &Object) -> Option<PageSize> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let array = obj.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let x0 = number(&array[0])?;
    let y0 = number(&array[1])?;
    let x1 = number(&array[2])?;
    let y1 = number(&array[3])?;
    let size = PageSize::new((x1 - x0).abs(), (y1 - y0).abs());
    (size.width_pt > 0.0 && size.height_pt > 0.0).then_some(size)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

impl DocumentHandle for PdfDocument {
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
        if cancel.is_cancelled() {
            return Err(RasterError::Cancelled);
        }

        let mut image = RgbaImage::from_pixel(width, height, PAGE_BACKGROUND);

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, PAGE_BORDER);
                image.put_pixel(x, height - 1, PAGE_BORDER);
            }
            for y in 0..height {
                image.put_pixel(0, y, PAGE_BORDER);
                image.put_pixel(width - 1, y, PAGE_BORDER);
            }
        }

        Ok(image)
    }

    fn kind(&self) -> &'static str {
        "pdf"
    }
}

/// Build an unencrypted PDF with one page per `(width, height)` MediaBox
#[cfg(any(test, feature = "test-fixtures"))]
pub fn build_test_pdf(pages: &[(f32, f32)]) -> Result<Vec<u8>, DocumentError> {
    use lopdf::dictionary;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = pages
        .iter()
        .map(|&(width, height)| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width.into()),
                    Object::Real(height.into()),
                ],
            });
            page_id.into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
