//! Supersession and cancellation of in-flight page rasters

use blueprint_render::{
    DocumentHandle, DocumentId, PageRasterizer, PageSize, RasterError, RgbaImage, SharedDocument,
};
use blueprint_scheduler::CancellationToken;
use image::Rgba;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Document whose rasterizations block until the test opens the gate
struct GatedDocument {
    id: DocumentId,
    open: Mutex<bool>,
    signal: Condvar,
}

impl GatedDocument {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: DocumentId::next(),
            open: Mutex::new(false),
            signal: Condvar::new(),
        })
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.signal.notify_all();
    }
}

impl DocumentHandle for GatedDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn page_count(&self) -> u32 {
        3
    }

    fn page_size(&self, _page: u32) -> Result<PageSize, RasterError> {
        Ok(PageSize::new(10.0, 10.0))
    }

    fn rasterize(
        &self,
        page: u32,
        scale: f32,
        _cancel: &CancellationToken,
    ) -> Result<RgbaImage, RasterError> {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.signal.wait(open).unwrap();
        }
        let edge = (10.0 * scale) as u32;
        Ok(RgbaImage::from_pixel(edge, edge, Rgba([page as u8, 0, 0, 255])))
    }

    fn kind(&self) -> &'static str {
        "gated"
    }
}

#[test]
fn same_page_request_supersedes_pending_one() {
    let gated = GatedDocument::new();
    let document: SharedDocument = gated.clone();
    let mut rasterizer = PageRasterizer::new();

    rasterizer.request(&document, 1, 1.0);
    let key = rasterizer.request(&document, 1, 2.0);
    assert_eq!(rasterizer.pending_count(), 1);
    assert_eq!(rasterizer.pending_scale(&key), Some(2.0));

    gated.release();
    let mut completions = rasterizer.wait(Duration::from_secs(5));
    // The superseded request may land first and be discarded; wait for the live one
    if completions.is_empty() {
        completions = rasterizer.wait(Duration::from_secs(5));
    }

    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].scale, 2.0);
    assert_eq!(completions[0].result.as_ref().unwrap().width(), 20);
    assert!(rasterizer.poll().is_empty());
}

#[test]
fn cancelled_page_result_is_never_returned() {
    let gated = GatedDocument::new();
    let document: SharedDocument = gated.clone();
    let mut rasterizer = PageRasterizer::new();

    let stale = rasterizer.request(&document, 1, 1.0);
    rasterizer.cancel_page(&stale);
    let fresh = rasterizer.request(&document, 2, 1.0);

    gated.release();
    let completions = rasterizer.wait(Duration::from_secs(5));

    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].key, fresh);
    assert_eq!(completions[0].result.as_ref().unwrap().page, 2);
}
