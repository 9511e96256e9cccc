//! Background page rasterization
//!
//! Each request runs on its own worker thread and parks its result in a
//! shared slot; the owner collects finished work with [`PageRasterizer::poll`]
//! from the UI thread. At most one request per (document, page) is live: a
//! new request for the same key cancels the previous one, and results of
//! cancelled requests are dropped on collection instead of being returned.

use crate::document::{Bitmap, DocumentHandle, DocumentId, RasterError, RgbaImage, SharedDocument};
use blueprint_scheduler::{CancellationRegistry, CancellationToken};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Identity of a rasterization target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterKey {
    pub document: DocumentId,
    /// Page number (1-based)
    pub page: u32,
}

impl RasterKey {
    pub fn new(document: DocumentId, page: u32) -> Self {
        Self { document, page }
    }
}

/// Finished, still-wanted rasterization
#[derive(Debug, Clone)]
pub struct RasterCompletion {
    pub key: RasterKey,
    pub scale: f32,
    pub result: Result<Bitmap, RasterError>,
}

/// Callback run on the worker thread when a live request has a result
pub type RasterNotifier = Arc<dyn Fn(RasterKey) + Send + Sync>;

type ResultSlot = Arc<Mutex<Option<Result<RgbaImage, RasterError>>>>;

struct InFlight {
    key: RasterKey,
    scale: f32,
    token: CancellationToken,
    slot: ResultSlot,
}

impl InFlight {
    fn take_result(&self) -> Option<Result<RgbaImage, RasterError>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Asynchronous, cancellable page rasterizer
pub struct PageRasterizer {
    registry: Arc<CancellationRegistry<RasterKey>>,
    in_flight: Vec<InFlight>,
    notifier: Option<RasterNotifier>,
}

impl PageRasterizer {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(CancellationRegistry::new()),
            in_flight: Vec::new(),
            notifier: None,
        }
    }

    pub fn with_notifier(notifier: impl Fn(RasterKey) + Send + Sync + 'static) -> Self {
        let mut rasterizer = Self::new();
        rasterizer.set_notifier(notifier);
        rasterizer
    }

    pub fn set_notifier(&mut self, notifier: impl Fn(RasterKey) + Send + Sync + 'static) {
        self.notifier = Some(Arc::new(notifier));
    }

    /// Start rasterizing `page` of `document` at `scale`
    ///
    /// Supersedes any live request for the same page of the same document.
    pub fn request(&mut self, document: &SharedDocument, page: u32, scale: f32) -> RasterKey {
        let key = RasterKey::new(document.id(), page);
        if self.registry.contains(&key) {
            tracing::debug!(document = %key.document, page, "superseding pending raster");
        }
        let token = self.registry.register(key);
        let slot: ResultSlot = Arc::new(Mutex::new(None));

        let worker_document = Arc::clone(document);
        let worker_token = token.clone();
        let worker_slot = Arc::clone(&slot);
        let notifier = self.notifier.clone();

        tracing::debug!(document = %key.document, page, scale, "raster requested");
        thread::spawn(move || {
            let result = rasterize_guarded(worker_document.as_ref(), page, scale, &worker_token);
            *worker_slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
            if !worker_token.is_cancelled() {
                if let Some(notify) = notifier {
                    notify(key);
                }
            }
        });

        self.in_flight.push(InFlight {
            key,
            scale,
            token,
            slot,
        });
        key
    }

    /// Collect finished requests that are still wanted
    ///
    /// Results of cancelled or superseded requests are discarded here and
    /// never returned.
    pub fn poll(&mut self) -> Vec<RasterCompletion> {
        let mut completions = Vec::new();
        let registry = Arc::clone(&self.registry);

        self.in_flight.retain(|job| {
            if job.token.is_cancelled() {
                tracing::debug!(document = %job.key.document, page = job.key.page, "dropping cancelled raster");
                return false;
            }
            let Some(result) = job.take_result() else {
                return true;
            };

            if !registry.complete(&job.key, &job.token) {
                tracing::debug!(document = %job.key.document, page = job.key.page, "discarding stale raster");
                return false;
            }

            let result = result.map(|image| Bitmap::new(job.key.document, job.key.page, job.scale, image));
            match &result {
                Ok(bitmap) => tracing::debug!(
                    document = %job.key.document,
                    page = job.key.page,
                    width = bitmap.width(),
                    height = bitmap.height(),
                    "raster ready"
                ),
                Err(err) => tracing::warn!(
                    document = %job.key.document,
                    page = job.key.page,
                    error = %err,
                    "raster failed"
                ),
            }
            completions.push(RasterCompletion {
                key: job.key,
                scale: job.scale,
                result,
            });
            false
        });

        completions
    }

    /// Poll until something completes, nothing is pending, or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Vec<RasterCompletion> {
        let deadline = Instant::now() + timeout;
        loop {
            let completions = self.poll();
            if !completions.is_empty() || self.in_flight.is_empty() || Instant::now() >= deadline {
                return completions;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    pub fn is_pending(&self, key: &RasterKey) -> bool {
        self.registry.contains(key)
    }

    /// Scale of the live request for `key`, if any
    pub fn pending_scale(&self, key: &RasterKey) -> Option<f32> {
        self.in_flight
            .iter()
            .rev()
            .find(|job| job.key == *key && !job.token.is_cancelled())
            .map(|job| job.scale)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    pub fn cancel_page(&mut self, key: &RasterKey) -> bool {
        let cancelled = self.registry.cancel(key);
        if cancelled {
            tracing::debug!(document = %key.document, page = key.page, "raster cancelled");
        }
        cancelled
    }

    pub fn cancel_document(&mut self, document: DocumentId) -> usize {
        let cancelled = self.registry.cancel_where(|key| key.document == document);
        if cancelled > 0 {
            tracing::debug!(%document, cancelled, "cancelled document rasters");
        }
        cancelled
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.registry.cancel_all();
        self.in_flight.clear();
        cancelled
    }
}

impl Default for PageRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PageRasterizer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Rasterize on the calling thread behind the same failure boundary
pub fn rasterize_blocking(
    document: &dyn DocumentHandle,
    page: u32,
    scale: f32,
) -> Result<Bitmap, RasterError> {
    let token = CancellationToken::new();
    rasterize_guarded(document, page, scale, &token)
        .map(|image| Bitmap::new(document.id(), page, scale, image))
}

/// Run a backend rasterization, turning panics into [`RasterError::Panicked`]
fn rasterize_guarded(
    document: &dyn DocumentHandle,
    page: u32,
    scale: f32,
    token: &CancellationToken,
) -> Result<RgbaImage, RasterError> {
    if token.is_cancelled() {
        return Err(RasterError::Cancelled);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| document.rasterize(page, scale, token))) {
        Ok(result) => result,
        Err(payload) => Err(RasterError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
