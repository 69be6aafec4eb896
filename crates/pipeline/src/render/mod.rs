//! Render stage: a paid order's manifest becomes a cover PDF and an interior
//! PDF, uploaded to the artifact store.
//!
//! Rendering itself is pure and deterministic ([`render_documents`]); the
//! stage around it fetches photos and uploads results with retry, and runs
//! the CPU-bound work on the blocking pool.

pub mod pages;
pub mod pdf;
pub mod photos;

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use unwritten_core::entry::PhotoRef;
use unwritten_core::error::PipelineError;
use unwritten_core::hashing::sha256_hex_parts;
use unwritten_core::manifest::BookManifest;
use unwritten_core::order::ArtifactRecord;
use unwritten_core::ports::{ArtifactStore, PhotoFetcher};
use unwritten_core::types::OrderId;

use crate::paid::PaidOrder;
use crate::retry::RetryPolicy;
use pages::{PlacedPhoto, PHOTO_CARD_IN};
use pdf::PdfDocument;

/// Combined ceiling for both documents, set by the print provider.
pub const MAX_ARTIFACT_BYTES: u64 = 2 * 1024 * 1024 * 1024;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Artifact keys of an order's documents.
pub fn cover_key(order_id: &OrderId) -> String {
    format!("orders/{order_id}/cover.pdf")
}

pub fn interior_key(order_id: &OrderId) -> String {
    format!("orders/{order_id}/interior.pdf")
}

/// The two print-ready documents of one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocuments {
    pub cover: Vec<u8>,
    pub interior: Vec<u8>,
}

impl RenderedDocuments {
    pub fn total_bytes(&self) -> u64 {
        (self.cover.len() + self.interior.len()) as u64
    }

    pub fn checksum(&self) -> String {
        sha256_hex_parts(&[&self.cover, &self.interior])
    }
}

/// Photos printed in `manifest`, in page order without repeats. Only
/// highlighted cards carry a photo.
pub fn printed_photos(manifest: &BookManifest) -> Vec<PhotoRef> {
    let mut seen = Vec::new();
    for page in manifest.interior_pages() {
        let photo = page.highlighted_entry().and_then(|e| e.photo.as_ref());
        if let Some(photo) = photo {
            if !seen.contains(photo) {
                seen.push(photo.clone());
            }
        }
    }
    seen
}

/// Render both documents from `manifest` and the raw bytes of its printed
/// photos. A photo missing from `sources` leaves an empty card.
pub fn render_documents(
    manifest: &BookManifest,
    sources: &[(PhotoRef, Vec<u8>)],
) -> Result<RenderedDocuments, PipelineError> {
    let mut interior = PdfDocument::new();
    let mut placed = HashMap::with_capacity(sources.len());
    for (photo, bytes) in sources {
        let jpeg = photos::prepare_photo(bytes, PHOTO_CARD_IN, PHOTO_CARD_IN).map_err(|e| match e {
            PipelineError::Render(msg) => PipelineError::Render(format!("{msg} ({})", photo.url())),
            other => other,
        })?;
        let (width, height) = (jpeg.width, jpeg.height);
        let image = interior.add_image(jpeg);
        placed.insert(
            photo.clone(),
            PlacedPhoto {
                image,
                width,
                height,
            },
        );
    }
    for page in manifest.interior_pages() {
        let (boxes, canvas) = pages::interior_page(page, &placed);
        interior.add_page(boxes, canvas);
    }

    let mut cover = PdfDocument::new();
    let (boxes, canvas) = pages::cover_spread(manifest);
    cover.add_page(boxes, canvas);

    Ok(RenderedDocuments {
        cover: cover.finish(),
        interior: interior.finish(),
    })
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

pub struct RenderStage {
    artifacts: Arc<dyn ArtifactStore>,
    photos: Arc<dyn PhotoFetcher>,
    retry: RetryPolicy,
    max_bytes: u64,
}

impl RenderStage {
    pub fn new(artifacts: Arc<dyn ArtifactStore>, photos: Arc<dyn PhotoFetcher>) -> Self {
        Self {
            artifacts,
            photos,
            retry: RetryPolicy::default(),
            max_bytes: MAX_ARTIFACT_BYTES,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_artifact_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Render and upload `order`'s documents.
    ///
    /// Photo downloads and uploads are retried; once retries run out the
    /// failure becomes a `Render` error. Returns `Cancelled` if `cancel`
    /// fires before the upload completes.
    pub async fn render(
        &self,
        order: &PaidOrder,
        cancel: &CancellationToken,
    ) -> Result<ArtifactRecord, PipelineError> {
        let order_id = order.id();

        let mut photos = Vec::new();
        for photo in printed_photos(order.manifest()) {
            let bytes = self
                .retry
                .run("photo_fetch", order_id, cancel, || self.photos.fetch(&photo))
                .await
                .map_err(escalate)?;
            photos.push((photo, bytes));
        }

        let manifest = order.manifest().clone();
        let job = tokio::task::spawn_blocking(move || render_documents(&manifest, &photos));
        let documents = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled(order_id.clone())),
            joined = job => joined
                .map_err(|e| PipelineError::Render(format!("Render task failed: {e}")))??,
        };

        let total = documents.total_bytes();
        if total > self.max_bytes {
            return Err(PipelineError::Render(format!(
                "Artifacts total {total} bytes, over the {} byte limit",
                self.max_bytes
            )));
        }
        let checksum = documents.checksum();
        tracing::info!(
            order_id = %order_id,
            pages = order.manifest().page_count,
            cover_bytes = documents.cover.len(),
            interior_bytes = documents.interior.len(),
            checksum = %checksum,
            "Rendered book"
        );

        let cover_bytes = documents.cover.len() as u64;
        let interior_bytes = documents.interior.len() as u64;
        let cover_url = self
            .upload(order_id, &cover_key(order_id), documents.cover, cancel)
            .await?;
        let interior_url = self
            .upload(order_id, &interior_key(order_id), documents.interior, cancel)
            .await?;

        Ok(ArtifactRecord {
            cover_url,
            interior_url,
            cover_bytes,
            interior_bytes,
            checksum,
        })
    }

    async fn upload(
        &self,
        order_id: &OrderId,
        key: &str,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let url = self
            .retry
            .run("upload", order_id, cancel, || {
                self.artifacts.put(key, bytes.clone(), PDF_CONTENT_TYPE)
            })
            .await
            .map_err(escalate)?;
        tracing::debug!(order_id = %order_id, key, url = %url, "Uploaded artifact");
        Ok(url)
    }
}

/// Transient failures that outlived their retries become render failures.
fn escalate(err: PipelineError) -> PipelineError {
    if err.is_retryable() {
        PipelineError::Render(format!("Gave up after retries: {err}"))
    } else {
        err
    }
}
