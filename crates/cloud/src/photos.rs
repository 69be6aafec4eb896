//! Photo downloads over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use unwritten_core::entry::PhotoRef;
use unwritten_core::error::PipelineError;
use unwritten_core::ports::PhotoFetcher;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest photo accepted for print (bytes).
pub const MAX_PHOTO_BYTES: usize = 25 * 1024 * 1024;

pub struct HttpPhotoFetcher {
    client: reqwest::Client,
}

impl HttpPhotoFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PhotoFetcher for HttpPhotoFetcher {
    async fn fetch(&self, photo: &PhotoRef) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(photo.url())
            .send()
            .await
            .map_err(|e| PipelineError::Upload(format!("Photo download failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            // A missing photo will not appear on retry.
            return Err(PipelineError::Render(format!(
                "Photo {} returned HTTP {}",
                photo.url(),
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(PipelineError::Upload(format!(
                "Photo {} returned HTTP {}",
                photo.url(),
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Upload(format!("Photo download failed: {e}")))?;
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(PipelineError::Render(format!(
                "Photo {} is {} bytes; the limit is {MAX_PHOTO_BYTES}",
                photo.url(),
                bytes.len()
            )));
        }
        Ok(bytes.to_vec())
    }
}
