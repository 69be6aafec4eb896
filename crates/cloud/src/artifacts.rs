//! Artifact stores: S3 for production, local disk for development.
//!
//! Both overwrite on put, so re-rendering an order replaces its documents
//! under the same key and URL.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use unwritten_core::error::PipelineError;
use unwritten_core::ports::ArtifactStore;

use crate::config::{ArtifactBackend, ArtifactConfig};
use crate::error::ArtifactError;

/// Reject keys that could escape the bucket prefix or the local root.
fn validate_key(key: &str) -> Result<(), ArtifactError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(ArtifactError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Build the configured store.
pub async fn from_config(config: &ArtifactConfig) -> Arc<dyn ArtifactStore> {
    match &config.backend {
        ArtifactBackend::S3 { bucket } => Arc::new(
            S3ArtifactStore::from_env(bucket.clone(), config.public_base_url.clone()).await,
        ),
        ArtifactBackend::Local { dir } => Arc::new(LocalArtifactStore::new(
            dir,
            config.public_base_url.clone(),
        )),
    }
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ArtifactStore {
    /// Client configured from the standard AWS environment/credential chain.
    pub async fn from_env(bucket: String, public_base_url: String) -> Self {
        let aws_config = aws_config::load_from_env().await;
        Self {
            client: Client::new(&aws_config),
            bucket,
            public_base_url,
        }
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ArtifactError> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ArtifactError::S3 {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(public_url(&self.public_base_url, key))
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, PipelineError> {
        let size = bytes.len();
        let url = self.put_object(key, bytes, content_type).await?;
        tracing::debug!(bucket = %self.bucket, key, size, "Artifact uploaded to S3");
        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// Local filesystem
// ---------------------------------------------------------------------------

pub struct LocalArtifactStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: String) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        validate_key(key)?;
        let path = self.path_for(key);
        let io_err = |source: std::io::Error| ArtifactError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        // Write then rename so readers never see a partial document.
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, PipelineError> {
        self.write(key, &bytes).await?;
        tracing::debug!(root = %self.root.display(), key, size = bytes.len(), "Artifact written");
        Ok(public_url(&self.public_base_url, key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
