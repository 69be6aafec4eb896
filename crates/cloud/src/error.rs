use unwritten_core::error::PipelineError;

/// Failures talking to the artifact store.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("S3 put_object failed for {key}: {message}")]
    S3 { key: String, message: String },

    #[error("Filesystem write failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),
}

impl From<ArtifactError> for PipelineError {
    fn from(err: ArtifactError) -> Self {
        match err {
            // A bad key is a programming error, not something a retry fixes.
            ArtifactError::InvalidKey(_) => PipelineError::Render(err.to_string()),
            _ => PipelineError::Upload(err.to_string()),
        }
    }
}

/// Failures talking to the hosted entry store.
#[derive(Debug, thiserror::Error)]
pub enum EntryStoreError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Entry store error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl From<EntryStoreError> for PipelineError {
    fn from(err: EntryStoreError) -> Self {
        PipelineError::Store(err.to_string())
    }
}
