//! Environment configuration for the hosted service adapters.

use unwritten_core::error::CoreError;

fn required(name: &str) -> Result<String, CoreError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CoreError::Validation(format!("{name} must be set")))
}

// ---------------------------------------------------------------------------
// Supabase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co` (no trailing slash).
    pub url: String,
    /// Service-role key; bypasses row-level security for server reads.
    pub service_key: String,
    /// Storage bucket holding entry photos.
    pub photo_bucket: String,
}

impl SupabaseConfig {
    /// | Variable               | Required | Default  |
    /// |------------------------|----------|----------|
    /// | `SUPABASE_URL`         | yes      |          |
    /// | `SUPABASE_SERVICE_KEY` | yes      |          |
    /// | `SUPABASE_PHOTO_BUCKET`| no       | `photos` |
    pub fn from_env() -> Result<Self, CoreError> {
        Ok(Self {
            url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
            service_key: required("SUPABASE_SERVICE_KEY")?,
            photo_bucket: std::env::var("SUPABASE_PHOTO_BUCKET")
                .unwrap_or_else(|_| "photos".into()),
        })
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactBackend {
    S3 { bucket: String },
    Local { dir: String },
}

#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub backend: ArtifactBackend,
    /// Base URL under which stored keys are publicly fetchable.
    pub public_base_url: String,
}

impl ArtifactConfig {
    /// | Variable                   | Required      | Default     |
    /// |----------------------------|---------------|-------------|
    /// | `ARTIFACT_BACKEND`         | no            | `local`     |
    /// | `S3_BUCKET`                | when `s3`     |             |
    /// | `ARTIFACT_LOCAL_DIR`       | no            | `./artifacts` |
    /// | `ARTIFACT_PUBLIC_BASE_URL` | yes           |             |
    pub fn from_env() -> Result<Self, CoreError> {
        let backend = match std::env::var("ARTIFACT_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .as_str()
        {
            "s3" => ArtifactBackend::S3 {
                bucket: required("S3_BUCKET")?,
            },
            "local" => ArtifactBackend::Local {
                dir: std::env::var("ARTIFACT_LOCAL_DIR").unwrap_or_else(|_| "./artifacts".into()),
            },
            other => {
                return Err(CoreError::Validation(format!(
                    "ARTIFACT_BACKEND must be 's3' or 'local', got '{other}'"
                )))
            }
        };
        Ok(Self {
            backend,
            public_base_url: required("ARTIFACT_PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
        })
    }
}
