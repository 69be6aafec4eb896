//! Adapters for the hosted services the pipeline consumes: the journal
//! backend (Supabase REST), artifact storage (S3 or local disk), and photo
//! downloads.

pub mod artifacts;
pub mod config;
pub mod entries;
pub mod error;
pub mod photos;

pub use artifacts::{LocalArtifactStore, S3ArtifactStore};
pub use config::{ArtifactBackend, ArtifactConfig, SupabaseConfig};
pub use entries::SupabaseEntryStore;
pub use error::{ArtifactError, EntryStoreError};
pub use photos::HttpPhotoFetcher;
