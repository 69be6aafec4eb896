use crate::order::OrderStatus;
use crate::types::OrderId;

/// General domain errors (lookups, validation, auth).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error taxonomy of the print-book pipeline.
///
/// The order coordinator branches on these variants: `Upload` and
/// `ProviderUnavailable` are retried, `Render` and `Provider` fail the
/// order, `SubmissionRateExceeded` leaves it queued for a later attempt,
/// and `InvalidTransition` is logged and discarded.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A referenced child or order does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Caller input is unusable (bad range, span too long, bad format key).
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Book needs at least {min} pages but the selection produces {pages}")]
    ManifestTooSmall { pages: u32, min: u32 },

    #[error("Book allows at most {max} pages but the selection produces {pages}")]
    ManifestTooLarge { pages: u32, max: u32 },

    /// Non-retryable content defect (undecodable photo, oversized output).
    #[error("Render failed: {0}")]
    Render(String),

    /// Transient I/O failure while fetching photos or uploading artifacts.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// The provider's rolling submission window is full and the backlog is
    /// at capacity.
    #[error("Print provider backlog is full ({backlog} queued submissions)")]
    SubmissionRateExceeded { backlog: usize },

    /// The provider could not be reached or answered with a server error.
    #[error("Print provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider rejected the order outright.
    #[error("Print provider rejected the order: {0}")]
    Provider(String),

    /// A status change that is not a valid forward move from the current
    /// state. Never surfaced to end users.
    #[error("Invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The pipeline run for this order was cancelled by an administrative
    /// failure.
    #[error("Pipeline run for order {0} was cancelled")]
    Cancelled(OrderId),

    /// Order persistence failed.
    #[error("Order store error: {0}")]
    Store(String),
}

impl PipelineError {
    /// Whether the coordinator should retry the failed step.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upload(_) | Self::ProviderUnavailable(_) | Self::Store(_)
        )
    }
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            CoreError::Validation(msg) | CoreError::Conflict(msg) => Self::Validation(msg),
            CoreError::Unauthorized(msg) | CoreError::Internal(msg) => Self::Store(msg),
        }
    }
}
