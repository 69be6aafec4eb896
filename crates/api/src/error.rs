use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use unwritten_core::error::{CoreError, PipelineError};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`PipelineError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `unwritten_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A pipeline error from selection, layout or the order coordinator.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => internal("Internal core error", msg),
            },

            // --- PipelineError variants ---
            AppError::Pipeline(err) => classify_pipeline_error(err),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal("Internal error", msg),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(order_id) = self.order_id() {
            body["order_id"] = json!(order_id);
        }

        (status, axum::Json(body)).into_response()
    }
}

impl AppError {
    /// Order the failure concerns, when the error names one.
    fn order_id(&self) -> Option<&str> {
        match self {
            AppError::Pipeline(PipelineError::InvalidTransition { order_id, .. })
            | AppError::Pipeline(PipelineError::Cancelled(order_id)) => Some(order_id.as_str()),
            AppError::Pipeline(PipelineError::NotFound { entity: "Order", id }) => {
                Some(id.as_str())
            }
            _ => None,
        }
    }
}

fn internal(context: &'static str, msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a pipeline error into an HTTP status, error code, and message.
///
/// - Missing children and orders map to 404, bad input to 400.
/// - Books outside the format's page bounds map to 422.
/// - A full provider backlog maps to 503 so callers back off.
/// - Invalid or cancelled status changes map to 409.
/// - Store failures map to 500 with a sanitized message.
fn classify_pipeline_error(err: &PipelineError) -> (StatusCode, &'static str, String) {
    match err {
        PipelineError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        PipelineError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        PipelineError::ManifestTooSmall { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "MANIFEST_TOO_SMALL",
            err.to_string(),
        ),
        PipelineError::ManifestTooLarge { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "MANIFEST_TOO_LARGE",
            err.to_string(),
        ),
        PipelineError::SubmissionRateExceeded { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "BACKPRESSURE",
            err.to_string(),
        ),
        PipelineError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
        }
        PipelineError::Cancelled(_) => (StatusCode::CONFLICT, "CANCELLED", err.to_string()),
        PipelineError::Render(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "RENDER_FAILED",
            err.to_string(),
        ),
        PipelineError::Provider(_) => {
            (StatusCode::BAD_GATEWAY, "PROVIDER_REJECTED", err.to_string())
        }
        PipelineError::Upload(_) | PipelineError::ProviderUnavailable(_) => {
            tracing::warn!(error = %err, "Upstream service unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "An upstream service is unavailable, please retry".to_string(),
            )
        }
        PipelineError::Store(msg) => internal("Order store error", msg),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            internal("Database error", &db_err.to_string())
        }
        other => internal("Database error", &other.to_string()),
    }
}
