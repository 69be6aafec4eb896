//! Bearer-token guard for administrative routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use unwritten_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Present when the request carries `Authorization: Bearer <ADMIN_TOKEN>`.
///
/// ```ignore
/// async fn admin_only(_admin: AdminToken) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AdminToken;

impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        // Compare fixed-length digests so the check does not leak the
        // length of a matching prefix.
        if Sha256::digest(token.as_bytes()) != Sha256::digest(state.config.admin_token.as_bytes())
        {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid admin token".into(),
            )));
        }
        Ok(AdminToken)
    }
}
