//! Read-only catalog endpoints: print formats and journaling prompts.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use unwritten_core::format::FormatProfile;
use unwritten_core::prompts::{daily_prompt, random_prompt};
use unwritten_core::types::CalendarDate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromptParams {
    pub name: String,
    /// Defaults to today (UTC).
    pub date: Option<CalendarDate>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub prompt: String,
    pub date: Option<CalendarDate>,
}

/// GET /api/v1/formats
pub async fn list_formats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let formats: Vec<FormatProfile> = state.coordinator.catalog().iter().cloned().collect();
    Ok(Json(DataResponse { data: formats }))
}

/// GET /api/v1/prompts/daily?name=&date=
///
/// The same name and date always yield the same prompt.
pub async fn get_daily_prompt(
    Query(params): Query<PromptParams>,
) -> AppResult<impl IntoResponse> {
    let name = child_name(&params.name)?;
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(DataResponse {
        data: PromptResponse {
            prompt: daily_prompt(name, date),
            date: Some(date),
        },
    }))
}

/// GET /api/v1/prompts/random?name=
pub async fn get_random_prompt(
    Query(params): Query<PromptParams>,
) -> AppResult<impl IntoResponse> {
    let name = child_name(&params.name)?;
    Ok(Json(DataResponse {
        data: PromptResponse {
            prompt: random_prompt(name),
            date: None,
        },
    }))
}

fn child_name(raw: &str) -> AppResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    Ok(name)
}
