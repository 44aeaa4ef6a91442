//! Progress polling.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use campaignflow::progress::ProgressRecord;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Query string of `GET /progress`.
#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    /// Subject key, domain or URL.
    pub key: String,
}

/// `GET /progress?key=<subjectKey>`
pub async fn read(
    State(state): State<AppState>,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let Query(query) = query?;
    let key = state.pipeline.subject_key(&query.key)?;
    state
        .tracker
        .read(&key)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no run tracked for {key}")))
}
