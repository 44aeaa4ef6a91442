//! Campaign generation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use campaignflow::errors::CampaignError;
use campaignflow::pipeline::CampaignRequest;
use campaignflow::progress::ProgressRecord;

use crate::api::error::ApiError;
use crate::state::AppState;

/// How `/generate` answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateMode {
    /// Return 202 immediately; poll `/progress`.
    #[default]
    Async,
    /// Wait for the finished campaign.
    Sync,
}

/// Body of `POST /generate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    /// The campaign request.
    #[serde(flatten)]
    pub request: CampaignRequest,
    /// Response mode.
    #[serde(default)]
    pub mode: GenerateMode,
}

/// Body of a 202 answer.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accepted {
    /// Run identifier.
    pub run_id: Uuid,
    /// Key to poll `/progress` with.
    pub subject_key: String,
}

/// `POST /generate`
pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let prepared = state.pipeline.prepare(body.request)?;

    state
        .tracker
        .store()
        .try_begin(
            &prepared.subject_key,
            ProgressRecord::pending(prepared.run_id, prepared.subject_key.clone()),
        )
        .map_err(|_| ApiError::Conflict(prepared.subject_key.clone()))?;

    match body.mode {
        GenerateMode::Sync => {
            // Detached so a dropped connection cannot cancel the run.
            let pipeline = state.pipeline.clone();
            let sink = state.sink.clone();
            let run = tokio::spawn(async move { pipeline.execute(prepared, sink).await });
            let result = run
                .await
                .map_err(|e| CampaignError::Internal(format!("campaign run task failed: {e}")))??;
            Ok(Json(result).into_response())
        }
        GenerateMode::Async => {
            let accepted = Accepted {
                run_id: prepared.run_id,
                subject_key: prepared.subject_key.clone(),
            };
            info!(run_id = %accepted.run_id, subject_key = %accepted.subject_key, "Campaign run accepted");

            let pipeline = state.pipeline.clone();
            let sink = state.sink.clone();
            tokio::spawn(async move {
                let run_id = prepared.run_id;
                if let Err(e) = pipeline.execute(prepared, sink).await {
                    warn!(run_id = %run_id, code = e.code(), error = %e, "Background campaign run failed");
                }
            });

            Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
        }
    }
}
