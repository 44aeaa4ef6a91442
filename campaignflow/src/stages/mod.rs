//! The four analysis stages and the synthetic lead generator.
//!
//! Each stage is a typed async transform over an external reasoning call.
//! Output that does not deserialize into the stage's shape, or that breaks a
//! stage invariant, is a [`StageFailure`]; stages are never retried.

mod filters;
mod personas;
mod ranking;
mod synthetic;
mod website;

pub use filters::FilterDerivationStage;
pub use personas::PersonaGenerationStage;
pub use ranking::{select_persona, PersonaRankingStage, RankingInput};
pub use synthetic::SyntheticLeadGenerator;
pub use website::WebsiteAnalysisStage;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{StageName, StageResult, StageTrace};
use crate::errors::StageFailure;
use crate::providers::{ReasoningService, StructuredPrompt};
use crate::utils::now_utc;

/// Output of one stage execution plus the raw exchange behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct StageExecution<T> {
    /// Typed output.
    pub output: T,
    /// Raw reasoning request/response.
    pub trace: Option<StageTrace>,
}

/// A typed analysis stage.
#[async_trait]
pub trait AnalysisStage: Send + Sync {
    /// What the stage consumes.
    type Input: Send + Sync;
    /// What the stage produces.
    type Output: Serialize + Send;

    /// Which stage this is.
    fn name(&self) -> StageName;

    /// Runs the stage once.
    async fn execute(&self, input: &Self::Input) -> Result<StageExecution<Self::Output>, StageFailure>;
}

/// Runs `stage` and builds its [`StageResult`].
///
/// The trace is kept only when `capture_trace` is set.
pub async fn run_stage<S: AnalysisStage>(
    stage: &S,
    input: &S::Input,
    capture_trace: bool,
) -> Result<(S::Output, StageResult), StageFailure> {
    let name = stage.name();
    let started_at = now_utc();
    debug!(stage = %name, "Stage started");

    match stage.execute(input).await {
        Ok(execution) => {
            let ended_at = now_utc();
            let payload = serde_json::to_value(&execution.output).unwrap_or(serde_json::Value::Null);
            let trace = if capture_trace { execution.trace } else { None };
            let result = StageResult::completed(name, started_at, ended_at, payload).with_trace(trace);
            info!(stage = %name, duration_ms = result.duration_ms, "Stage completed");
            Ok((execution.output, result))
        }
        Err(failure) => {
            warn!(stage = %name, error = %failure, "Stage failed");
            Err(failure)
        }
    }
}

/// Sends `prompt` and deserializes the answer into `T`.
pub(crate) async fn ask<T: DeserializeOwned>(
    reasoning: &dyn ReasoningService,
    stage: StageName,
    prompt: StructuredPrompt,
) -> Result<StageExecution<T>, StageFailure> {
    let response = reasoning
        .complete(&prompt)
        .await
        .map_err(|e| StageFailure::reasoning(stage, e.to_string()))?;
    let output = serde_json::from_value::<T>(response.clone())
        .map_err(|e| StageFailure::malformed(stage, e.to_string()))?;
    Ok(StageExecution {
        output,
        trace: Some(StageTrace {
            request: prompt.to_value(),
            response,
        }),
    })
}
