//! Stage results, run state and the final campaign result.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{CompanyProfile, Persona, PersonaRanking, PersonalizedOutreach};
use super::filters::FilterSet;
use super::leads::EnrichedLead;
use super::status::{RunStatus, StageName};
use crate::enrichment::EnrichmentSummary;
use crate::utils::{elapsed_ms, now_utc, Timestamp};

/// Outcome of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Stage produced its full output.
    Completed,
    /// Stage produced output but recorded at least one degradation.
    Degraded,
    /// Stage failed.
    Failed,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Degraded => write!(f, "degraded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Categories of non-fatal trouble a run recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// The search job did not finish within the poll budget.
    SourceTimeout,
    /// The search provider reported an explicit error.
    SourceError,
    /// The enrichment loop stopped on a safety limit before reaching target.
    EnrichmentExhausted,
    /// Content for one lead could not be generated.
    GenerationFailure,
    /// Placeholder leads were substituted for an empty sourcing result.
    SyntheticLeads,
}

/// A recorded degradation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    /// Category.
    pub kind: DegradationKind,
    /// Details.
    pub message: String,
}

impl Degradation {
    /// Creates a degradation entry.
    #[must_use]
    pub fn new(kind: DegradationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Raw request/response of a reasoning call, kept when trace capture is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    /// The prompt sent.
    pub request: serde_json::Value,
    /// The raw response received.
    pub response: serde_json::Value,
}

/// Record of one stage of a run. Immutable once appended to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// Which stage.
    pub stage: StageName,
    /// Outcome.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: Timestamp,
    /// When the stage ended.
    pub ended_at: Timestamp,
    /// Wall-clock duration.
    pub duration_ms: u64,
    /// Structured output payload.
    #[serde(default)]
    pub output: serde_json::Value,
    /// Non-fatal problems encountered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
    /// Raw reasoning exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<StageTrace>,
    /// Error message if failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Creates a completed stage result.
    #[must_use]
    pub fn completed(
        stage: StageName,
        started_at: Timestamp,
        ended_at: Timestamp,
        output: serde_json::Value,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            started_at,
            ended_at,
            duration_ms: elapsed_ms(started_at, ended_at),
            output,
            degradations: Vec::new(),
            trace: None,
            error: None,
        }
    }

    /// Creates a failed stage result ending now.
    #[must_use]
    pub fn failed(stage: StageName, started_at: Timestamp, error: impl Into<String>) -> Self {
        let ended_at = now_utc();
        Self {
            stage,
            status: StageStatus::Failed,
            started_at,
            ended_at,
            duration_ms: elapsed_ms(started_at, ended_at),
            output: serde_json::Value::Null,
            degradations: Vec::new(),
            trace: None,
            error: Some(error.into()),
        }
    }

    /// Attaches degradations; a completed stage becomes degraded.
    #[must_use]
    pub fn with_degradations(mut self, degradations: Vec<Degradation>) -> Self {
        if !degradations.is_empty() && self.status == StageStatus::Completed {
            self.status = StageStatus::Degraded;
        }
        self.degradations.extend(degradations);
        self
    }

    /// Attaches a reasoning trace.
    #[must_use]
    pub fn with_trace(mut self, trace: Option<StageTrace>) -> Self {
        self.trace = trace;
        self
    }

    /// Returns true unless the stage failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status != StageStatus::Failed
    }
}

/// Where the run's filter set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSource {
    /// Supplied with the request; enrichment started early.
    Caller,
    /// Derived by the filter derivation stage.
    Derived,
}

/// The finished campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResult {
    /// Run that produced this campaign.
    pub run_id: Uuid,
    /// Normalized subject key.
    pub subject_key: String,
    /// Identifier assigned by the campaign store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    /// Company profile.
    pub profile: CompanyProfile,
    /// Generated personas.
    pub personas: Vec<Persona>,
    /// Ranking and selection.
    pub ranking: PersonaRanking,
    /// Filters the leads were sourced with.
    pub filters: FilterSet,
    /// Origin of `filters`.
    pub filter_source: FilterSource,
    /// Filters derived by stage 4 (equal to `filters` unless caller-supplied).
    pub derived_filters: FilterSet,
    /// Leads the outreach was generated for.
    pub leads: Vec<EnrichedLead>,
    /// Per-lead outreach; never longer than `leads`.
    pub outreach: Vec<PersonalizedOutreach>,
    /// Cost audit of the enrichment loop.
    pub enrichment: EnrichmentSummary,
    /// Completed stages, in order.
    pub stages: Vec<StageResult>,
    /// All degradations across the run.
    #[serde(default)]
    pub degradations: Vec<Degradation>,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run finished.
    pub completed_at: Timestamp,
}

impl CampaignResult {
    /// Returns true if any lead is synthetic.
    #[must_use]
    pub fn has_synthetic_leads(&self) -> bool {
        self.leads.iter().any(EnrichedLead::is_synthetic)
    }

    /// Returns the stage result for `stage`, if present.
    #[must_use]
    pub fn stage(&self, stage: StageName) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// One invocation of the pipeline, mutated only by the sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    /// Run identifier.
    pub run_id: Uuid,
    /// Normalized subject key.
    pub subject_key: String,
    /// When the run was accepted.
    pub started_at: Timestamp,
    /// Current status.
    pub status: RunStatus,
    /// Stage currently executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageName>,
    /// Completed stages, in order.
    #[serde(default)]
    pub stages: Vec<StageResult>,
    /// Final result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<CampaignResult>>,
    /// Error message of a failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineRun {
    /// Creates a pending run.
    #[must_use]
    pub fn new(run_id: Uuid, subject_key: impl Into<String>) -> Self {
        Self {
            run_id,
            subject_key: subject_key.into(),
            started_at: now_utc(),
            status: RunStatus::Pending,
            current_stage: None,
            stages: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// Marks `stage` as executing.
    pub fn begin_stage(&mut self, stage: StageName) {
        self.status = RunStatus::Running;
        self.current_stage = Some(stage);
    }

    /// Appends a stage result.
    pub fn record(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    /// Moves the run to `complete`.
    pub fn complete(&mut self, result: CampaignResult) {
        self.status = RunStatus::Complete;
        self.current_stage = None;
        self.result = Some(Box::new(result));
    }

    /// Moves the run to `failed`.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
    }
}
