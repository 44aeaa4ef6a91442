//! Error types for campaign runs.
//!
//! Only [`StageFailure`] and persistence failures abort a run. Source and
//! provider errors are recovered from by the enrichment loop and the
//! sequencer, which record them as degradations instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::{CampaignResult, StageName};

/// Run-fatal errors returned by the pipeline.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// An analysis stage failed.
    #[error("{0}")]
    Stage(#[from] StageFailure),

    /// The finished campaign could not be stored. The result is attached so
    /// it is never silently dropped.
    #[error("Persistence failed: {message}")]
    Persistence {
        /// What the store reported.
        message: String,
        /// The completed campaign.
        result: Box<CampaignResult>,
    },

    /// The request was rejected before the run started.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A background task failed unexpectedly.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CampaignError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Stage(_) => "STAGE_FAILURE",
            Self::Persistence { .. } => "PERSISTENCE_FAILURE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The completed campaign carried by a persistence failure.
    #[must_use]
    pub fn completed_result(&self) -> Option<&CampaignResult> {
        match self {
            Self::Persistence { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = match self {
            Self::Stage(failure) => failure.to_dict(),
            _ => HashMap::new(),
        };
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Self::Persistence { result, .. } = self {
            map.insert("run_id".to_string(), serde_json::json!(result.run_id));
        }
        map
    }
}

/// How an analysis stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageFailureKind {
    /// The subject content could not be fetched.
    Fetch,
    /// The reasoning call itself errored.
    Reasoning,
    /// The reasoning output did not match the expected shape.
    MalformedOutput,
    /// The output parsed but violates a stage invariant.
    InvalidOutput,
}

impl std::fmt::Display for StageFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Reasoning => write!(f, "reasoning"),
            Self::MalformedOutput => write!(f, "malformed_output"),
            Self::InvalidOutput => write!(f, "invalid_output"),
        }
    }
}

/// An analysis stage failed. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Stage '{stage}' failed ({kind}): {message}")]
pub struct StageFailure {
    /// Which stage.
    pub stage: StageName,
    /// Failure category.
    pub kind: StageFailureKind,
    /// Details.
    pub message: String,
}

impl StageFailure {
    /// Creates a stage failure.
    #[must_use]
    pub fn new(stage: StageName, kind: StageFailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    /// Content fetch failed.
    #[must_use]
    pub fn fetch(stage: StageName, message: impl Into<String>) -> Self {
        Self::new(stage, StageFailureKind::Fetch, message)
    }

    /// Reasoning call failed.
    #[must_use]
    pub fn reasoning(stage: StageName, message: impl Into<String>) -> Self {
        Self::new(stage, StageFailureKind::Reasoning, message)
    }

    /// Reasoning output could not be parsed.
    #[must_use]
    pub fn malformed(stage: StageName, message: impl Into<String>) -> Self {
        Self::new(stage, StageFailureKind::MalformedOutput, message)
    }

    /// Reasoning output broke an invariant.
    #[must_use]
    pub fn invalid(stage: StageName, message: impl Into<String>) -> Self {
        Self::new(stage, StageFailureKind::InvalidOutput, message)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage".to_string(), serde_json::json!(self.stage.as_str()));
        map.insert("kind".to_string(), serde_json::json!(self.kind.to_string()));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map
    }
}

/// Errors from an external provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The request never got an answer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The provider is missing required configuration.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::Http { status, .. } => {
                map.insert("status".to_string(), serde_json::json!(status));
                "http"
            }
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::NotConfigured(_) => "not_configured",
        };
        map.insert("kind".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors from a candidate source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The search job did not finish within the poll budget.
    #[error("Search job timed out after {attempts} attempts ({elapsed_ms}ms)")]
    Timeout {
        /// Poll attempts made.
        attempts: u32,
        /// Time spent polling.
        elapsed_ms: u64,
    },

    /// The provider call failed.
    #[error("Search provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The search job reported an explicit error.
    #[error("Search job failed: {0}")]
    Job(String),
}

impl SourceError {
    /// Returns true for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or inconsistent.
    #[error("Invalid configuration for '{field}': {message}")]
    Invalid {
        /// Offending field path.
        field: String,
        /// What is wrong.
        message: String,
    },

    /// The config file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for the expected shape.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_display() {
        let failure = StageFailure::malformed(StageName::PersonaGeneration, "expected array");
        assert_eq!(
            failure.to_string(),
            "Stage 'persona_generation' failed (malformed_output): expected array"
        );
    }

    #[test]
    fn test_stage_failure_to_dict() {
        let failure = StageFailure::fetch(StageName::WebsiteAnalysis, "connection refused");
        let dict = failure.to_dict();
        assert_eq!(dict.get("stage"), Some(&serde_json::json!("website_analysis")));
        assert_eq!(dict.get("kind"), Some(&serde_json::json!("fetch")));
    }

    #[test]
    fn test_campaign_error_from_stage_failure() {
        let err: CampaignError =
            StageFailure::reasoning(StageName::PersonaRanking, "rate limited").into();
        assert_eq!(err.code(), "STAGE_FAILURE");
        assert!(err.completed_result().is_none());
        let dict = err.to_dict();
        assert_eq!(dict.get("stage"), Some(&serde_json::json!("persona_ranking")));
        assert_eq!(dict.get("code"), Some(&serde_json::json!("STAGE_FAILURE")));
    }

    #[test]
    fn test_source_error_from_provider() {
        let err: SourceError = ProviderError::Http {
            status: 503,
            message: "unavailable".to_string(),
        }
        .into();
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "Search provider error: HTTP 503: unavailable");
    }

    #[test]
    fn test_provider_error_to_dict() {
        let dict = ProviderError::Http {
            status: 429,
            message: "slow down".to_string(),
        }
        .to_dict();
        assert_eq!(dict.get("status"), Some(&serde_json::json!(429)));
        assert_eq!(dict.get("kind"), Some(&serde_json::json!("http")));
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::invalid("poll.max_attempts", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'poll.max_attempts': must be at least 1"
        );
    }
}
