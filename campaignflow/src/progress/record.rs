//! Progress records and the events that carry them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{CampaignResult, RunStatus, StageName, StageResult};
use crate::utils::{now_utc, Timestamp};

/// The latest state of a run, as seen by pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Run the record belongs to.
    pub run_id: Uuid,
    /// Normalized subject key.
    pub subject_key: String,
    /// Run status.
    pub status: RunStatus,
    /// Completion percentage, non-decreasing while the run is active.
    pub percentage: u8,
    /// Human-readable message.
    pub message: String,
    /// Stage currently executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageName>,
    /// Completed stages so far.
    #[serde(default)]
    pub stages: Vec<StageResult>,
    /// Final result, once complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<CampaignResult>>,
    /// Error message, once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the record was produced.
    pub updated_at: Timestamp,
}

impl ProgressRecord {
    /// Creates a pending record at 0%.
    #[must_use]
    pub fn pending(run_id: Uuid, subject_key: impl Into<String>) -> Self {
        Self {
            run_id,
            subject_key: subject_key.into(),
            status: RunStatus::Pending,
            percentage: 0,
            message: "Queued".to_string(),
            stage: None,
            stages: Vec::new(),
            result: None,
            error: None,
            updated_at: now_utc(),
        }
    }

    /// Returns true once the run has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// What happened to produce a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    /// Run accepted.
    RunStarted,
    /// A stage began.
    StageStarted,
    /// A stage finished.
    StageCompleted,
    /// A non-fatal problem was recorded.
    Degraded,
    /// The run finished with a result.
    RunCompleted,
    /// The run aborted.
    RunFailed,
}

impl ProgressEventKind {
    /// Dotted event type, e.g. `"stage.completed"`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted => "run.started",
            Self::StageStarted => "stage.started",
            Self::StageCompleted => "stage.completed",
            Self::Degraded => "run.degraded",
            Self::RunCompleted => "run.completed",
            Self::RunFailed => "run.failed",
        }
    }
}

/// A full record snapshot emitted at a transition.
///
/// Carrying the whole record lets stores apply it with a single replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// What happened.
    pub kind: ProgressEventKind,
    /// The record after the transition.
    pub record: ProgressRecord,
}

impl ProgressEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(kind: ProgressEventKind, record: ProgressRecord) -> Self {
        Self { kind, record }
    }

    /// The subject key the event belongs to.
    #[must_use]
    pub fn subject_key(&self) -> &str {
        &self.record.subject_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_record() {
        let record = ProgressRecord::pending(Uuid::nil(), "acme.io");
        assert_eq!(record.percentage, 0);
        assert_eq!(record.status, RunStatus::Pending);
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ProgressRecord::pending(Uuid::nil(), "acme.io");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["subjectKey"], "acme.io");
        assert_eq!(json["status"], "pending");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_event_types() {
        assert_eq!(ProgressEventKind::StageCompleted.event_type(), "stage.completed");
        assert_eq!(ProgressEventKind::RunFailed.event_type(), "run.failed");
    }
}
