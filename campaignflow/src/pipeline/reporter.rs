//! Run state plus progress emission.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::{CampaignResult, Degradation, PipelineRun, RunStatus, StageName, StageResult};
use crate::progress::{ProgressEvent, ProgressEventKind, ProgressRecord, ProgressSink};
use crate::utils::now_utc;

/// Percentage reported when `stage` starts.
pub(crate) const fn start_percentage(stage: StageName) -> u8 {
    match stage {
        StageName::WebsiteAnalysis => 5,
        StageName::PersonaGeneration => 20,
        StageName::PersonaRanking => 35,
        StageName::FilterDerivation => 50,
        StageName::LeadSourcing => 60,
        StageName::ContentGeneration => 80,
        StageName::Persistence => 95,
    }
}

/// Percentage reported when `stage` finishes.
pub(crate) const fn end_percentage(stage: StageName) -> u8 {
    match stage {
        StageName::WebsiteAnalysis => 20,
        StageName::PersonaGeneration => 35,
        StageName::PersonaRanking => 50,
        StageName::FilterDerivation => 60,
        StageName::LeadSourcing => 80,
        StageName::ContentGeneration => 95,
        StageName::Persistence => 99,
    }
}

/// Owns the [`PipelineRun`] and publishes a snapshot at every transition.
///
/// The reported percentage never decreases.
pub(crate) struct ProgressReporter {
    run: PipelineRun,
    percentage: u8,
    message: String,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    pub(crate) fn new(run_id: Uuid, subject_key: &str, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            run: PipelineRun::new(run_id, subject_key),
            percentage: 0,
            message: "Queued".to_string(),
            sink,
        }
    }

    pub(crate) fn run(&self) -> &PipelineRun {
        &self.run
    }

    pub(crate) async fn started(&mut self) {
        self.run.status = RunStatus::Running;
        self.publish(ProgressEventKind::RunStarted, 1, "Campaign generation started".to_string(), None)
            .await;
    }

    pub(crate) async fn stage_started(&mut self, stage: StageName) {
        self.run.begin_stage(stage);
        self.publish(
            ProgressEventKind::StageStarted,
            start_percentage(stage),
            format!("{}...", stage.label()),
            None,
        )
        .await;
    }

    pub(crate) async fn stage_finished(&mut self, result: StageResult) {
        let stage = result.stage;
        let degradations = result.degradations.clone();
        let message = if result.is_success() {
            format!("{} done", stage.label())
        } else {
            format!("{} failed", stage.label())
        };
        self.run.record(result);
        self.publish(ProgressEventKind::StageCompleted, end_percentage(stage), message, None)
            .await;

        for degradation in degradations {
            self.degraded(&degradation).await;
        }
    }

    async fn degraded(&mut self, degradation: &Degradation) {
        let percentage = self.percentage;
        self.publish(
            ProgressEventKind::Degraded,
            percentage,
            degradation.message.clone(),
            None,
        )
        .await;
    }

    pub(crate) async fn completed(&mut self, result: &CampaignResult) {
        self.run.complete(result.clone());
        self.publish(
            ProgressEventKind::RunCompleted,
            100,
            format!("Campaign ready with {} leads", result.leads.len()),
            None,
        )
        .await;
    }

    /// Marks the run failed. A completed result, if any, is kept on the record.
    pub(crate) async fn failed(&mut self, error: &str, result: Option<&CampaignResult>) {
        self.run.fail(error);
        if let Some(result) = result {
            self.run.result = Some(Box::new(result.clone()));
        }
        let percentage = self.percentage;
        self.publish(
            ProgressEventKind::RunFailed,
            percentage,
            format!("Campaign generation failed: {error}"),
            Some(error.to_string()),
        )
        .await;
    }

    async fn publish(
        &mut self,
        kind: ProgressEventKind,
        percentage: u8,
        message: String,
        error: Option<String>,
    ) {
        self.percentage = self.percentage.max(percentage.min(100));
        self.message = message;

        let record = ProgressRecord {
            run_id: self.run.run_id,
            subject_key: self.run.subject_key.clone(),
            status: self.run.status,
            percentage: self.percentage,
            message: self.message.clone(),
            stage: self.run.current_stage,
            stages: self.run.stages.clone(),
            result: self.run.result.clone(),
            error,
            updated_at: now_utc(),
        };
        debug!(
            run_id = %record.run_id,
            event_type = kind.event_type(),
            percentage = record.percentage,
            "Publishing progress"
        );
        self.sink.emit(ProgressEvent::new(kind, record)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DegradationKind, StageStatus};
    use crate::progress::CollectingProgressSink;
    use crate::testing::assert_monotonic;

    #[test]
    fn test_schedule_is_increasing() {
        let mut previous = 0;
        for stage in [
            StageName::WebsiteAnalysis,
            StageName::PersonaGeneration,
            StageName::PersonaRanking,
            StageName::FilterDerivation,
            StageName::LeadSourcing,
            StageName::ContentGeneration,
            StageName::Persistence,
        ] {
            assert!(start_percentage(stage) >= previous);
            assert!(end_percentage(stage) > start_percentage(stage));
            previous = end_percentage(stage);
        }
    }

    #[tokio::test]
    async fn test_percentage_never_decreases() {
        let sink = Arc::new(CollectingProgressSink::new());
        let mut reporter = ProgressReporter::new(Uuid::nil(), "acme.io", sink.clone());

        reporter.started().await;
        reporter.stage_started(StageName::ContentGeneration).await;
        reporter.stage_started(StageName::WebsiteAnalysis).await;

        assert_eq!(sink.percentages(), vec![1, 80, 80]);
        assert_monotonic(&sink.percentages());
    }

    #[tokio::test]
    async fn test_stage_degradations_are_published() {
        let sink = Arc::new(CollectingProgressSink::new());
        let mut reporter = ProgressReporter::new(Uuid::nil(), "acme.io", sink.clone());
        let start = now_utc();
        let result = StageResult::completed(StageName::LeadSourcing, start, start, serde_json::json!({}))
            .with_degradations(vec![Degradation::new(DegradationKind::SourceTimeout, "job timed out")]);

        reporter.stage_finished(result).await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, ProgressEventKind::Degraded);
        assert_eq!(events[1].record.message, "job timed out");
        assert_eq!(reporter.run().stages[0].status, StageStatus::Degraded);
    }

    #[tokio::test]
    async fn test_failure_keeps_result() {
        let sink = Arc::new(CollectingProgressSink::new());
        let mut reporter = ProgressReporter::new(Uuid::nil(), "acme.io", sink.clone());
        let result = crate::testing::fixtures::campaign_result("acme.io");

        reporter.failed("store down", Some(&result)).await;

        let last = sink.last().unwrap();
        assert_eq!(last.record.status, RunStatus::Failed);
        assert_eq!(last.record.error.as_deref(), Some("store down"));
        assert!(last.record.result.is_some());
    }
}
