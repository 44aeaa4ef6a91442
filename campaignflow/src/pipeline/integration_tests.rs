//! End-to-end runs over in-memory collaborators.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::core::{LeadOrigin, OrgSizeBucket, RunStatus, StageStatus};
use crate::enrichment::StopReason;
use crate::errors::{ProviderError, StageFailureKind};
use crate::poller::PollConfig;
use crate::progress::{CollectingProgressSink, ProgressEventKind, ProgressTracker};
use crate::providers::{InMemoryCampaignStore, PromptTask};
use crate::source::{JobSearchSource, PaginatedSource};
use crate::testing::fixtures::candidates;
use crate::testing::mocks::{
    demo_reasoning, FailingStore, FakeEnricher, FakeJobProvider, FakePeopleSearch, FakeWriter,
    ScriptedReasoning, StaticFetcher,
};
use crate::testing::{
    assert_has_degradation, assert_monotonic, assert_no_degradation, assert_stage_completed,
};

struct Harness {
    fetcher: Arc<StaticFetcher>,
    reasoning: ScriptedReasoning,
    search: Arc<FakePeopleSearch>,
    enricher: Arc<FakeEnricher>,
    store: Arc<InMemoryCampaignStore>,
    writer: Option<Arc<FakeWriter>>,
    config: CampaignConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            fetcher: Arc::new(StaticFetcher::acme()),
            reasoning: demo_reasoning(),
            search: Arc::new(FakePeopleSearch::new(candidates(20))),
            enricher: Arc::new(FakeEnricher::verifying_all()),
            store: Arc::new(InMemoryCampaignStore::new()),
            writer: None,
            config: CampaignConfig::default(),
        }
    }

    fn collaborators(&self, source: Arc<dyn CandidateSource>) -> Collaborators {
        let collaborators = Collaborators::new(
            self.fetcher.clone(),
            Arc::new(self.reasoning.clone()),
            source,
            self.enricher.clone(),
            self.store.clone(),
        );
        match &self.writer {
            Some(writer) => collaborators.with_writer(writer.clone()),
            None => collaborators,
        }
    }

    fn pipeline(&self) -> CampaignPipeline {
        let source = Arc::new(PaginatedSource::new(self.search.clone(), 100));
        CampaignPipeline::new(self.collaborators(source), &self.config)
    }
}

#[tokio::test]
async fn test_full_run_produces_campaign() {
    let harness = Harness::new();
    let tracker = ProgressTracker::default();

    let result = harness
        .pipeline()
        .run(CampaignRequest::new("https://www.acme.io/").with_target_leads(3), tracker.sink())
        .await
        .unwrap();

    assert_eq!(result.subject_key, "acme.io");
    assert_eq!(result.profile.company_name, "Acme");
    assert_eq!(result.personas.len(), 2);
    assert_eq!(result.ranking.selected.id, "ops-leader");
    assert_eq!(result.filter_source, FilterSource::Derived);
    assert_eq!(result.filters, result.derived_filters);
    assert_eq!(result.leads.len(), 3);
    assert!(result.leads.iter().all(|l| l.origin == LeadOrigin::Provider));
    assert_eq!(result.outreach.len(), 3);
    assert_eq!(result.outreach[0].content.subject, "Quick idea for Candidate");
    assert_eq!(result.enrichment.stop_reason, StopReason::TargetReached);
    assert!(result.degradations.is_empty());

    let order: Vec<StageName> = result.stages.iter().map(|s| s.stage).collect();
    assert_eq!(
        order,
        vec![
            StageName::WebsiteAnalysis,
            StageName::PersonaGeneration,
            StageName::PersonaRanking,
            StageName::FilterDerivation,
            StageName::LeadSourcing,
            StageName::ContentGeneration,
            StageName::Persistence,
        ]
    );
    for stage in &order {
        assert_stage_completed(&result, *stage);
    }

    let campaign_id = result.campaign_id.clone().unwrap();
    assert_eq!(harness.store.get(&campaign_id).map(|c| c.run_id), Some(result.run_id));

    let record = tracker.read("acme.io").unwrap();
    assert_eq!(record.status, RunStatus::Complete);
    assert_eq!(record.percentage, 100);
    assert_eq!(record.result.map(|r| r.run_id), Some(result.run_id));
}

#[tokio::test]
async fn test_derived_filters_drive_search() {
    let harness = Harness::new();

    harness
        .pipeline()
        .run(CampaignRequest::new("acme.io").with_target_leads(2), Arc::new(CollectingProgressSink::new()))
        .await
        .unwrap();

    let searched = harness.search.filters();
    assert!(!searched.is_empty());
    assert_eq!(searched[0].title_keywords, vec!["VP Operations", "Head of Operations"]);
    assert_eq!(searched[0].org_sizes, vec![OrgSizeBucket::Medium, OrgSizeBucket::MidMarket]);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ordered() {
    let harness = Harness::new();
    let sink = Arc::new(CollectingProgressSink::new());

    harness
        .pipeline()
        .run(CampaignRequest::new("acme.io").with_target_leads(2), sink.clone())
        .await
        .unwrap();

    assert_monotonic(&sink.percentages());
    let events = sink.events();
    assert_eq!(events.first().map(|e| e.kind), Some(ProgressEventKind::RunStarted));
    assert_eq!(events.last().map(|e| e.kind), Some(ProgressEventKind::RunCompleted));
    assert_eq!(events.last().map(|e| e.record.percentage), Some(100));
    let stage_starts = events
        .iter()
        .filter(|e| e.kind == ProgressEventKind::StageStarted)
        .count();
    assert_eq!(stage_starts, 7);
}

#[tokio::test]
async fn test_stage_failure_aborts_run() {
    let mut harness = Harness::new();
    harness.fetcher = Arc::new(StaticFetcher::failing(ProviderError::Http {
        status: 503,
        message: "unavailable".to_string(),
    }));
    let sink = Arc::new(CollectingProgressSink::new());

    let err = harness
        .pipeline()
        .run(CampaignRequest::new("acme.io"), sink.clone())
        .await
        .unwrap_err();

    match &err {
        CampaignError::Stage(failure) => {
            assert_eq!(failure.stage, StageName::WebsiteAnalysis);
            assert_eq!(failure.kind, StageFailureKind::Fetch);
        }
        other => panic!("expected a stage failure, got {other:?}"),
    }
    assert_eq!(harness.reasoning.calls(PromptTask::PersonaGeneration), 0);
    assert!(harness.search.requests().is_empty());
    assert!(harness.store.is_empty());

    let last = sink.last().unwrap();
    assert_eq!(last.kind, ProgressEventKind::RunFailed);
    assert_eq!(last.record.status, RunStatus::Failed);
    assert_eq!(last.record.stages.len(), 1);
    assert_eq!(last.record.stages[0].status, StageStatus::Failed);
    assert_monotonic(&sink.percentages());
}

#[tokio::test]
async fn test_unknown_ranked_persona_fails_ranking() {
    let mut harness = Harness::new();
    harness.reasoning = demo_reasoning().with_response(
        PromptTask::PersonaRanking,
        json!({"rankings": [{"personaId": "ghost", "score": 99, "rationale": "?"}]}),
    );

    let err = harness
        .pipeline()
        .run(CampaignRequest::new("acme.io"), Arc::new(CollectingProgressSink::new()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "STAGE_FAILURE");
    match err {
        CampaignError::Stage(failure) => {
            assert_eq!(failure.stage, StageName::PersonaRanking);
            assert_eq!(failure.kind, StageFailureKind::InvalidOutput);
        }
        other => panic!("expected a stage failure, got {other:?}"),
    }
    assert_eq!(harness.reasoning.calls(PromptTask::FilterDerivation), 0);
}

#[tokio::test(start_paused = true)]
async fn test_job_timeout_falls_back_to_synthetic_leads() {
    let harness = Harness::new();
    let provider = Arc::new(FakeJobProvider::never_completes());
    let source = Arc::new(JobSearchSource::new(provider.clone(), PollConfig::default(), 100));
    let pipeline = CampaignPipeline::new(harness.collaborators(source), &harness.config);

    let result = pipeline
        .run(CampaignRequest::new("acme.io").with_target_leads(4), Arc::new(CollectingProgressSink::new()))
        .await
        .unwrap();

    assert_eq!(provider.status_calls(), 3);
    assert_eq!(result.leads.len(), 4);
    assert!(result.has_synthetic_leads());
    assert!(result.leads.iter().all(|l| l.origin == LeadOrigin::Synthetic));
    assert_eq!(result.outreach.len(), 4);
    assert_has_degradation(&result, DegradationKind::SourceTimeout);
    assert_has_degradation(&result, DegradationKind::SyntheticLeads);
    assert_eq!(
        result.stage(StageName::LeadSourcing).map(|s| s.status),
        Some(StageStatus::Degraded)
    );
    assert!(result.campaign_id.is_some());
}

#[tokio::test]
async fn test_no_verified_contacts_uses_synthetic_leads() {
    let mut harness = Harness::new();
    harness.enricher = Arc::new(FakeEnricher::verifying_none());

    let result = harness
        .pipeline()
        .run(CampaignRequest::new("acme.io").with_target_leads(2), Arc::new(CollectingProgressSink::new()))
        .await
        .unwrap();

    assert_eq!(result.leads.len(), 2);
    assert!(result.has_synthetic_leads());
    assert_eq!(result.enrichment.stop_reason, StopReason::CandidateBudget);
    assert_has_degradation(&result, DegradationKind::EnrichmentExhausted);
    assert_has_degradation(&result, DegradationKind::SyntheticLeads);
}

#[tokio::test]
async fn test_synthetic_leads_capped_at_candidate_ceiling() {
    let mut harness = Harness::new();
    harness.enricher = Arc::new(FakeEnricher::verifying_none());
    harness.config.pipeline.max_target_leads = 1_000;
    harness.config.enrichment.absolute_candidate_ceiling = 25;

    let result = harness
        .pipeline()
        .run(CampaignRequest::new("acme.io").with_target_leads(400), Arc::new(CollectingProgressSink::new()))
        .await
        .unwrap();

    assert!(result.has_synthetic_leads());
    assert_eq!(result.leads.len(), 25);
    assert_has_degradation(&result, DegradationKind::SyntheticLeads);
}

#[tokio::test(start_paused = true)]
async fn test_caller_filters_start_enrichment_early() {
    let mut harness = Harness::new();
    harness.reasoning = demo_reasoning().with_delay(Duration::from_secs(1));
    let filters = FilterSet::new()
        .with_titles(["Sr. Controller"])
        .with_locations(["Austin, TX"]);

    let result = harness
        .pipeline()
        .run(
            CampaignRequest::new("acme.io").with_filters(filters).with_target_leads(3),
            Arc::new(CollectingProgressSink::new()),
        )
        .await
        .unwrap();

    assert_eq!(result.filter_source, FilterSource::Caller);
    assert_eq!(result.filters.title_keywords, vec!["Senior Controller"]);
    assert_eq!(result.filters.locations, vec!["Austin, Texas"]);
    assert_eq!(result.derived_filters.title_keywords, vec!["VP Operations", "Head of Operations"]);
    assert_eq!(harness.search.filters()[0], result.filters);

    let website = result.stage(StageName::WebsiteAnalysis).unwrap();
    assert!(result.enrichment.started_at <= website.ended_at);
    assert_eq!(result.leads.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stage_failure_cancels_early_enrichment() {
    let mut harness = Harness::new();
    harness.search = Arc::new(FakePeopleSearch::new(candidates(20)).with_delay(Duration::from_secs(10)));
    harness.reasoning = demo_reasoning()
        .with_delay(Duration::from_secs(1))
        .with_failure(PromptTask::PersonaGeneration, ProviderError::Transport("reset".to_string()));

    let err = harness
        .pipeline()
        .run(
            CampaignRequest::new("acme.io").with_filters(FilterSet::new().with_titles(["CTO"])),
            Arc::new(CollectingProgressSink::new()),
        )
        .await
        .unwrap_err();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(err.code(), "STAGE_FAILURE");
    assert_eq!(harness.enricher.calls(), 0);
}

#[tokio::test]
async fn test_writer_failure_drops_one_entry() {
    let mut harness = Harness::new();
    harness.writer = Some(Arc::new(FakeWriter::new().failing_for("Candidate 2")));

    let result = harness
        .pipeline()
        .run(CampaignRequest::new("acme.io").with_target_leads(5), Arc::new(CollectingProgressSink::new()))
        .await
        .unwrap();

    assert_eq!(result.leads.len(), 5);
    assert_eq!(result.outreach.len(), 4);
    assert!(result.outreach.iter().all(|o| o.lead.name() != "Candidate 2"));
    assert_has_degradation(&result, DegradationKind::GenerationFailure);
    assert_no_degradation(&result, DegradationKind::SyntheticLeads);
    assert!(result.campaign_id.is_some());
}

#[tokio::test]
async fn test_persistence_failure_keeps_result() {
    let harness = Harness::new();
    let store = Arc::new(FailingStore::new());
    let source = Arc::new(PaginatedSource::new(harness.search.clone(), 100));
    let collaborators = Collaborators::new(
        harness.fetcher.clone(),
        Arc::new(harness.reasoning.clone()),
        source,
        harness.enricher.clone(),
        store.clone(),
    );
    let pipeline = CampaignPipeline::new(collaborators, &harness.config);
    let tracker = ProgressTracker::default();

    let err = pipeline
        .run(CampaignRequest::new("acme.io").with_target_leads(2), tracker.sink())
        .await
        .unwrap_err();

    assert_eq!(store.attempts(), 1);
    assert_eq!(err.code(), "PERSISTENCE_FAILURE");
    let result = err.completed_result().unwrap();
    assert_eq!(result.leads.len(), 2);
    assert_eq!(result.outreach.len(), 2);
    assert!(result.campaign_id.is_none());

    let record = tracker.read("acme.io").unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.result.is_some());
}

#[tokio::test]
async fn test_trace_capture_records_reasoning_io() {
    let mut harness = Harness::new();
    harness.config = CampaignConfig::default()
        .with_pipeline(PipelineConfig::default().with_trace_capture(true));

    let result = harness
        .pipeline()
        .run(CampaignRequest::new("acme.io").with_target_leads(1), Arc::new(CollectingProgressSink::new()))
        .await
        .unwrap();

    for stage in StageName::ANALYSIS {
        assert!(result.stage(stage).and_then(|s| s.trace.as_ref()).is_some(), "no trace for {stage}");
    }
    assert!(result.stage(StageName::LeadSourcing).unwrap().trace.is_none());
}

#[tokio::test]
async fn test_invalid_subject_is_rejected_before_any_call() {
    let harness = Harness::new();
    let sink = Arc::new(CollectingProgressSink::new());

    let err = harness
        .pipeline()
        .run(CampaignRequest::new("http://"), sink.clone())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "INVALID_REQUEST");
    assert_eq!(harness.fetcher.calls(), 0);
    assert!(sink.is_empty());
}
