//! The campaign pipeline sequencer.
//!
//! Drives the four analysis stages in dependency order, sources leads
//! (overlapping with the stages when the caller supplies filters), fans out
//! content generation and stores the finished campaign. Every transition is
//! published to a [`ProgressSink`].

mod early;
mod reporter;

#[cfg(test)]
mod integration_tests;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::CampaignConfig;
use crate::core::{
    CampaignContext, CampaignResult, Degradation, DegradationKind, EnrichedLead, FilterSet,
    FilterSource, StageName, StageResult,
};
use crate::enrichment::{EnrichmentLoop, EnrichmentOutcome, EnrichmentSummary};
use crate::errors::{CampaignError, ConfigError};
use crate::generation::{ContentGenerator, GenerationReport};
use crate::normalize::{DefaultNormalizer, Normalizer};
use crate::progress::ProgressSink;
use crate::providers::{
    CampaignStore, ContactEnricher, ContentFetcher, ContentWriter, ReasoningContentWriter,
    ReasoningService,
};
use crate::source::CandidateSource;
use crate::stages::{
    run_stage, AnalysisStage, FilterDerivationStage, PersonaGenerationStage, PersonaRankingStage,
    RankingInput, SyntheticLeadGenerator, WebsiteAnalysisStage,
};
use crate::utils::{generate_run_id, now_utc, Timestamp};

use early::EarlyEnrichment;
use reporter::ProgressReporter;

/// Sequencer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Leads to source when the request does not say.
    #[serde(default = "default_target_leads")]
    pub target_leads: usize,
    /// Largest target a request may ask for.
    #[serde(default = "default_max_target_leads")]
    pub max_target_leads: usize,
    /// Personas requested from persona generation.
    #[serde(default = "default_persona_count")]
    pub persona_count: usize,
    /// Keep raw reasoning request/response on each stage result.
    #[serde(default)]
    pub trace_capture: bool,
    /// Start enrichment before the stages when filters are supplied.
    #[serde(default = "default_early_start")]
    pub early_start: bool,
    /// Website body text sent to analysis, in characters.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_target_leads() -> usize {
    10
}

fn default_max_target_leads() -> usize {
    100
}

fn default_persona_count() -> usize {
    5
}

fn default_early_start() -> bool {
    true
}

fn default_max_content_chars() -> usize {
    12_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_leads: default_target_leads(),
            max_target_leads: default_max_target_leads(),
            persona_count: default_persona_count(),
            trace_capture: false,
            early_start: default_early_start(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl PipelineConfig {
    /// Sets the default lead target.
    #[must_use]
    pub fn with_target_leads(mut self, target: usize) -> Self {
        self.target_leads = target;
        self
    }

    /// Sets the largest target a request may ask for.
    #[must_use]
    pub fn with_max_target_leads(mut self, max: usize) -> Self {
        self.max_target_leads = max;
        self
    }

    /// Enables or disables trace capture.
    #[must_use]
    pub fn with_trace_capture(mut self, enabled: bool) -> Self {
        self.trace_capture = enabled;
        self
    }

    /// Enables or disables early enrichment.
    #[must_use]
    pub fn with_early_start(mut self, enabled: bool) -> Self {
        self.early_start = enabled;
        self
    }

    /// Checks the config for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_leads == 0 {
            return Err(ConfigError::invalid("pipeline.target_leads", "must be positive"));
        }
        if self.max_target_leads < self.target_leads {
            return Err(ConfigError::invalid(
                "pipeline.max_target_leads",
                "must be at least pipeline.target_leads",
            ));
        }
        if self.persona_count == 0 {
            return Err(ConfigError::invalid("pipeline.persona_count", "must be positive"));
        }
        if self.max_content_chars == 0 {
            return Err(ConfigError::invalid("pipeline.max_content_chars", "must be positive"));
        }
        Ok(())
    }
}

/// A request to generate a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRequest {
    /// Domain or URL of the company the campaign is for.
    pub subject_key: String,
    /// Pre-supplied search filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSet>,
    /// Leads to source; defaults to `pipeline.target_leads`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_leads: Option<usize>,
}

impl CampaignRequest {
    /// Creates a request for `subject` (a domain or URL).
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject_key: subject.into(),
            filters: None,
            target_leads: None,
        }
    }

    /// Supplies search filters, enabling early enrichment.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Overrides the lead target.
    #[must_use]
    pub fn with_target_leads(mut self, target: usize) -> Self {
        self.target_leads = Some(target);
        self
    }
}

/// A validated request, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRun {
    /// Run identifier.
    pub run_id: Uuid,
    /// Normalized subject key.
    pub subject_key: String,
    /// URL fetched by website analysis.
    pub url: String,
    /// Normalized caller filters.
    pub filters: Option<FilterSet>,
    /// Lead target.
    pub target: usize,
}

/// The external services a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Subject content fetcher.
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Reasoning service behind the stages.
    pub reasoning: Arc<dyn ReasoningService>,
    /// Candidate source.
    pub source: Arc<dyn CandidateSource>,
    /// Contact lookup.
    pub enricher: Arc<dyn ContactEnricher>,
    /// Outreach writer.
    pub writer: Arc<dyn ContentWriter>,
    /// Campaign store.
    pub store: Arc<dyn CampaignStore>,
    /// Text normalization policy.
    pub normalizer: Arc<dyn Normalizer>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("source", &self.source.kind())
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Bundles collaborators. Content is written through the reasoning
    /// service and text is normalized with [`DefaultNormalizer`] unless
    /// overridden.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        reasoning: Arc<dyn ReasoningService>,
        source: Arc<dyn CandidateSource>,
        enricher: Arc<dyn ContactEnricher>,
        store: Arc<dyn CampaignStore>,
    ) -> Self {
        Self {
            fetcher,
            writer: Arc::new(ReasoningContentWriter::new(reasoning.clone())),
            reasoning,
            source,
            enricher,
            store,
            normalizer: Arc::new(DefaultNormalizer::new()),
        }
    }

    /// Replaces the content writer.
    #[must_use]
    pub fn with_writer(mut self, writer: Arc<dyn ContentWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Replaces the normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }
}

/// Runs campaigns end to end.
#[derive(Clone)]
pub struct CampaignPipeline {
    config: PipelineConfig,
    website: Arc<WebsiteAnalysisStage>,
    personas: Arc<PersonaGenerationStage>,
    ranking: Arc<PersonaRankingStage>,
    filters: Arc<FilterDerivationStage>,
    synthetic: Arc<SyntheticLeadGenerator>,
    enrichment: EnrichmentLoop,
    generator: ContentGenerator,
    store: Arc<dyn CampaignStore>,
    normalizer: Arc<dyn Normalizer>,
}

impl std::fmt::Debug for CampaignPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignPipeline")
            .field("config", &self.config)
            .field("enrichment", &self.enrichment)
            .finish_non_exhaustive()
    }
}

impl CampaignPipeline {
    /// Builds a pipeline from collaborators and config.
    pub fn new(collaborators: Collaborators, config: &CampaignConfig) -> Self {
        let Collaborators {
            fetcher,
            reasoning,
            source,
            enricher,
            writer,
            store,
            normalizer,
        } = collaborators;

        Self {
            config: config.pipeline.clone(),
            website: Arc::new(WebsiteAnalysisStage::new(
                fetcher,
                reasoning.clone(),
                config.pipeline.max_content_chars,
            )),
            personas: Arc::new(PersonaGenerationStage::new(
                reasoning.clone(),
                config.pipeline.persona_count,
            )),
            ranking: Arc::new(PersonaRankingStage::new(reasoning.clone())),
            filters: Arc::new(FilterDerivationStage::new(reasoning.clone(), normalizer.clone())),
            synthetic: Arc::new(SyntheticLeadGenerator::new(reasoning)),
            enrichment: EnrichmentLoop::new(source, enricher, normalizer.clone(), config.enrichment.clone()),
            generator: ContentGenerator::new(writer, config.generation.clone()),
            store,
            normalizer,
        }
    }

    /// The sequencer settings.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalizes a domain or URL into the key runs are tracked under.
    pub fn subject_key(&self, raw: &str) -> Result<String, CampaignError> {
        self.normalizer
            .subject_key(raw)
            .ok_or_else(|| CampaignError::InvalidRequest(format!("'{raw}' is not a valid domain")))
    }

    /// Validates and normalizes a request.
    pub fn prepare(&self, request: CampaignRequest) -> Result<PreparedRun, CampaignError> {
        let subject_key = self.subject_key(&request.subject_key)?;
        let target = request.target_leads.unwrap_or(self.config.target_leads);
        if target == 0 {
            return Err(CampaignError::InvalidRequest("targetLeads must be positive".to_string()));
        }
        if target > self.config.max_target_leads {
            return Err(CampaignError::InvalidRequest(format!(
                "targetLeads must be at most {}",
                self.config.max_target_leads
            )));
        }
        let filters = request
            .filters
            .map(|f| self.normalizer.filter_set(&f))
            .filter(|f| !f.is_empty());

        Ok(PreparedRun {
            run_id: generate_run_id(),
            url: format!("https://{subject_key}"),
            subject_key,
            filters,
            target,
        })
    }

    /// Prepares and executes a request.
    pub async fn run(
        &self,
        request: CampaignRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<CampaignResult, CampaignError> {
        let prepared = self.prepare(request)?;
        self.execute(prepared, sink).await
    }

    /// Executes a prepared run, publishing progress to `sink`.
    ///
    /// Fails only on a stage failure or a persistence failure; everything
    /// else degrades the result.
    pub async fn execute(
        &self,
        prepared: PreparedRun,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<CampaignResult, CampaignError> {
        let mut reporter = ProgressReporter::new(prepared.run_id, &prepared.subject_key, sink);
        info!(
            run_id = %prepared.run_id,
            subject_key = %prepared.subject_key,
            target = prepared.target,
            caller_filters = prepared.filters.is_some(),
            "Campaign run started"
        );
        reporter.started().await;

        match self.drive(&prepared, &mut reporter).await {
            Ok(result) => {
                info!(
                    run_id = %prepared.run_id,
                    subject_key = %prepared.subject_key,
                    leads = result.leads.len(),
                    outreach = result.outreach.len(),
                    degradations = result.degradations.len(),
                    "Campaign run complete"
                );
                reporter.completed(&result).await;
                Ok(result)
            }
            Err(err) => {
                error!(
                    run_id = %prepared.run_id,
                    subject_key = %prepared.subject_key,
                    code = err.code(),
                    error = %err,
                    "Campaign run failed"
                );
                reporter.failed(&err.to_string(), err.completed_result()).await;
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        prepared: &PreparedRun,
        reporter: &mut ProgressReporter,
    ) -> Result<CampaignResult, CampaignError> {
        let started_at = reporter.run().started_at;

        // Dropped on any early return, which aborts the task.
        let early = match (&prepared.filters, self.config.early_start) {
            (Some(filters), true) => Some(EarlyEnrichment::spawn(
                self.enrichment.clone(),
                filters.clone(),
                prepared.target,
            )),
            _ => None,
        };

        let profile = self.stage(self.website.as_ref(), &prepared.url, reporter).await?;
        let personas = self.stage(self.personas.as_ref(), &profile, reporter).await?;
        let ranking_input = RankingInput {
            profile: profile.clone(),
            personas: personas.clone(),
        };
        let ranking = self.stage(self.ranking.as_ref(), &ranking_input, reporter).await?;
        let derived_filters = self.stage(self.filters.as_ref(), &ranking.selected, reporter).await?;

        let (filters, filter_source) = match &prepared.filters {
            Some(filters) => (filters.clone(), FilterSource::Caller),
            None => (derived_filters.clone(), FilterSource::Derived),
        };
        let context = CampaignContext {
            subject_key: prepared.subject_key.clone(),
            profile: profile.clone(),
            persona: ranking.selected.clone(),
        };

        reporter.stage_started(StageName::LeadSourcing).await;
        let outcome = match early {
            Some(task) => task.join().await,
            None => self.enrichment.run(&filters, prepared.target).await,
        };
        let (leads, enrichment, sourcing) = self.finish_sourcing(outcome, &context, prepared).await;
        reporter.stage_finished(sourcing).await;

        reporter.stage_started(StageName::ContentGeneration).await;
        let generation_started = now_utc();
        let report = self.generator.generate(&leads, &context).await;
        reporter
            .stage_finished(generation_result(&report, generation_started))
            .await;

        let mut result = CampaignResult {
            run_id: prepared.run_id,
            subject_key: prepared.subject_key.clone(),
            campaign_id: None,
            profile,
            personas: personas.personas,
            ranking,
            filters,
            filter_source,
            derived_filters,
            leads,
            outreach: report.contents,
            enrichment,
            stages: reporter.run().stages.clone(),
            degradations: Vec::new(),
            started_at,
            completed_at: now_utc(),
        };
        result.degradations = result
            .stages
            .iter()
            .flat_map(|s| s.degradations.iter().cloned())
            .collect();

        self.persist(result, reporter).await
    }

    /// Runs one analysis stage and records its result.
    async fn stage<S: AnalysisStage>(
        &self,
        stage: &S,
        input: &S::Input,
        reporter: &mut ProgressReporter,
    ) -> Result<S::Output, CampaignError> {
        let name = stage.name();
        reporter.stage_started(name).await;
        let started_at = now_utc();

        match run_stage(stage, input, self.config.trace_capture).await {
            Ok((output, result)) => {
                reporter.stage_finished(result).await;
                Ok(output)
            }
            Err(failure) => {
                reporter
                    .stage_finished(StageResult::failed(name, started_at, failure.to_string()))
                    .await;
                Err(failure.into())
            }
        }
    }

    /// Applies the synthetic fallback and builds the lead sourcing result.
    async fn finish_sourcing(
        &self,
        outcome: EnrichmentOutcome,
        context: &CampaignContext,
        prepared: &PreparedRun,
    ) -> (Vec<EnrichedLead>, EnrichmentSummary, StageResult) {
        let EnrichmentOutcome { mut leads, summary } = outcome;
        let mut degradations = summary.notices.clone();

        if summary.is_exhausted_early() {
            degradations.push(Degradation::new(
                DegradationKind::EnrichmentExhausted,
                format!(
                    "Found {} of {} leads before {} stopped the search",
                    summary.leads_returned, summary.target_count, summary.stop_reason
                ),
            ));
        }

        if leads.is_empty() {
            warn!(
                run_id = %prepared.run_id,
                stop_reason = %summary.stop_reason,
                "No leads sourced, generating synthetic leads"
            );
            let count = self
                .enrichment
                .config()
                .max_candidates(prepared.target)
                .min(prepared.target);
            leads = self.synthetic.generate(context, count).await;
            degradations.push(Degradation::new(
                DegradationKind::SyntheticLeads,
                format!("No verified leads found; using {} synthetic leads", leads.len()),
            ));
        }

        let output = serde_json::json!({
            "summary": summary,
            "leads": leads.len(),
            "synthetic": leads.iter().filter(|l| l.is_synthetic()).count(),
        });
        let result = StageResult::completed(
            StageName::LeadSourcing,
            summary.started_at,
            now_utc(),
            output,
        )
        .with_degradations(degradations);

        (leads, summary, result)
    }

    /// Stores the campaign. A store failure carries the finished result.
    async fn persist(
        &self,
        mut result: CampaignResult,
        reporter: &mut ProgressReporter,
    ) -> Result<CampaignResult, CampaignError> {
        reporter.stage_started(StageName::Persistence).await;
        let started_at = now_utc();

        match self.store.save(&result).await {
            Ok(campaign_id) => {
                info!(run_id = %result.run_id, campaign_id = %campaign_id, "Campaign stored");
                let stage = StageResult::completed(
                    StageName::Persistence,
                    started_at,
                    now_utc(),
                    serde_json::json!({ "campaignId": campaign_id }),
                );
                result.campaign_id = Some(campaign_id);
                result.stages.push(stage.clone());
                result.completed_at = now_utc();
                reporter.stage_finished(stage).await;
                Ok(result)
            }
            Err(e) => {
                let stage = StageResult::failed(StageName::Persistence, started_at, e.to_string());
                result.stages.push(stage.clone());
                reporter.stage_finished(stage).await;
                Err(CampaignError::Persistence {
                    message: e.to_string(),
                    result: Box::new(result),
                })
            }
        }
    }
}

fn generation_result(report: &GenerationReport, started_at: Timestamp) -> StageResult {
    let degradations = report
        .failures
        .iter()
        .map(|failure| {
            Degradation::new(
                DegradationKind::GenerationFailure,
                format!("Outreach for {} failed: {}", failure.lead_name, failure.message),
            )
        })
        .collect();
    let output = serde_json::json!({
        "requested": report.requested,
        "generated": report.contents.len(),
        "failed": report.failures.len(),
        "skipped": report.skipped,
    });
    StageResult::completed(StageName::ContentGeneration, started_at, now_utc(), output)
        .with_degradations(degradations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OrgSizeBucket;
    use crate::providers::InMemoryCampaignStore;
    use crate::source::PaginatedSource;
    use crate::testing::mocks::{demo_reasoning, FakeEnricher, FakePeopleSearch, StaticFetcher};

    fn pipeline() -> CampaignPipeline {
        let collaborators = Collaborators::new(
            Arc::new(StaticFetcher::acme()),
            Arc::new(demo_reasoning()),
            Arc::new(PaginatedSource::new(Arc::new(FakePeopleSearch::new(Vec::new())), 100)),
            Arc::new(FakeEnricher::verifying_all()),
            Arc::new(InMemoryCampaignStore::new()),
        );
        CampaignPipeline::new(collaborators, &CampaignConfig::default())
    }

    #[test]
    fn test_prepare_normalizes_subject_and_filters() {
        let request = CampaignRequest::new("https://www.Acme.io/pricing")
            .with_filters(FilterSet::new().with_titles(["Sr. Engineer"]).with_org_sizes([OrgSizeBucket::Small]))
            .with_target_leads(4);

        let prepared = pipeline().prepare(request).unwrap();

        assert_eq!(prepared.subject_key, "acme.io");
        assert_eq!(prepared.url, "https://acme.io");
        assert_eq!(prepared.target, 4);
        assert_eq!(
            prepared.filters.map(|f| f.title_keywords),
            Some(vec!["Senior Engineer".to_string()])
        );
    }

    #[test]
    fn test_prepare_drops_empty_filters() {
        let request = CampaignRequest::new("acme.io").with_filters(FilterSet::new());
        let prepared = pipeline().prepare(request).unwrap();
        assert!(prepared.filters.is_none());
        assert_eq!(prepared.target, 10);
    }

    #[test]
    fn test_prepare_rejects_bad_requests() {
        let err = pipeline().prepare(CampaignRequest::new("not a domain")).unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");

        let err = pipeline()
            .prepare(CampaignRequest::new("acme.io").with_target_leads(0))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    #[test]
    fn test_prepare_rejects_target_above_limit() {
        let pipeline = pipeline();
        assert_eq!(pipeline.config().max_target_leads, 100);
        assert!(pipeline.prepare(CampaignRequest::new("acme.io").with_target_leads(100)).is_ok());

        let err = pipeline
            .prepare(CampaignRequest::new("acme.io").with_target_leads(300_000))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
        assert!(err.to_string().contains("at most 100"));
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: CampaignRequest = serde_json::from_str(
            r#"{"subjectKey": "acme.io", "targetLeads": 3, "filters": {"titleKeywords": ["CTO"]}}"#,
        )
        .unwrap();
        assert_eq!(request.target_leads, Some(3));
        assert_eq!(request.filters.map(|f| f.title_keywords), Some(vec!["CTO".to_string()]));
    }

    #[test]
    fn test_config_validation() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(PipelineConfig::default().with_target_leads(0).validate().is_err());
        assert!(PipelineConfig::default().with_max_target_leads(5).validate().is_err());
    }
}
