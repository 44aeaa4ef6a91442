//! Builds [`AppState`] from configuration.

use clap::Args;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use campaignflow::config::CampaignConfig;
use campaignflow::errors::{ConfigError, ProviderError};
use campaignflow::pipeline::{CampaignPipeline, Collaborators};
use campaignflow::progress::{FanoutProgressSink, LoggingProgressSink, ProgressTracker};
use campaignflow::providers::http::{
    HttpContactEnricher, HttpContentFetcher, HttpPeopleSearch, HttpPeopleSearchJobs,
    HttpProviderConfig, OpenAiCompatibleReasoning,
};
use campaignflow::providers::{InMemoryCampaignStore, PeopleSearchJobProvider, PeopleSearchProvider};
use campaignflow::source::{build_source, PaginatedSource};
use campaignflow::testing::fixtures::candidates;
use campaignflow::testing::mocks::{
    demo_reasoning, FakeEnricher, FakePeopleSearch, ScriptedReasoning, StaticFetcher,
};

use crate::state::AppState;

/// Candidates the demo search serves.
const DEMO_CANDIDATES: u32 = 60;

/// Errors assembling the service.
#[derive(Debug, Error)]
pub enum WiringError {
    /// The campaign config is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A provider client could not be built.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// A required provider setting is missing.
    #[error("missing setting --{0}")]
    Missing(&'static str),
}

/// Endpoints and credentials of the external providers.
#[derive(Debug, Clone, Default, Args)]
pub struct ProviderSettings {
    /// OpenAI-compatible API base URL.
    #[arg(long, env = "CAMPAIGNFLOW_REASONING_URL")]
    pub reasoning_url: Option<String>,
    /// Reasoning API key.
    #[arg(long, env = "CAMPAIGNFLOW_REASONING_API_KEY", hide_env_values = true)]
    pub reasoning_api_key: Option<String>,
    /// Reasoning model name.
    #[arg(long, env = "CAMPAIGNFLOW_REASONING_MODEL", default_value = "gpt-4o-mini")]
    pub reasoning_model: String,
    /// People search API base URL.
    #[arg(long, env = "CAMPAIGNFLOW_SEARCH_URL")]
    pub search_url: Option<String>,
    /// People search API key.
    #[arg(long, env = "CAMPAIGNFLOW_SEARCH_API_KEY", hide_env_values = true)]
    pub search_api_key: Option<String>,
    /// Contact lookup API base URL.
    #[arg(long, env = "CAMPAIGNFLOW_ENRICH_URL")]
    pub enrich_url: Option<String>,
    /// Contact lookup API key.
    #[arg(long, env = "CAMPAIGNFLOW_ENRICH_API_KEY", hide_env_values = true)]
    pub enrich_api_key: Option<String>,
    /// Timeout for every provider call, in seconds.
    #[arg(long, env = "CAMPAIGNFLOW_HTTP_TIMEOUT", default_value_t = 30.0)]
    pub http_timeout_seconds: f64,
}

impl ProviderSettings {
    fn http(
        &self,
        url: Option<&str>,
        key: Option<&str>,
        name: &'static str,
    ) -> Result<HttpProviderConfig, WiringError> {
        let url = url.ok_or(WiringError::Missing(name))?;
        let mut config = HttpProviderConfig::new(url).with_timeout(self.http_timeout_seconds);
        if let Some(key) = key {
            config = config.with_api_key(key);
        }
        Ok(config)
    }
}

fn tracker_state(pipeline: CampaignPipeline, config: &CampaignConfig) -> AppState {
    let tracker = ProgressTracker::new(config.progress.clone());
    let sink = FanoutProgressSink::new(vec![tracker.sink()])
        .with(Arc::new(LoggingProgressSink::debug()));
    AppState::new(pipeline, tracker).with_sink(Arc::new(sink))
}

/// State backed by deterministic in-process fakes.
///
/// Every subject analyses as Acme; two of three candidates verify.
pub fn demo_state(config: &CampaignConfig) -> AppState {
    demo_state_with_reasoning(config, demo_reasoning())
}

/// Demo state answering analysis prompts with `reasoning`.
pub fn demo_state_with_reasoning(config: &CampaignConfig, reasoning: ScriptedReasoning) -> AppState {
    let search = Arc::new(FakePeopleSearch::new(candidates(DEMO_CANDIDATES as usize)));
    let verified = (1..=DEMO_CANDIDATES).filter(|n| n % 3 != 0);
    let collaborators = Collaborators::new(
        Arc::new(StaticFetcher::acme()),
        Arc::new(reasoning),
        Arc::new(PaginatedSource::new(search, config.source.max_page_size)),
        Arc::new(FakeEnricher::verifying_ids(verified)),
        Arc::new(InMemoryCampaignStore::new()),
    );
    info!("Wired demo collaborators");
    tracker_state(CampaignPipeline::new(collaborators, config), config)
}

/// State backed by the HTTP provider clients.
pub fn live_state(
    config: &CampaignConfig,
    settings: &ProviderSettings,
) -> Result<AppState, WiringError> {
    config.validate()?;

    let reasoning_config = settings.http(
        settings.reasoning_url.as_deref(),
        settings.reasoning_api_key.as_deref(),
        "reasoning-url",
    )?;
    let search_config = settings.http(
        settings.search_url.as_deref(),
        settings.search_api_key.as_deref(),
        "search-url",
    )?;
    let enrich_config = settings.http(
        settings.enrich_url.as_deref(),
        settings.enrich_api_key.as_deref(),
        "enrich-url",
    )?;

    let paginated: Arc<dyn PeopleSearchProvider> =
        Arc::new(HttpPeopleSearch::new(search_config.clone())?);
    let jobs: Arc<dyn PeopleSearchJobProvider> = Arc::new(HttpPeopleSearchJobs::new(search_config)?);
    let source = build_source(&config.source, &config.poll, Some(paginated), Some(jobs))?;

    let fetcher_config = HttpProviderConfig::default().with_timeout(settings.http_timeout_seconds);
    let collaborators = Collaborators::new(
        Arc::new(HttpContentFetcher::new(fetcher_config)?),
        Arc::new(OpenAiCompatibleReasoning::new(reasoning_config, settings.reasoning_model.clone())?),
        source,
        Arc::new(HttpContactEnricher::new(enrich_config)?),
        Arc::new(InMemoryCampaignStore::new()),
    );
    info!(
        source = %config.source.kind,
        model = %settings.reasoning_model,
        "Wired HTTP collaborators"
    );
    Ok(tracker_state(CampaignPipeline::new(collaborators, config), config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_state_requires_urls() {
        let err = live_state(&CampaignConfig::default(), &ProviderSettings::default()).unwrap_err();
        assert!(matches!(err, WiringError::Missing("reasoning-url")));
    }

    #[test]
    fn test_live_state_with_urls() {
        let settings = ProviderSettings {
            reasoning_url: Some("https://llm.example/v1".to_string()),
            reasoning_model: "small".to_string(),
            search_url: Some("https://search.example".to_string()),
            enrich_url: Some("https://enrich.example".to_string()),
            http_timeout_seconds: 5.0,
            ..ProviderSettings::default()
        };
        assert!(live_state(&CampaignConfig::default(), &settings).is_ok());
    }

    #[test]
    fn test_demo_state_starts_empty() {
        let state = demo_state(&CampaignConfig::default());
        assert!(state.tracker.store().is_empty());
    }
}
