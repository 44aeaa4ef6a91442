//! External collaborator interfaces.
//!
//! The pipeline only depends on these traits. Concrete HTTP clients live in
//! [`http`] behind the `http` feature; deterministic fakes live in
//! [`crate::testing`].

#[cfg(feature = "http")]
pub mod http;
pub mod memory;
pub mod writer;

pub use memory::InMemoryCampaignStore;
pub use writer::ReasoningContentWriter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{
    CampaignContext, CampaignResult, Candidate, ContactAddress, EnrichedLead, FilterSet,
    OutreachContent,
};
use crate::errors::ProviderError;
use crate::poller::{JobHandle, JobStatus};

/// Fetched subject content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    /// Final URL after redirects.
    pub url: String,
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Meta description.
    #[serde(default)]
    pub description: String,
    /// Visible body text.
    #[serde(default)]
    pub body_text: String,
}

/// Fetches the subject's website content.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches `url`.
    async fn fetch(&self, url: &str) -> Result<PageContent, ProviderError>;
}

/// What a reasoning call is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTask {
    /// Website content → company profile.
    WebsiteAnalysis,
    /// Profile → personas.
    PersonaGeneration,
    /// Profile + personas → ranking.
    PersonaRanking,
    /// Persona → search filters.
    FilterDerivation,
    /// Persona → placeholder leads.
    SyntheticLeads,
    /// Lead + context → outreach.
    OutreachContent,
}

impl PromptTask {
    /// Returns the snake_case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebsiteAnalysis => "website_analysis",
            Self::PersonaGeneration => "persona_generation",
            Self::PersonaRanking => "persona_ranking",
            Self::FilterDerivation => "filter_derivation",
            Self::SyntheticLeads => "synthetic_leads",
            Self::OutreachContent => "outreach_content",
        }
    }
}

/// A structured request to the reasoning service.
///
/// The service must answer with JSON matching `output_schema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredPrompt {
    /// Task identifier.
    pub task: PromptTask,
    /// Task instructions.
    pub instructions: String,
    /// Structured input.
    pub input: serde_json::Value,
    /// JSON shape the answer must have.
    pub output_schema: serde_json::Value,
}

impl StructuredPrompt {
    /// Creates a prompt.
    #[must_use]
    pub fn new(
        task: PromptTask,
        instructions: impl Into<String>,
        input: serde_json::Value,
        output_schema: serde_json::Value,
    ) -> Self {
        Self {
            task,
            instructions: instructions.into(),
            input,
            output_schema,
        }
    }

    /// JSON form used for trace capture.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// External reasoning service.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Completes a structured prompt, returning the raw JSON answer.
    async fn complete(&self, prompt: &StructuredPrompt) -> Result<serde_json::Value, ProviderError>;
}

/// One page from a people-search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPage {
    /// Candidates on this page.
    pub candidates: Vec<Candidate>,
    /// Total matches the provider reports.
    #[serde(default)]
    pub total_available: u64,
    /// Total pages at the requested page size.
    #[serde(default)]
    pub total_pages: u32,
}

/// Synchronous paginated people search.
#[async_trait]
pub trait PeopleSearchProvider: Send + Sync {
    /// Fetches page `page` (1-indexed) of `page_size` results.
    async fn search_page(
        &self,
        filters: &FilterSet,
        page: u32,
        page_size: u32,
    ) -> Result<ProviderPage, ProviderError>;
}

/// Request submitted to a job-based people search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSearchRequest {
    /// Targeting.
    pub filters: FilterSet,
    /// Maximum results.
    pub limit: u32,
    /// Results to skip.
    pub offset: u32,
}

/// Asynchronous job-based people search.
#[async_trait]
pub trait PeopleSearchJobProvider: Send + Sync {
    /// Submits a search and returns its job handle.
    async fn submit(&self, request: &JobSearchRequest) -> Result<JobHandle, ProviderError>;

    /// Queries the job's status.
    async fn status(&self, handle: &JobHandle) -> Result<JobStatus<ProviderPage>, ProviderError>;
}

/// Looks up a verified contact address for a candidate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactEnricher: Send + Sync {
    /// Returns `Ok(None)` when no verified address exists.
    async fn enrich(&self, candidate: &Candidate) -> Result<Option<ContactAddress>, ProviderError>;
}

/// Writes outreach for one lead.
#[async_trait]
pub trait ContentWriter: Send + Sync {
    /// Produces content for `lead`.
    async fn write(
        &self,
        lead: &EnrichedLead,
        context: &CampaignContext,
    ) -> Result<OutreachContent, ProviderError>;
}

/// Stores finished campaigns.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Stores the campaign and returns its identifier.
    async fn save(&self, result: &CampaignResult) -> Result<String, ProviderError>;
}
