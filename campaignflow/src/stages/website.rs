//! Website analysis: subject content → company profile.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{ask, AnalysisStage, StageExecution};
use crate::core::{CompanyProfile, StageName};
use crate::errors::StageFailure;
use crate::providers::{ContentFetcher, PromptTask, ReasoningService, StructuredPrompt};
use crate::utils::truncate_chars;

const INSTRUCTIONS: &str = "Analyze the company website content. Identify the company name, \
what it does, the industries it serves, its products, its target market and its value propositions.";

/// Fetches the subject's site and asks the reasoning service for a profile.
pub struct WebsiteAnalysisStage {
    fetcher: Arc<dyn ContentFetcher>,
    reasoning: Arc<dyn ReasoningService>,
    max_content_chars: usize,
}

impl WebsiteAnalysisStage {
    /// Creates the stage. Body text beyond `max_content_chars` is dropped.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        reasoning: Arc<dyn ReasoningService>,
        max_content_chars: usize,
    ) -> Self {
        Self {
            fetcher,
            reasoning,
            max_content_chars,
        }
    }
}

#[async_trait]
impl AnalysisStage for WebsiteAnalysisStage {
    type Input = String;
    type Output = CompanyProfile;

    fn name(&self) -> StageName {
        StageName::WebsiteAnalysis
    }

    async fn execute(&self, url: &String) -> Result<StageExecution<CompanyProfile>, StageFailure> {
        let page = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| StageFailure::fetch(self.name(), e.to_string()))?;

        if page.title.trim().is_empty()
            && page.description.trim().is_empty()
            && page.body_text.trim().is_empty()
        {
            return Err(StageFailure::fetch(self.name(), format!("no content at {url}")));
        }

        let content = truncate_chars(&page.body_text, self.max_content_chars);
        debug!(url = %page.url, chars = content.chars().count(), "Fetched subject content");

        let prompt = StructuredPrompt::new(
            PromptTask::WebsiteAnalysis,
            INSTRUCTIONS,
            json!({
                "url": page.url,
                "title": page.title,
                "description": page.description,
                "content": content,
            }),
            json!({
                "companyName": "string",
                "summary": "string",
                "industries": ["string"],
                "products": ["string"],
                "targetMarket": "string",
                "valuePropositions": ["string"],
                "headquarters": "string?",
            }),
        );

        let execution: StageExecution<CompanyProfile> =
            ask(self.reasoning.as_ref(), self.name(), prompt).await?;
        if execution.output.company_name.trim().is_empty() {
            return Err(StageFailure::invalid(self.name(), "profile has no company name"));
        }
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ProviderError, StageFailureKind};
    use crate::providers::PageContent;
    use crate::testing::mocks::{ScriptedReasoning, StaticFetcher};

    fn profile_answer() -> serde_json::Value {
        json!({"companyName": "Acme", "summary": "Widgets for teams", "industries": ["Software"]})
    }

    #[tokio::test]
    async fn test_produces_profile() {
        let reasoning = Arc::new(
            ScriptedReasoning::new().with_response(PromptTask::WebsiteAnalysis, profile_answer()),
        );
        let stage = WebsiteAnalysisStage::new(Arc::new(StaticFetcher::acme()), reasoning.clone(), 100);

        let execution = stage.execute(&"https://acme.io".to_string()).await.unwrap();

        assert_eq!(execution.output.company_name, "Acme");
        assert_eq!(execution.output.industries, vec!["Software"]);
        assert_eq!(reasoning.calls(PromptTask::WebsiteAnalysis), 1);
    }

    #[tokio::test]
    async fn test_truncates_body_text() {
        let fetcher = StaticFetcher::new(PageContent {
            url: "https://acme.io".to_string(),
            title: "Acme".to_string(),
            description: String::new(),
            body_text: "x".repeat(500),
        });
        let reasoning = Arc::new(
            ScriptedReasoning::new().with_response(PromptTask::WebsiteAnalysis, profile_answer()),
        );
        let stage = WebsiteAnalysisStage::new(Arc::new(fetcher), reasoning.clone(), 50);

        let execution = stage.execute(&"https://acme.io".to_string()).await.unwrap();

        let trace = execution.trace.unwrap();
        assert_eq!(trace.request["input"]["content"].as_str().map(str::len), Some(50));
    }

    #[tokio::test]
    async fn test_fetch_error_fails_stage() {
        let fetcher = StaticFetcher::failing(ProviderError::Transport("connection refused".into()));
        let stage = WebsiteAnalysisStage::new(
            Arc::new(fetcher),
            Arc::new(ScriptedReasoning::new().with_response(PromptTask::WebsiteAnalysis, profile_answer())),
            100,
        );

        let failure = stage.execute(&"https://acme.io".to_string()).await.unwrap_err();
        assert_eq!(failure.kind, StageFailureKind::Fetch);
    }

    #[tokio::test]
    async fn test_empty_page_fails_stage() {
        let fetcher = StaticFetcher::new(PageContent {
            url: "https://acme.io".to_string(),
            ..PageContent::default()
        });
        let stage = WebsiteAnalysisStage::new(
            Arc::new(fetcher),
            Arc::new(ScriptedReasoning::new().with_response(PromptTask::WebsiteAnalysis, profile_answer())),
            100,
        );

        let failure = stage.execute(&"https://acme.io".to_string()).await.unwrap_err();
        assert_eq!(failure.kind, StageFailureKind::Fetch);
    }

    #[tokio::test]
    async fn test_blank_company_name_is_invalid() {
        let reasoning = ScriptedReasoning::new().with_response(
            PromptTask::WebsiteAnalysis,
            json!({"companyName": "  ", "summary": "Widgets"}),
        );
        let stage = WebsiteAnalysisStage::new(Arc::new(StaticFetcher::acme()), Arc::new(reasoning), 100);

        let failure = stage.execute(&"https://acme.io".to_string()).await.unwrap_err();
        assert_eq!(failure.kind, StageFailureKind::InvalidOutput);
    }
}
