//! Content writer backed by the reasoning service.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ContentWriter, PromptTask, ReasoningService, StructuredPrompt};
use crate::core::{CampaignContext, EnrichedLead, OutreachContent};
use crate::errors::ProviderError;

const INSTRUCTIONS: &str = "Write a short, personalized cold email from the company described in \
`context.profile` to the lead in `lead`. Address the persona's pain points, keep the body under \
150 words, and end with a single clear call to action.";

/// Writes outreach by asking the reasoning service.
#[derive(Clone)]
pub struct ReasoningContentWriter {
    reasoning: Arc<dyn ReasoningService>,
}

impl std::fmt::Debug for ReasoningContentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningContentWriter").finish_non_exhaustive()
    }
}

impl ReasoningContentWriter {
    /// Creates a writer over `reasoning`.
    #[must_use]
    pub fn new(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self { reasoning }
    }

    fn prompt(lead: &EnrichedLead, context: &CampaignContext) -> StructuredPrompt {
        StructuredPrompt::new(
            PromptTask::OutreachContent,
            INSTRUCTIONS,
            serde_json::json!({ "lead": lead, "context": context }),
            serde_json::json!({
                "subject": "string",
                "body": "string",
                "followUp": "string?"
            }),
        )
    }
}

#[async_trait]
impl ContentWriter for ReasoningContentWriter {
    async fn write(
        &self,
        lead: &EnrichedLead,
        context: &CampaignContext,
    ) -> Result<OutreachContent, ProviderError> {
        let answer = self.reasoning.complete(&Self::prompt(lead, context)).await?;
        let content: OutreachContent =
            serde_json::from_value(answer).map_err(|e| ProviderError::Decode(e.to_string()))?;
        if content.body.trim().is_empty() {
            return Err(ProviderError::Decode("empty outreach body".to_string()));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{campaign_context, enriched_lead};
    use crate::testing::mocks::ScriptedReasoning;

    #[tokio::test]
    async fn test_writes_content_from_reasoning() {
        let reasoning = ScriptedReasoning::new().with_response(
            PromptTask::OutreachContent,
            serde_json::json!({"subject": "Hi Ana", "body": "Quick question."}),
        );
        let writer = ReasoningContentWriter::new(Arc::new(reasoning));

        let content = writer
            .write(&enriched_lead("Ana"), &campaign_context())
            .await
            .unwrap();
        assert_eq!(content.subject, "Hi Ana");
        assert!(content.follow_up.is_none());
    }

    #[tokio::test]
    async fn test_rejects_malformed_answer() {
        let reasoning = ScriptedReasoning::new()
            .with_response(PromptTask::OutreachContent, serde_json::json!({"subject": "Hi"}));
        let writer = ReasoningContentWriter::new(Arc::new(reasoning));

        let err = writer
            .write(&enriched_lead("Ana"), &campaign_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty_body() {
        let reasoning = ScriptedReasoning::new().with_response(
            PromptTask::OutreachContent,
            serde_json::json!({"subject": "Hi", "body": "   "}),
        );
        let writer = ReasoningContentWriter::new(Arc::new(reasoning));

        assert!(writer
            .write(&enriched_lead("Ana"), &campaign_context())
            .await
            .is_err());
    }
}
