//! Placeholder leads for runs where sourcing found nobody.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{CampaignContext, Candidate, ContactAddress, EnrichedLead};
use crate::providers::{PromptTask, ReasoningService, StructuredPrompt};

const TEMPLATE_NAMES: &[&str] = &[
    "Alex Morgan",
    "Jordan Lee",
    "Taylor Reed",
    "Casey Brooks",
    "Riley Chen",
    "Morgan Patel",
    "Jamie Ortiz",
    "Avery Kim",
    "Quinn Walsh",
    "Drew Novak",
];

const SYNTHETIC_STATUS: &str = "synthetic";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyntheticLead {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    organization: String,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Deserialize)]
struct SyntheticAnswer {
    leads: Vec<SyntheticLead>,
}

/// Produces leads tagged [`crate::core::LeadOrigin::Synthetic`].
///
/// Asks the reasoning service first and falls back to a fixed template when
/// that fails, so a run with zero sourced leads still yields content.
pub struct SyntheticLeadGenerator {
    reasoning: Arc<dyn ReasoningService>,
}

impl SyntheticLeadGenerator {
    /// Creates a generator.
    pub fn new(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self { reasoning }
    }

    /// Produces `count` synthetic leads for the selected persona.
    pub async fn generate(&self, context: &CampaignContext, count: usize) -> Vec<EnrichedLead> {
        if count == 0 {
            return Vec::new();
        }

        let prompt = StructuredPrompt::new(
            PromptTask::SyntheticLeads,
            format!(
                "Invent {count} realistic but fictional people matching this persona. \
                 Do not use real individuals."
            ),
            json!({ "persona": context.persona, "profile": context.profile, "count": count }),
            json!({
                "leads": [{ "name": "string", "title": "string", "organization": "string", "location": "string" }]
            }),
        );

        let answered = match self.reasoning.complete(&prompt).await {
            Ok(value) => serde_json::from_value::<SyntheticAnswer>(value)
                .map(|answer| answer.leads)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Synthetic lead answer malformed, using template");
                    Vec::new()
                }),
            Err(e) => {
                warn!(error = %e, "Synthetic lead generation failed, using template");
                Vec::new()
            }
        };

        let leads: Vec<EnrichedLead> = answered
            .into_iter()
            .filter(|lead| !lead.name.trim().is_empty())
            .take(count)
            .enumerate()
            .map(|(idx, lead)| {
                let title = if lead.title.is_empty() { self.title_for(context, idx) } else { lead.title };
                let organization =
                    if lead.organization.is_empty() { self.organization_for(context) } else { lead.organization };
                synthetic_lead(idx, &lead.name, title, organization, lead.location)
            })
            .collect();

        let leads = if leads.is_empty() { self.template(context, count) } else { leads };
        info!(count = leads.len(), "Generated synthetic leads");
        leads
    }

    fn template(&self, context: &CampaignContext, count: usize) -> Vec<EnrichedLead> {
        let location = context.persona.locations.first().cloned().unwrap_or_default();
        (0..count)
            .map(|idx| {
                let name = TEMPLATE_NAMES[idx % TEMPLATE_NAMES.len()];
                synthetic_lead(
                    idx,
                    name,
                    self.title_for(context, idx),
                    self.organization_for(context),
                    location.clone(),
                )
            })
            .collect()
    }

    fn title_for(&self, context: &CampaignContext, idx: usize) -> String {
        let titles = &context.persona.job_titles;
        if titles.is_empty() {
            context.persona.name.clone()
        } else {
            titles[idx % titles.len()].clone()
        }
    }

    fn organization_for(&self, context: &CampaignContext) -> String {
        match context.persona.industries.first() {
            Some(industry) => format!("Example {industry} Co"),
            None => "Example Co".to_string(),
        }
    }
}

fn synthetic_lead(
    idx: usize,
    name: &str,
    title: String,
    organization: String,
    location: String,
) -> EnrichedLead {
    let local: String = name
        .split_whitespace()
        .map(|part| part.chars().filter(char::is_ascii_alphanumeric).collect::<String>().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    let local = if local.is_empty() { format!("lead{}", idx + 1) } else { local };

    let candidate = Candidate {
        id: Some(format!("synthetic-{}", idx + 1)),
        name: name.to_string(),
        title,
        organization,
        location,
        biography: String::new(),
        profile_url: None,
    };
    let contact = ContactAddress {
        email: format!("{local}@example.com"),
        verification_status: Some(SYNTHETIC_STATUS.to_string()),
    };
    EnrichedLead::synthetic(candidate, contact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use crate::testing::mocks::ScriptedReasoning;

    #[tokio::test]
    async fn test_uses_reasoning_answer() {
        let reasoning = ScriptedReasoning::new().with_response(
            PromptTask::SyntheticLeads,
            json!({"leads": [
                {"name": "Dana Fox", "title": "COO", "organization": "Northwind"},
                {"name": "Lee Park"},
            ]}),
        );
        let generator = SyntheticLeadGenerator::new(Arc::new(reasoning));
        let context = fixtures::campaign_context();

        let leads = generator.generate(&context, 5).await;

        assert_eq!(leads.len(), 2);
        assert!(leads.iter().all(EnrichedLead::is_synthetic));
        assert_eq!(leads[0].contact.email, "dana.fox@example.com");
        assert_eq!(leads[1].candidate.title, context.persona.job_titles[0]);
    }

    #[tokio::test]
    async fn test_falls_back_to_template() {
        let generator = SyntheticLeadGenerator::new(Arc::new(ScriptedReasoning::new()));

        let leads = generator.generate(&fixtures::campaign_context(), 3).await;

        assert_eq!(leads.len(), 3);
        assert!(leads.iter().all(EnrichedLead::is_synthetic));
        assert_eq!(leads[0].name(), "Alex Morgan");
        assert_eq!(leads[0].contact.verification_status.as_deref(), Some("synthetic"));
    }

    #[tokio::test]
    async fn test_zero_count() {
        let generator = SyntheticLeadGenerator::new(Arc::new(ScriptedReasoning::new()));
        assert!(generator.generate(&fixtures::campaign_context(), 0).await.is_empty());
    }
}
