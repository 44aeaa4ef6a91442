//! Persona generation: profile → candidate personas.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use super::{ask, AnalysisStage, StageExecution};
use crate::core::{CompanyProfile, PersonaSet, StageName};
use crate::errors::StageFailure;
use crate::providers::{PromptTask, ReasoningService, StructuredPrompt};

/// Asks for `persona_count` distinct buyer personas.
pub struct PersonaGenerationStage {
    reasoning: Arc<dyn ReasoningService>,
    persona_count: usize,
}

impl PersonaGenerationStage {
    /// Creates the stage.
    pub fn new(reasoning: Arc<dyn ReasoningService>, persona_count: usize) -> Self {
        Self {
            reasoning,
            persona_count: persona_count.max(1),
        }
    }
}

#[async_trait]
impl AnalysisStage for PersonaGenerationStage {
    type Input = CompanyProfile;
    type Output = PersonaSet;

    fn name(&self) -> StageName {
        StageName::PersonaGeneration
    }

    async fn execute(
        &self,
        profile: &CompanyProfile,
    ) -> Result<StageExecution<PersonaSet>, StageFailure> {
        let prompt = StructuredPrompt::new(
            PromptTask::PersonaGeneration,
            format!(
                "Propose {} distinct buyer personas for this company. Each persona needs job titles, \
                 seniority, industries, company sizes, locations, pain points and goals.",
                self.persona_count
            ),
            json!({ "profile": profile, "count": self.persona_count }),
            json!({
                "personas": [{
                    "id": "string",
                    "name": "string",
                    "jobTitles": ["string"],
                    "seniority": "string",
                    "industries": ["string"],
                    "companySizes": ["string"],
                    "locations": ["string"],
                    "painPoints": ["string"],
                    "goals": ["string"],
                }]
            }),
        );

        let mut execution: StageExecution<PersonaSet> =
            ask(self.reasoning.as_ref(), self.name(), prompt).await?;

        let personas = &mut execution.output.personas;
        personas.retain(|p| !p.name.trim().is_empty());
        personas.truncate(self.persona_count);
        if personas.is_empty() {
            return Err(StageFailure::invalid(self.name(), "no personas generated"));
        }

        // Ids must be unique within the set; missing or repeated ids are reassigned.
        let mut seen = HashSet::new();
        for (idx, persona) in personas.iter_mut().enumerate() {
            let id = persona.id.trim().to_string();
            if id.is_empty() || !seen.insert(id.clone()) {
                let mut fresh = format!("persona-{}", idx + 1);
                while !seen.insert(fresh.clone()) {
                    fresh.push('x');
                }
                persona.id = fresh;
            } else {
                persona.id = id;
            }
        }

        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageFailureKind;
    use crate::testing::fixtures;
    use crate::testing::mocks::ScriptedReasoning;

    fn stage(answer: serde_json::Value, count: usize) -> PersonaGenerationStage {
        let reasoning = ScriptedReasoning::new().with_response(PromptTask::PersonaGeneration, answer);
        PersonaGenerationStage::new(Arc::new(reasoning), count)
    }

    #[tokio::test]
    async fn test_assigns_missing_and_duplicate_ids() {
        let stage = stage(
            json!({"personas": [
                {"id": "ops", "name": "Ops Lead"},
                {"name": "Growth Marketer"},
                {"id": "ops", "name": "Finance Director"},
            ]}),
            5,
        );

        let set = stage.execute(&fixtures::company_profile()).await.unwrap().output;

        let ids: Vec<&str> = set.personas.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["ops", "persona-2", "persona-3"]);
    }

    #[tokio::test]
    async fn test_caps_persona_count() {
        let personas: Vec<_> = (1..=8)
            .map(|i| json!({"id": format!("p{i}"), "name": format!("Persona {i}")}))
            .collect();
        let stage = stage(json!({ "personas": personas }), 5);

        let set = stage.execute(&fixtures::company_profile()).await.unwrap().output;
        assert_eq!(set.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_set_is_invalid() {
        let stage = stage(json!({"personas": []}), 5);

        let failure = stage.execute(&fixtures::company_profile()).await.unwrap_err();
        assert_eq!(failure.kind, StageFailureKind::InvalidOutput);
    }

    #[tokio::test]
    async fn test_missing_personas_field_is_malformed() {
        let stage = stage(json!({"items": []}), 5);

        let failure = stage.execute(&fixtures::company_profile()).await.unwrap_err();
        assert_eq!(failure.kind, StageFailureKind::MalformedOutput);
    }
}
