//! Persona ranking: profile + personas → ordered evaluation and one selection.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{ask, AnalysisStage, StageExecution};
use crate::core::{CompanyProfile, PersonaRanking, PersonaSet, RankedPersona, StageName};
use crate::errors::StageFailure;
use crate::providers::{PromptTask, ReasoningService, StructuredPrompt};

/// Input of the ranking stage.
#[derive(Debug, Clone)]
pub struct RankingInput {
    /// Company profile.
    pub profile: CompanyProfile,
    /// Personas to rank.
    pub personas: PersonaSet,
}

#[derive(Debug, Deserialize)]
struct RankingAnswer {
    rankings: Vec<RankedPersona>,
}

/// Scores every persona and selects exactly one.
pub struct PersonaRankingStage {
    reasoning: Arc<dyn ReasoningService>,
}

impl PersonaRankingStage {
    /// Creates the stage.
    pub fn new(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self { reasoning }
    }
}

#[async_trait]
impl AnalysisStage for PersonaRankingStage {
    type Input = RankingInput;
    type Output = PersonaRanking;

    fn name(&self) -> StageName {
        StageName::PersonaRanking
    }

    async fn execute(
        &self,
        input: &RankingInput,
    ) -> Result<StageExecution<PersonaRanking>, StageFailure> {
        let prompt = StructuredPrompt::new(
            PromptTask::PersonaRanking,
            "Score each persona from 0 to 100 on deal size, sales cycle, addressable market and \
             pain severity for this company. Return one composite score per persona id.",
            json!({ "profile": input.profile, "personas": input.personas.personas }),
            json!({
                "rankings": [{ "personaId": "string", "score": "number", "rationale": "string" }]
            }),
        );

        let execution: StageExecution<RankingAnswer> =
            ask(self.reasoning.as_ref(), self.name(), prompt).await?;
        let ranking = select_persona(&input.personas, execution.output.rankings)?;

        Ok(StageExecution {
            output: ranking,
            trace: execution.trace,
        })
    }
}

/// Orders `rankings` and picks the winner.
///
/// Highest score wins; equal scores are broken by position in `personas`,
/// first wins. Non-finite scores rank last. Every ranked id must name a
/// persona in `personas`.
pub fn select_persona(
    personas: &PersonaSet,
    mut rankings: Vec<RankedPersona>,
) -> Result<PersonaRanking, StageFailure> {
    let stage = StageName::PersonaRanking;
    if rankings.is_empty() {
        return Err(StageFailure::invalid(stage, "no personas were ranked"));
    }
    if let Some(unknown) = rankings.iter().find(|r| !personas.contains(&r.persona_id)) {
        return Err(StageFailure::invalid(
            stage,
            format!("ranked unknown persona '{}'", unknown.persona_id),
        ));
    }

    let position = |id: &str| personas.personas.iter().position(|p| p.id == id).unwrap_or(usize::MAX);
    let score = |r: &RankedPersona| if r.score.is_finite() { r.score } else { f64::NEG_INFINITY };
    rankings.sort_by(|a, b| {
        score(b)
            .total_cmp(&score(a))
            .then_with(|| position(&a.persona_id).cmp(&position(&b.persona_id)))
    });

    let selected = personas
        .get(&rankings[0].persona_id)
        .cloned()
        .ok_or_else(|| StageFailure::invalid(stage, "selected persona missing"))?;

    Ok(PersonaRanking {
        ranked: rankings,
        selected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Persona;
    use crate::errors::StageFailureKind;
    use crate::testing::fixtures;
    use crate::testing::mocks::ScriptedReasoning;

    fn personas(ids: &[&str]) -> PersonaSet {
        PersonaSet {
            personas: ids
                .iter()
                .map(|id| Persona {
                    id: (*id).to_string(),
                    name: format!("Persona {id}"),
                    ..Persona::default()
                })
                .collect(),
        }
    }

    fn ranked(id: &str, score: f64) -> RankedPersona {
        RankedPersona {
            persona_id: id.to_string(),
            score,
            rationale: String::new(),
        }
    }

    #[test]
    fn test_highest_score_wins() {
        let set = personas(&["a", "b", "c"]);
        let ranking =
            select_persona(&set, vec![ranked("a", 40.0), ranked("b", 90.0), ranked("c", 70.0)])
                .unwrap();

        assert_eq!(ranking.selected.id, "b");
        let order: Vec<&str> = ranking.ranked.iter().map(|r| r.persona_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_tie_goes_to_earlier_persona() {
        let set = personas(&["a", "b", "c"]);
        let ranking =
            select_persona(&set, vec![ranked("c", 80.0), ranked("b", 10.0), ranked("a", 80.0)])
                .unwrap();
        assert_eq!(ranking.selected.id, "a");
        let order: Vec<&str> = ranking.ranked.iter().map(|r| r.persona_id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_nan_ranks_last() {
        let set = personas(&["a", "b"]);
        let ranking = select_persona(&set, vec![ranked("a", f64::NAN), ranked("b", 1.0)]).unwrap();
        assert_eq!(ranking.selected.id, "b");
    }

    #[test]
    fn test_unknown_persona_is_invalid() {
        let set = personas(&["a"]);
        let failure = select_persona(&set, vec![ranked("zzz", 99.0)]).unwrap_err();
        assert_eq!(failure.kind, StageFailureKind::InvalidOutput);
    }

    #[test]
    fn test_empty_ranking_is_invalid() {
        let set = personas(&["a"]);
        assert!(select_persona(&set, Vec::new()).is_err());
    }

    #[tokio::test]
    async fn test_stage_selects_from_answer() {
        let reasoning = ScriptedReasoning::new().with_response(
            PromptTask::PersonaRanking,
            json!({"rankings": [
                {"personaId": "a", "score": 55, "rationale": "mid"},
                {"personaId": "b", "score": 81.5, "rationale": "best"},
            ]}),
        );
        let stage = PersonaRankingStage::new(Arc::new(reasoning));
        let input = RankingInput {
            profile: fixtures::company_profile(),
            personas: personas(&["a", "b"]),
        };

        let ranking = stage.execute(&input).await.unwrap().output;
        assert_eq!(ranking.selected.id, "b");
        assert_eq!(ranking.ranked[0].rationale, "best");
    }
}
