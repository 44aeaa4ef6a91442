//! Filter derivation: selected persona → normalized search filters.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{ask, AnalysisStage, StageExecution};
use crate::core::{FilterSet, OrgSizeBucket, Persona, StageName};
use crate::errors::StageFailure;
use crate::normalize::Normalizer;
use crate::providers::{PromptTask, ReasoningService, StructuredPrompt};

/// Filters as the reasoning service returns them; sizes are free text.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawFilters {
    title_keywords: Vec<String>,
    org_sizes: Vec<String>,
    industries: Vec<String>,
    locations: Vec<String>,
    seniorities: Vec<String>,
    keywords: Vec<String>,
}

/// Derives people-search filters for the selected persona.
///
/// Empty fields in the answer fall back to the persona's own attributes.
/// The result is normalized before it leaves the stage.
pub struct FilterDerivationStage {
    reasoning: Arc<dyn ReasoningService>,
    normalizer: Arc<dyn Normalizer>,
}

impl FilterDerivationStage {
    /// Creates the stage.
    pub fn new(reasoning: Arc<dyn ReasoningService>, normalizer: Arc<dyn Normalizer>) -> Self {
        Self {
            reasoning,
            normalizer,
        }
    }

    fn buckets(&self, sizes: &[String]) -> Vec<OrgSizeBucket> {
        sizes
            .iter()
            .filter_map(|raw| {
                let bucket = self.normalizer.org_size_bucket(raw);
                if bucket.is_none() {
                    debug!(size = %raw, "Dropping unrecognized organization size");
                }
                bucket
            })
            .collect()
    }

    fn build(&self, raw: RawFilters, persona: &Persona) -> FilterSet {
        let or_persona = |derived: Vec<String>, fallback: &[String]| {
            if derived.is_empty() {
                fallback.to_vec()
            } else {
                derived
            }
        };

        let mut org_sizes = self.buckets(&raw.org_sizes);
        if org_sizes.is_empty() {
            org_sizes = self.buckets(&persona.company_sizes);
        }
        let seniorities = if raw.seniorities.is_empty() && !persona.seniority.is_empty() {
            vec![persona.seniority.clone()]
        } else {
            raw.seniorities
        };

        let filters = FilterSet {
            title_keywords: or_persona(raw.title_keywords, &persona.job_titles),
            org_sizes,
            industries: or_persona(raw.industries, &persona.industries),
            locations: or_persona(raw.locations, &persona.locations),
            seniorities,
            keywords: raw.keywords,
        };
        self.normalizer.filter_set(&filters)
    }
}

#[async_trait]
impl AnalysisStage for FilterDerivationStage {
    type Input = Persona;
    type Output = FilterSet;

    fn name(&self) -> StageName {
        StageName::FilterDerivation
    }

    async fn execute(&self, persona: &Persona) -> Result<StageExecution<FilterSet>, StageFailure> {
        let prompt = StructuredPrompt::new(
            PromptTask::FilterDerivation,
            "Translate this buyer persona into people-search filters: title keywords, \
             organization headcount ranges, industries, locations and seniorities.",
            json!({ "persona": persona }),
            json!({
                "titleKeywords": ["string"],
                "orgSizes": ["string"],
                "industries": ["string"],
                "locations": ["string"],
                "seniorities": ["string"],
                "keywords": ["string"],
            }),
        );

        let execution: StageExecution<RawFilters> =
            ask(self.reasoning.as_ref(), self.name(), prompt).await?;
        let filters = self.build(execution.output, persona);

        if filters.title_keywords.is_empty() {
            return Err(StageFailure::invalid(self.name(), "no title keywords derived"));
        }

        Ok(StageExecution {
            output: filters,
            trace: execution.trace,
        })
    }
}
