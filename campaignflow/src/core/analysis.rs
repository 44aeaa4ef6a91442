//! Typed outputs of the analysis stages and the content they feed.

use serde::{Deserialize, Serialize};

use super::leads::EnrichedLead;

/// Structured profile of the subject company, produced by website analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    /// Company name.
    pub company_name: String,
    /// One-paragraph summary of what the company does.
    pub summary: String,
    /// Industry tags.
    #[serde(default)]
    pub industries: Vec<String>,
    /// Products or services offered.
    #[serde(default)]
    pub products: Vec<String>,
    /// Who the company sells to.
    #[serde(default)]
    pub target_market: String,
    /// Key value propositions.
    #[serde(default)]
    pub value_propositions: Vec<String>,
    /// Headquarters location, if stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
}

/// A candidate buyer persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Identifier, unique within one persona set.
    #[serde(default)]
    pub id: String,
    /// Short persona name, e.g. "Scaling Engineering Leader".
    pub name: String,
    /// Job titles this persona holds.
    #[serde(default)]
    pub job_titles: Vec<String>,
    /// Seniority level.
    #[serde(default)]
    pub seniority: String,
    /// Industries the persona works in.
    #[serde(default)]
    pub industries: Vec<String>,
    /// Organization size labels, e.g. "51-200".
    #[serde(default)]
    pub company_sizes: Vec<String>,
    /// Locations the persona is found in.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Problems the persona needs solved.
    #[serde(default)]
    pub pain_points: Vec<String>,
    /// What the persona wants to achieve.
    #[serde(default)]
    pub goals: Vec<String>,
}

/// The unordered set of personas produced by persona generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaSet {
    /// The personas.
    pub personas: Vec<Persona>,
}

impl PersonaSet {
    /// Looks up a persona by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Returns true if a persona with `id` is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of personas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

/// One persona's evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPersona {
    /// The persona being scored.
    pub persona_id: String,
    /// Composite score reported by the reasoning service.
    pub score: f64,
    /// Why the persona got this score.
    #[serde(default)]
    pub rationale: String,
}

/// Output of persona ranking: the ordered evaluation plus exactly one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaRanking {
    /// Evaluations, highest score first.
    pub ranked: Vec<RankedPersona>,
    /// The selected persona; always an element of the generated set.
    pub selected: Persona,
}

/// Personalized outreach for one lead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachContent {
    /// Email subject line.
    pub subject: String,
    /// Email body.
    pub body: String,
    /// Optional follow-up message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

/// Context shared by every content generation job of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignContext {
    /// Normalized subject key.
    pub subject_key: String,
    /// Company profile from website analysis.
    pub profile: CompanyProfile,
    /// The selected persona.
    pub persona: Persona,
}

/// A lead together with its generated outreach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedOutreach {
    /// The lead.
    pub lead: EnrichedLead,
    /// Content written for the lead.
    pub content: OutreachContent,
}
