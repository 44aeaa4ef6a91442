//! Stage names and run status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The named steps of a campaign run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Stage 1: subject content → company profile.
    WebsiteAnalysis,
    /// Stage 2: profile → candidate personas.
    PersonaGeneration,
    /// Stage 3: profile + personas → ranking and selected persona.
    PersonaRanking,
    /// Stage 4: selected persona → search filters.
    FilterDerivation,
    /// The enrichment loop (search + verify).
    LeadSourcing,
    /// Per-lead outreach fan-out.
    ContentGeneration,
    /// Handing the finished campaign to the store.
    Persistence,
}

impl StageName {
    /// The four reasoning stages, in dependency order.
    pub const ANALYSIS: [Self; 4] = [
        Self::WebsiteAnalysis,
        Self::PersonaGeneration,
        Self::PersonaRanking,
        Self::FilterDerivation,
    ];

    /// Returns the snake_case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebsiteAnalysis => "website_analysis",
            Self::PersonaGeneration => "persona_generation",
            Self::PersonaRanking => "persona_ranking",
            Self::FilterDerivation => "filter_derivation",
            Self::LeadSourcing => "lead_sourcing",
            Self::ContentGeneration => "content_generation",
            Self::Persistence => "persistence",
        }
    }

    /// Returns true for the four reasoning stages.
    #[must_use]
    pub fn is_analysis(&self) -> bool {
        Self::ANALYSIS.contains(self)
    }

    /// Human-readable label used in progress messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::WebsiteAnalysis => "Analyzing website",
            Self::PersonaGeneration => "Generating personas",
            Self::PersonaRanking => "Ranking personas",
            Self::FilterDerivation => "Deriving search filters",
            Self::LeadSourcing => "Finding and verifying leads",
            Self::ContentGeneration => "Writing personalized outreach",
            Self::Persistence => "Saving campaign",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a pipeline run, as seen by pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted but not started.
    #[default]
    Pending,
    /// A stage is executing.
    Running,
    /// Finished with a result.
    Complete,
    /// Aborted by a run-fatal error.
    Failed,
}

impl RunStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
