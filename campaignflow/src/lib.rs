//! # Campaignflow
//!
//! Orchestration engine for generating outbound marketing campaigns.
//!
//! A campaign run for a domain goes through:
//!
//! - **Analysis stages**: four dependent reasoning stages (website analysis,
//!   persona generation, persona ranking, filter derivation)
//! - **Lead sourcing**: the enrichment loop alternating candidate search pages
//!   with contact lookups, bounded by page, spend and circuit-breaker limits
//! - **Content generation**: a best-effort fan-out producing one piece of
//!   personalized outreach per lead
//! - **Progress tracking**: a keyed store callers poll while a run is in flight
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use campaignflow::prelude::*;
//!
//! let pipeline = CampaignPipeline::new(collaborators, &CampaignConfig::default());
//! let tracker = ProgressTracker::new(ProgressConfig::default());
//!
//! let request = CampaignRequest::new("https://acme.io");
//! let result = pipeline.run(request, tracker.sink()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod enrichment;
pub mod errors;
pub mod generation;
pub mod normalize;
pub mod pipeline;
pub mod poller;
pub mod progress;
pub mod providers;
pub mod source;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::CampaignConfig;
    pub use crate::core::{
        CampaignContext, CampaignResult, Candidate, CompanyProfile, EnrichedLead, FilterSet,
        LeadOrigin, OrgSizeBucket, Persona, PipelineRun, RunStatus, StageName, StageResult,
    };
    pub use crate::enrichment::{EnrichmentConfig, EnrichmentLoop, EnrichmentSummary, StopReason};
    pub use crate::errors::{CampaignError, ProviderError, SourceError, StageFailure};
    pub use crate::generation::{ContentGenerator, GenerationConfig, GenerationReport};
    pub use crate::normalize::{DefaultNormalizer, Normalizer};
    pub use crate::pipeline::{CampaignPipeline, CampaignRequest, Collaborators, PipelineConfig};
    pub use crate::poller::{poll_job, PollConfig, PollOutcome};
    pub use crate::progress::{
        ProgressConfig, ProgressEvent, ProgressRecord, ProgressSink, ProgressStore,
        ProgressTracker,
    };
    pub use crate::providers::{
        CampaignStore, ContactEnricher, ContentFetcher, ContentWriter, ReasoningService,
    };
    pub use crate::source::{CandidateSource, SourceKind, SourcePage};
    pub use crate::utils::{generate_run_id, Timestamp};
}
