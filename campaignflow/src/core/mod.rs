//! Core data model: candidates, leads, filters, stage outputs and run state.

pub mod analysis;
pub mod filters;
pub mod leads;
pub mod result;
pub mod status;

pub use analysis::{
    CampaignContext, CompanyProfile, OutreachContent, Persona, PersonaRanking, PersonaSet,
    PersonalizedOutreach, RankedPersona,
};
pub use filters::{FilterSet, OrgSizeBucket};
pub use leads::{Candidate, ContactAddress, EnrichedLead, LeadOrigin};
pub use result::{
    CampaignResult, Degradation, DegradationKind, FilterSource, PipelineRun, StageResult,
    StageStatus, StageTrace,
};
pub use status::{RunStatus, StageName};
