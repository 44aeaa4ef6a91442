//! Sample domain values for tests and demos.

use uuid::Uuid;

use crate::core::{
    CampaignContext, CampaignResult, Candidate, CompanyProfile, ContactAddress, EnrichedLead,
    FilterSet, FilterSource, OrgSizeBucket, OutreachContent, Persona, PersonaRanking,
    PersonalizedOutreach, RankedPersona,
};
use crate::enrichment::{EnrichmentSummary, StopReason};
use crate::utils::now_utc;

const TITLES: &[&str] = &["Head of Growth", "VP Operations", "Director of Sales"];
const LOCATIONS: &[&str] = &["Austin, TX", "Denver, CO", "Berlin, Germany"];

/// `n` distinct candidates with ids `cand-1` through `cand-{n}`.
#[must_use]
pub fn candidates(n: usize) -> Vec<Candidate> {
    (1..=n)
        .map(|i| {
            Candidate::new(format!("Candidate {i}"), TITLES[i % TITLES.len()])
                .with_id(format!("cand-{i}"))
                .with_organization(format!("Org {i}"))
                .with_location(LOCATIONS[i % LOCATIONS.len()])
        })
        .collect()
}

/// A provider lead named `name`.
#[must_use]
pub fn enriched_lead(name: &str) -> EnrichedLead {
    let slug = name.to_lowercase().replace(' ', ".");
    let candidate = Candidate::new(name, "Head of Growth")
        .with_id(format!("lead-{slug}"))
        .with_organization("Northwind")
        .with_location("Austin, TX");
    EnrichedLead::new(candidate, ContactAddress::verified(format!("{slug}@northwind.example")))
}

/// `n` provider leads with distinct names.
#[must_use]
pub fn enriched_leads(n: usize) -> Vec<EnrichedLead> {
    (1..=n).map(|i| enriched_lead(&format!("Lead {i}"))).collect()
}

/// Acme's company profile.
#[must_use]
pub fn company_profile() -> CompanyProfile {
    CompanyProfile {
        company_name: "Acme".to_string(),
        summary: "Acme builds workflow automation for operations teams.".to_string(),
        industries: vec!["Software".to_string()],
        products: vec!["Acme Flow".to_string()],
        target_market: "Mid-market operations teams".to_string(),
        value_propositions: vec!["Fewer manual handoffs".to_string()],
        headquarters: Some("Austin, TX".to_string()),
    }
}

/// The operations-leader persona.
#[must_use]
pub fn persona() -> Persona {
    Persona {
        id: "ops-leader".to_string(),
        name: "Operations Leader".to_string(),
        job_titles: vec!["VP Operations".to_string(), "Head of Operations".to_string()],
        seniority: "VP".to_string(),
        industries: vec!["Software".to_string()],
        company_sizes: vec!["51-200".to_string()],
        locations: vec!["United States".to_string()],
        pain_points: vec!["Manual handoffs".to_string()],
        goals: vec!["Scale without headcount".to_string()],
    }
}

/// Context for content generation.
#[must_use]
pub fn campaign_context() -> CampaignContext {
    CampaignContext {
        subject_key: "acme.io".to_string(),
        profile: company_profile(),
        persona: persona(),
    }
}

/// Filters matching [`persona`].
#[must_use]
pub fn filter_set() -> FilterSet {
    FilterSet::new()
        .with_titles(["VP Operations", "Head of Operations"])
        .with_org_sizes([OrgSizeBucket::Medium])
        .with_industries(["Software"])
}

/// A completed campaign for `subject_key` with two leads.
#[must_use]
pub fn campaign_result(subject_key: &str) -> CampaignResult {
    let now = now_utc();
    let persona = persona();
    let leads = enriched_leads(2);
    let outreach = leads
        .iter()
        .map(|lead| PersonalizedOutreach {
            lead: lead.clone(),
            content: OutreachContent {
                subject: format!("Hello {}", lead.name()),
                body: "Quick question about your handoffs.".to_string(),
                follow_up: None,
            },
        })
        .collect();
    let filters = filter_set();
    let fingerprint = filters.fingerprint();

    CampaignResult {
        run_id: Uuid::now_v7(),
        subject_key: subject_key.to_string(),
        campaign_id: None,
        profile: company_profile(),
        personas: vec![persona.clone()],
        ranking: PersonaRanking {
            ranked: vec![RankedPersona {
                persona_id: persona.id.clone(),
                score: 90.0,
                rationale: "Best fit".to_string(),
            }],
            selected: persona,
        },
        filters: filters.clone(),
        filter_source: FilterSource::Derived,
        derived_filters: filters,
        leads,
        outreach,
        enrichment: EnrichmentSummary {
            target_count: 2,
            batch_size: 10,
            max_candidates: 20,
            pages_fetched: 1,
            candidates_fetched: 10,
            duplicates_skipped: 0,
            lookups_attempted: 4,
            lookups_succeeded: 2,
            lookup_errors: 0,
            leads_returned: 2,
            stop_reason: StopReason::TargetReached,
            pages: Vec::new(),
            notices: Vec::new(),
            filter_fingerprint: fingerprint,
            started_at: now,
            finished_at: now,
        },
        stages: Vec::new(),
        degradations: Vec::new(),
        started_at: now,
        completed_at: now,
    }
}
