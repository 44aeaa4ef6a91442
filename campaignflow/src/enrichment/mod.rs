//! The search-then-verify enrichment loop.
//!
//! Each iteration fetches one page of candidates and looks up verified
//! contact addresses for them in bounded-concurrency sub-batches. The loop
//! stops on the first of:
//!
//! - accumulated leads reached the target
//! - `zero_yield_limit` consecutive pages produced no lead (circuit breaker)
//! - the candidate spend cap was reached
//! - the source has no further pages
//! - the page cap was reached
//! - the source returned an error

mod summary;

pub use summary::{EnrichmentSummary, PageStats, StopReason};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{Candidate, Degradation, DegradationKind, EnrichedLead, FilterSet};
use crate::errors::ConfigError;
use crate::normalize::Normalizer;
use crate::providers::ContactEnricher;
use crate::source::{CandidateSource, PageRequest, PROVIDER_MAX_PAGE_SIZE};
use crate::utils::now_utc;

/// Limits and sizing of the enrichment loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Smallest page requested.
    #[serde(default = "default_floor_size")]
    pub floor_size: u32,
    /// Largest page the provider accepts.
    #[serde(default = "default_provider_max_page_size")]
    pub provider_max_page_size: u32,
    /// Oversampling factor over the target (expected lookup hit rate is ~50%).
    #[serde(default = "default_oversample")]
    pub oversample: u32,
    /// Page cap.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Absolute candidate cap.
    #[serde(default = "default_absolute_candidate_ceiling")]
    pub absolute_candidate_ceiling: usize,
    /// Per-target candidate cap multiplier.
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
    /// Consecutive zero-yield pages that trip the circuit breaker.
    #[serde(default = "default_zero_yield_limit")]
    pub zero_yield_limit: u32,
    /// Concurrent lookups per sub-batch.
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

fn default_floor_size() -> u32 {
    10
}

fn default_provider_max_page_size() -> u32 {
    PROVIDER_MAX_PAGE_SIZE
}

fn default_oversample() -> u32 {
    2
}

fn default_max_pages() -> u32 {
    10
}

fn default_absolute_candidate_ceiling() -> usize {
    200
}

fn default_candidate_multiplier() -> usize {
    10
}

fn default_zero_yield_limit() -> u32 {
    3
}

fn default_lookup_concurrency() -> usize {
    10
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            floor_size: default_floor_size(),
            provider_max_page_size: default_provider_max_page_size(),
            oversample: default_oversample(),
            max_pages: default_max_pages(),
            absolute_candidate_ceiling: default_absolute_candidate_ceiling(),
            candidate_multiplier: default_candidate_multiplier(),
            zero_yield_limit: default_zero_yield_limit(),
            lookup_concurrency: default_lookup_concurrency(),
        }
    }
}

impl EnrichmentConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages = pages;
        self
    }

    /// Sets the circuit breaker threshold.
    #[must_use]
    pub fn with_zero_yield_limit(mut self, limit: u32) -> Self {
        self.zero_yield_limit = limit;
        self
    }

    /// Sets the lookup concurrency.
    #[must_use]
    pub fn with_lookup_concurrency(mut self, concurrency: usize) -> Self {
        self.lookup_concurrency = concurrency;
        self
    }

    /// Page size for a target: `clamp(target * oversample, floor, provider max)`.
    #[must_use]
    pub fn batch_size(&self, target: usize) -> u32 {
        let wanted = u32::try_from(target)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.oversample);
        let floor = self.floor_size.min(self.provider_max_page_size);
        wanted.clamp(floor, self.provider_max_page_size)
    }

    /// Candidate cap for a target: `min(ceiling, target * multiplier)`.
    #[must_use]
    pub fn max_candidates(&self, target: usize) -> usize {
        self.absolute_candidate_ceiling
            .min(target.saturating_mul(self.candidate_multiplier))
    }

    /// Checks the config for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_max_page_size == 0 || self.provider_max_page_size > PROVIDER_MAX_PAGE_SIZE {
            return Err(ConfigError::invalid(
                "enrichment.provider_max_page_size",
                format!("must be between 1 and {PROVIDER_MAX_PAGE_SIZE}"),
            ));
        }
        if self.floor_size == 0 {
            return Err(ConfigError::invalid("enrichment.floor_size", "must be at least 1"));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::invalid("enrichment.max_pages", "must be at least 1"));
        }
        if self.zero_yield_limit == 0 {
            return Err(ConfigError::invalid("enrichment.zero_yield_limit", "must be at least 1"));
        }
        if self.lookup_concurrency == 0 {
            return Err(ConfigError::invalid("enrichment.lookup_concurrency", "must be at least 1"));
        }
        if self.oversample == 0 {
            return Err(ConfigError::invalid("enrichment.oversample", "must be at least 1"));
        }
        Ok(())
    }
}

/// Leads plus the cost audit of the run that found them.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    /// At most `target_count` leads, in discovery order.
    pub leads: Vec<EnrichedLead>,
    /// Cost audit.
    pub summary: EnrichmentSummary,
}

struct PageEnrichment {
    leads: Vec<EnrichedLead>,
    attempted: usize,
    errors: usize,
}

/// Drives candidate pages through contact lookups until a stop condition.
#[derive(Clone)]
pub struct EnrichmentLoop {
    source: Arc<dyn CandidateSource>,
    enricher: Arc<dyn ContactEnricher>,
    normalizer: Arc<dyn Normalizer>,
    config: EnrichmentConfig,
}

impl std::fmt::Debug for EnrichmentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentLoop")
            .field("source", &self.source.kind())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EnrichmentLoop {
    /// Creates a loop.
    #[must_use]
    pub fn new(
        source: Arc<dyn CandidateSource>,
        enricher: Arc<dyn ContactEnricher>,
        normalizer: Arc<dyn Normalizer>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            source,
            enricher,
            normalizer,
            config,
        }
    }

    /// Returns the loop's config.
    #[must_use]
    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Accumulates up to `target` enriched leads for `filters`.
    pub async fn run(&self, filters: &FilterSet, target: usize) -> EnrichmentOutcome {
        let started_at = now_utc();
        let fingerprint = filters.fingerprint();
        let batch_size = self.config.batch_size(target);
        let max_candidates = self.config.max_candidates(target);

        let mut leads: Vec<EnrichedLead> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pages: Vec<PageStats> = Vec::new();
        let mut notices: Vec<Degradation> = Vec::new();
        let mut candidates_fetched = 0usize;
        let mut zero_streak = 0u32;
        let mut page = 1u32;

        info!(
            filters = %fingerprint,
            target,
            batch_size,
            max_candidates,
            source = %self.source.kind(),
            "Starting enrichment loop"
        );

        let stop_reason = if target == 0 || max_candidates == 0 {
            StopReason::TargetReached
        } else {
            loop {
                let source_page = match self
                    .source
                    .search(filters, PageRequest::new(page, batch_size))
                    .await
                {
                    Ok(source_page) => source_page,
                    Err(e) => {
                        warn!(filters = %fingerprint, page, error = %e, "Candidate source failed");
                        let kind = if e.is_timeout() {
                            DegradationKind::SourceTimeout
                        } else {
                            DegradationKind::SourceError
                        };
                        notices.push(Degradation::new(kind, e.to_string()));
                        break StopReason::SourceError;
                    }
                };

                let is_last = source_page.is_last();
                if let Some(notice) = source_page.notice {
                    notices.push(notice);
                }

                let mut candidates = source_page.candidates;
                candidates.truncate(max_candidates - candidates_fetched);
                candidates_fetched += candidates.len();

                let fetched = candidates.len();
                let fresh: Vec<Candidate> = candidates
                    .into_iter()
                    .map(|c| self.normalizer.candidate(c))
                    .filter(|c| seen.insert(c.dedupe_key()))
                    .collect();
                let duplicates = fetched - fresh.len();

                let enriched = self.enrich_page(fresh, target - leads.len()).await;
                let yielded = enriched.leads.len();
                pages.push(PageStats {
                    page,
                    candidates: fetched,
                    duplicates,
                    lookups: enriched.attempted,
                    enriched: yielded,
                    errors: enriched.errors,
                });
                leads.extend(enriched.leads);

                debug!(
                    filters = %fingerprint,
                    page,
                    fetched,
                    yielded,
                    total_leads = leads.len(),
                    "Enrichment page done"
                );

                zero_streak = if yielded == 0 { zero_streak + 1 } else { 0 };

                if leads.len() >= target {
                    break StopReason::TargetReached;
                }
                if zero_streak >= self.config.zero_yield_limit {
                    break StopReason::CircuitBreaker;
                }
                if candidates_fetched >= max_candidates {
                    break StopReason::CandidateBudget;
                }
                if is_last {
                    break StopReason::SourceExhausted;
                }
                if page >= self.config.max_pages {
                    break StopReason::PageLimit;
                }
                page += 1;
            }
        };

        leads.truncate(target);
        let summary = EnrichmentSummary {
            target_count: target,
            batch_size,
            max_candidates,
            pages_fetched: u32::try_from(pages.len()).unwrap_or(u32::MAX),
            candidates_fetched,
            duplicates_skipped: pages.iter().map(|p| p.duplicates).sum(),
            lookups_attempted: pages.iter().map(|p| p.lookups).sum(),
            lookups_succeeded: pages.iter().map(|p| p.enriched).sum(),
            lookup_errors: pages.iter().map(|p| p.errors).sum(),
            leads_returned: leads.len(),
            stop_reason,
            pages,
            notices,
            filter_fingerprint: fingerprint,
            started_at,
            finished_at: now_utc(),
        };

        info!(
            filters = %summary.filter_fingerprint,
            leads = summary.leads_returned,
            target,
            pages = summary.pages_fetched,
            candidates = summary.candidates_fetched,
            stop_reason = %summary.stop_reason,
            "Enrichment loop finished"
        );

        EnrichmentOutcome { leads, summary }
    }

    /// Looks up `candidates` in sub-batches, stopping once `needed` are found.
    async fn enrich_page(&self, candidates: Vec<Candidate>, needed: usize) -> PageEnrichment {
        let mut result = PageEnrichment {
            leads: Vec::new(),
            attempted: 0,
            errors: 0,
        };
        let concurrency = self.config.lookup_concurrency.max(1);

        for chunk in candidates.chunks(concurrency) {
            if result.leads.len() >= needed {
                break;
            }
            let lookups = chunk.iter().map(|c| self.enricher.enrich(c));
            let answers = join_all(lookups).await;
            result.attempted += chunk.len();

            for (candidate, answer) in chunk.iter().zip(answers) {
                match answer {
                    Ok(Some(contact)) => {
                        result.leads.push(EnrichedLead::new(candidate.clone(), contact));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        result.errors += 1;
                        debug!(candidate = %candidate.dedupe_key(), error = %e, "Contact lookup failed");
                    }
                }
            }
        }

        result.leads.truncate(needed);
        result
    }
}
