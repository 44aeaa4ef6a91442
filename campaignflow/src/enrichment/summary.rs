//! Cost audit of one enrichment loop run.

use serde::{Deserialize, Serialize};

use crate::core::Degradation;
use crate::utils::{elapsed_ms, now_utc, Timestamp};

/// Why the enrichment loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Accumulated leads reached the target.
    TargetReached,
    /// The source has no further pages, or returned an empty one.
    SourceExhausted,
    /// The page cap was hit.
    PageLimit,
    /// The candidate spend cap was hit.
    CandidateBudget,
    /// Too many consecutive pages yielded no leads.
    CircuitBreaker,
    /// The source returned an error.
    SourceError,
}

impl StopReason {
    /// Returns true for the caps that protect provider spend.
    #[must_use]
    pub fn is_safety_limit(&self) -> bool {
        matches!(self, Self::PageLimit | Self::CandidateBudget | Self::CircuitBreaker)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TargetReached => "target_reached",
            Self::SourceExhausted => "source_exhausted",
            Self::PageLimit => "page_limit",
            Self::CandidateBudget => "candidate_budget",
            Self::CircuitBreaker => "circuit_breaker",
            Self::SourceError => "source_error",
        };
        f.write_str(s)
    }
}

/// Per-page numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    /// Page number.
    pub page: u32,
    /// Candidates kept from the page (after budget truncation).
    pub candidates: usize,
    /// Candidates already seen on earlier pages.
    pub duplicates: usize,
    /// Contact lookups made.
    pub lookups: usize,
    /// Leads produced.
    pub enriched: usize,
    /// Lookups that errored.
    pub errors: usize,
}

/// Summary of pages fetched and candidates consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    /// Leads requested.
    pub target_count: usize,
    /// Page size requested from the source.
    pub batch_size: u32,
    /// Candidate spend cap for the run.
    pub max_candidates: usize,
    /// Pages fetched.
    pub pages_fetched: u32,
    /// Candidates consumed across all pages.
    pub candidates_fetched: usize,
    /// Candidates skipped as duplicates.
    pub duplicates_skipped: usize,
    /// Contact lookups made.
    pub lookups_attempted: usize,
    /// Lookups that found a verified address.
    pub lookups_succeeded: usize,
    /// Lookups that errored (counted as not found).
    pub lookup_errors: usize,
    /// Leads returned.
    pub leads_returned: usize,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Per-page numbers, in fetch order.
    #[serde(default)]
    pub pages: Vec<PageStats>,
    /// Degradations reported by the source.
    #[serde(default)]
    pub notices: Vec<Degradation>,
    /// Fingerprint of the filters searched with.
    pub filter_fingerprint: String,
    /// When the loop started.
    pub started_at: Timestamp,
    /// When the loop stopped.
    pub finished_at: Timestamp,
}

impl EnrichmentSummary {
    /// Summary of a loop that never completed, e.g. a task that panicked.
    #[must_use]
    pub fn aborted(target_count: usize, filter_fingerprint: String, notice: Degradation) -> Self {
        let now = now_utc();
        Self {
            target_count,
            batch_size: 0,
            max_candidates: 0,
            pages_fetched: 0,
            candidates_fetched: 0,
            duplicates_skipped: 0,
            lookups_attempted: 0,
            lookups_succeeded: 0,
            lookup_errors: 0,
            leads_returned: 0,
            stop_reason: StopReason::SourceError,
            pages: Vec::new(),
            notices: vec![notice],
            filter_fingerprint,
            started_at: now,
            finished_at: now,
        }
    }

    /// Returns true if the loop stopped on a safety limit short of target.
    #[must_use]
    pub fn is_exhausted_early(&self) -> bool {
        self.stop_reason.is_safety_limit() && self.leads_returned < self.target_count
    }

    /// Fraction of lookups that succeeded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        if self.lookups_attempted == 0 {
            0.0
        } else {
            self.lookups_succeeded as f64 / self.lookups_attempted as f64
        }
    }

    /// Wall-clock duration of the loop.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        elapsed_ms(self.started_at, self.finished_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_limits() {
        assert!(StopReason::PageLimit.is_safety_limit());
        assert!(StopReason::CandidateBudget.is_safety_limit());
        assert!(StopReason::CircuitBreaker.is_safety_limit());
        assert!(!StopReason::TargetReached.is_safety_limit());
        assert!(!StopReason::SourceExhausted.is_safety_limit());
        assert!(!StopReason::SourceError.is_safety_limit());
    }

    #[test]
    fn test_stop_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StopReason::CircuitBreaker).unwrap(),
            r#""circuit_breaker""#
        );
        assert_eq!(StopReason::SourceExhausted.to_string(), "source_exhausted");
    }
}
