//! Enrichment started before the analysis stages finish.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::{Degradation, DegradationKind, FilterSet};
use crate::enrichment::{EnrichmentLoop, EnrichmentOutcome, EnrichmentSummary};

/// A spawned enrichment loop. Dropping it aborts the task.
pub(crate) struct EarlyEnrichment {
    handle: Option<JoinHandle<EnrichmentOutcome>>,
    target: usize,
    fingerprint: String,
}

impl EarlyEnrichment {
    /// Spawns `enrichment` for caller-supplied `filters`.
    pub(crate) fn spawn(enrichment: EnrichmentLoop, filters: FilterSet, target: usize) -> Self {
        let fingerprint = filters.fingerprint();
        info!(filters = %fingerprint, target, "Starting enrichment early");
        let handle = tokio::spawn(async move { enrichment.run(&filters, target).await });
        Self {
            handle: Some(handle),
            target,
            fingerprint,
        }
    }

    /// Waits for the loop. A task that panicked yields an empty outcome.
    pub(crate) async fn join(mut self) -> EnrichmentOutcome {
        let Some(handle) = self.handle.take() else {
            return self.empty("enrichment task already joined".to_string());
        };
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(filters = %self.fingerprint, error = %e, "Early enrichment task failed");
                self.empty(format!("enrichment task failed: {e}"))
            }
        }
    }

    fn empty(&self, message: String) -> EnrichmentOutcome {
        EnrichmentOutcome {
            leads: Vec::new(),
            summary: EnrichmentSummary::aborted(
                self.target,
                self.fingerprint.clone(),
                Degradation::new(DegradationKind::SourceError, message),
            ),
        }
    }
}

impl Drop for EarlyEnrichment {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                info!(filters = %self.fingerprint, "Aborting early enrichment");
            }
            handle.abort();
        }
    }
}
