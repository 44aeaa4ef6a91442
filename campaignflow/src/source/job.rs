use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::{pages_for, CandidateSource, PageRequest, SourceKind, SourcePage};
use crate::core::{Degradation, DegradationKind, FilterSet};
use crate::errors::SourceError;
use crate::poller::{poll_job, PollConfig, PollOutcome};
use crate::providers::{JobSearchRequest, PeopleSearchJobProvider};

/// Job-based search: submit a request for the page window, then poll.
///
/// A job that times out or reports an error yields an empty page with a
/// notice rather than an error, so callers can fall back.
#[derive(Clone)]
pub struct JobSearchSource {
    provider: Arc<dyn PeopleSearchJobProvider>,
    poll: PollConfig,
    max_page_size: u32,
}

impl std::fmt::Debug for JobSearchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSearchSource")
            .field("poll", &self.poll)
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

impl JobSearchSource {
    /// Creates a source over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn PeopleSearchJobProvider>, poll: PollConfig, max_page_size: u32) -> Self {
        Self {
            provider,
            poll,
            max_page_size: max_page_size.max(1),
        }
    }
}

#[async_trait]
impl CandidateSource for JobSearchSource {
    fn kind(&self) -> SourceKind {
        SourceKind::AsyncJob
    }

    async fn search(&self, filters: &FilterSet, request: PageRequest) -> Result<SourcePage, SourceError> {
        let page_size = request.page_size.clamp(1, self.max_page_size);
        let page = request.page.max(1);
        let job_request = JobSearchRequest {
            filters: filters.clone(),
            limit: page_size,
            offset: PageRequest::new(page, page_size).offset(),
        };

        let handle = self.provider.submit(&job_request).await?;
        info!(job = %handle, page, page_size, "Submitted search job");

        let provider = &self.provider;
        let outcome = poll_job(&self.poll, &handle, || provider.status(&handle)).await;

        match outcome {
            PollOutcome::Complete { mut payload, .. } => {
                payload.candidates.truncate(page_size as usize);
                let total_pages = if payload.total_pages > 0 {
                    payload.total_pages
                } else {
                    pages_for(payload.total_available, page_size)
                };
                Ok(SourcePage {
                    candidates: payload.candidates,
                    page,
                    total_available: payload.total_available,
                    total_pages,
                    notice: None,
                })
            }
            PollOutcome::Failed { message, .. } => {
                warn!(job = %handle, error = %message, "Search job failed, returning empty page");
                Ok(SourcePage::degraded(
                    page,
                    Degradation::new(DegradationKind::SourceError, SourceError::Job(message).to_string()),
                ))
            }
            PollOutcome::TimedOut { attempts, elapsed } => {
                let err = SourceError::Timeout {
                    attempts,
                    elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                };
                warn!(job = %handle, error = %err, "Search job timed out, returning empty page");
                Ok(SourcePage::degraded(
                    page,
                    Degradation::new(DegradationKind::SourceTimeout, err.to_string()),
                ))
            }
        }
    }
}
