//! Candidate source adapter.
//!
//! One [`CandidateSource`] interface over two provider strategies: a
//! synchronous paginated search ([`PaginatedSource`]) and an asynchronous
//! job-based search driven by the job poller ([`JobSearchSource`]).

mod job;
mod paginated;

pub use job::JobSearchSource;
pub use paginated::PaginatedSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{Candidate, Degradation, FilterSet};
use crate::errors::{ConfigError, SourceError};
use crate::poller::PollConfig;
use crate::providers::{PeopleSearchJobProvider, PeopleSearchProvider};

/// Hard upper bound on provider page size.
pub const PROVIDER_MAX_PAGE_SIZE: u32 = 100;

/// Which provider strategy a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One synchronous request per page.
    #[default]
    Paginated,
    /// Submit a job, then poll it.
    AsyncJob,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paginated => write!(f, "paginated"),
            Self::AsyncJob => write!(f, "async_job"),
        }
    }
}

/// Source selection and page sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Provider strategy.
    #[serde(default)]
    pub kind: SourceKind,
    /// Largest page the provider accepts.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_max_page_size() -> u32 {
    PROVIDER_MAX_PAGE_SIZE
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Paginated,
            max_page_size: PROVIDER_MAX_PAGE_SIZE,
        }
    }
}

impl SourceConfig {
    /// Checks the config for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 || self.max_page_size > PROVIDER_MAX_PAGE_SIZE {
            return Err(ConfigError::invalid(
                "source.max_page_size",
                format!("must be between 1 and {PROVIDER_MAX_PAGE_SIZE}"),
            ));
        }
        Ok(())
    }
}

/// Which page to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed page number.
    pub page: u32,
    /// Requested results per page.
    pub page_size: u32,
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Results to skip before this page.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// One page of candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePage {
    /// Candidates on this page.
    pub candidates: Vec<Candidate>,
    /// The page number.
    pub page: u32,
    /// Total matches the provider reports.
    pub total_available: u64,
    /// Total pages the provider reports.
    pub total_pages: u32,
    /// Why the page is empty, when the source degraded instead of failing.
    pub notice: Option<Degradation>,
}

impl SourcePage {
    /// An empty page explaining why nothing was returned.
    #[must_use]
    pub fn degraded(page: u32, notice: Degradation) -> Self {
        Self {
            candidates: Vec::new(),
            page,
            total_available: 0,
            total_pages: 0,
            notice: Some(notice),
        }
    }

    /// Returns true if no further page can yield candidates.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.candidates.is_empty() || self.page >= self.total_pages
    }
}

/// Total pages implied by `total_available` when the provider omits it.
#[must_use]
pub fn pages_for(total_available: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(total_available.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}

/// A people-search backend producing candidate pages.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// The strategy this source uses.
    fn kind(&self) -> SourceKind;

    /// Fetches one page of candidates matching `filters`.
    async fn search(&self, filters: &FilterSet, request: PageRequest) -> Result<SourcePage, SourceError>;
}

/// Builds the configured source variant.
pub fn build_source(
    config: &SourceConfig,
    poll: &PollConfig,
    paginated: Option<Arc<dyn PeopleSearchProvider>>,
    jobs: Option<Arc<dyn PeopleSearchJobProvider>>,
) -> Result<Arc<dyn CandidateSource>, ConfigError> {
    config.validate()?;
    match config.kind {
        SourceKind::Paginated => paginated
            .map(|provider| {
                Arc::new(PaginatedSource::new(provider, config.max_page_size)) as Arc<dyn CandidateSource>
            })
            .ok_or_else(|| {
                ConfigError::invalid("source.kind", "paginated source selected but no search provider configured")
            }),
        SourceKind::AsyncJob => jobs
            .map(|provider| {
                Arc::new(JobSearchSource::new(provider, poll.clone(), config.max_page_size))
                    as Arc<dyn CandidateSource>
            })
            .ok_or_else(|| {
                ConfigError::invalid("source.kind", "async_job source selected but no job provider configured")
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{FakeJobProvider, FakePeopleSearch};

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(1, 20).offset(), 0);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(0, 10), 0);
        assert_eq!(pages_for(10, 10), 1);
        assert_eq!(pages_for(11, 10), 2);
        assert_eq!(pages_for(5, 0), 0);
    }

    #[test]
    fn test_source_page_is_last() {
        let page = SourcePage {
            candidates: vec![Candidate::new("Ana", "CTO")],
            page: 1,
            total_available: 30,
            total_pages: 3,
            notice: None,
        };
        assert!(!page.is_last());

        let last = SourcePage { page: 3, ..page.clone() };
        assert!(last.is_last());

        let empty = SourcePage {
            candidates: Vec::new(),
            ..page
        };
        assert!(empty.is_last());
    }

    #[test]
    fn test_build_source_selects_variant() {
        let search: Arc<dyn PeopleSearchProvider> = Arc::new(FakePeopleSearch::new(Vec::new()));
        let jobs: Arc<dyn PeopleSearchJobProvider> = Arc::new(FakeJobProvider::never_completes());
        let poll = PollConfig::default();

        let source = build_source(&SourceConfig::default(), &poll, Some(search.clone()), None).unwrap();
        assert_eq!(source.kind(), SourceKind::Paginated);

        let config = SourceConfig {
            kind: SourceKind::AsyncJob,
            ..SourceConfig::default()
        };
        let source = build_source(&config, &poll, Some(search), Some(jobs)).unwrap();
        assert_eq!(source.kind(), SourceKind::AsyncJob);

        assert!(build_source(&config, &poll, None, None).is_err());
    }

    #[test]
    fn test_source_config_validation() {
        let config = SourceConfig {
            max_page_size: 500,
            ..SourceConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(SourceConfig::default().validate().is_ok());
    }
}
