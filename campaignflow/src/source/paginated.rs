use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{pages_for, CandidateSource, PageRequest, SourceKind, SourcePage};
use crate::core::FilterSet;
use crate::errors::SourceError;
use crate::providers::PeopleSearchProvider;

/// Synchronous paginated search: one provider request per page.
#[derive(Clone)]
pub struct PaginatedSource {
    provider: Arc<dyn PeopleSearchProvider>,
    max_page_size: u32,
}

impl std::fmt::Debug for PaginatedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedSource")
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

impl PaginatedSource {
    /// Creates a source over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn PeopleSearchProvider>, max_page_size: u32) -> Self {
        Self {
            provider,
            max_page_size: max_page_size.max(1),
        }
    }
}

#[async_trait]
impl CandidateSource for PaginatedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Paginated
    }

    async fn search(&self, filters: &FilterSet, request: PageRequest) -> Result<SourcePage, SourceError> {
        let page_size = request.page_size.clamp(1, self.max_page_size);
        let page = request.page.max(1);

        let mut result = self.provider.search_page(filters, page, page_size).await?;
        result.candidates.truncate(page_size as usize);

        let total_pages = if result.total_pages > 0 {
            result.total_pages
        } else {
            pages_for(result.total_available, page_size)
        };
        debug!(
            page,
            page_size,
            returned = result.candidates.len(),
            total_pages,
            "Fetched candidate page"
        );

        Ok(SourcePage {
            candidates: result.candidates,
            page,
            total_available: result.total_available,
            total_pages,
            notice: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::candidates;
    use crate::testing::mocks::FakePeopleSearch;

    #[tokio::test]
    async fn test_clamps_page_size() {
        let provider = Arc::new(FakePeopleSearch::new(candidates(250)));
        let source = PaginatedSource::new(provider.clone(), 100);

        let page = source
            .search(&FilterSet::new(), PageRequest::new(1, 500))
            .await
            .unwrap();

        assert_eq!(page.candidates.len(), 100);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_available, 250);
        assert_eq!(provider.requests(), vec![(1, 100)]);
    }

    #[tokio::test]
    async fn test_zero_page_size_becomes_one() {
        let provider = Arc::new(FakePeopleSearch::new(candidates(3)));
        let source = PaginatedSource::new(provider, 100);

        let page = source
            .search(&FilterSet::new(), PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(FakePeopleSearch::failing(503));
        let source = PaginatedSource::new(provider, 100);

        let err = source
            .search(&FilterSet::new(), PageRequest::new(1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Provider(_)));
    }
}
