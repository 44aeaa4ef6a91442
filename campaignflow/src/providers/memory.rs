//! In-process campaign store.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::CampaignStore;
use crate::core::CampaignResult;
use crate::errors::ProviderError;

/// Keeps finished campaigns in memory, keyed by a generated id.
#[derive(Debug, Default)]
pub struct InMemoryCampaignStore {
    campaigns: DashMap<String, CampaignResult>,
}

impl InMemoryCampaignStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored campaign.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<CampaignResult> {
        self.campaigns.get(id).map(|entry| entry.value().clone())
    }

    /// Returns the most recent campaign stored for `subject_key`.
    #[must_use]
    pub fn latest_for(&self, subject_key: &str) -> Option<CampaignResult> {
        self.campaigns
            .iter()
            .filter(|entry| entry.value().subject_key == subject_key)
            .max_by_key(|entry| entry.value().completed_at)
            .map(|entry| entry.value().clone())
    }

    /// Number of stored campaigns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn save(&self, result: &CampaignResult) -> Result<String, ProviderError> {
        let id = format!("cmp_{}", Uuid::new_v4().simple());
        self.campaigns.insert(id.clone(), result.clone());
        tracing::debug!(campaign_id = %id, subject_key = %result.subject_key, "Stored campaign");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::campaign_result;

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryCampaignStore::new();
        assert!(store.is_empty());

        let result = campaign_result("acme.io");
        let id = store.save(&result).await.unwrap();

        assert!(id.starts_with("cmp_"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).map(|r| r.subject_key), Some("acme.io".to_string()));
        assert!(store.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_latest_for_subject() {
        let store = InMemoryCampaignStore::new();
        let first = campaign_result("acme.io");
        let mut second = campaign_result("acme.io");
        second.completed_at = first.completed_at + chrono::Duration::seconds(5);
        second.leads.clear();

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        store.save(&campaign_result("globex.com")).await.unwrap();

        let latest = store.latest_for("acme.io").unwrap();
        assert!(latest.leads.is_empty());
        assert!(store.latest_for("initech.com").is_none());
    }
}
