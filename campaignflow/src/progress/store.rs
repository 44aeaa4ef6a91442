//! Keyed progress store with TTL eviction.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::record::ProgressRecord;

#[derive(Debug, Clone)]
struct StoredRecord {
    record: ProgressRecord,
    stored_at: Instant,
}

/// Latest progress record per subject key.
///
/// Each update is a single atomic replace of the key's entry; the last
/// writer wins. Entries older than the TTL are treated as absent.
#[derive(Debug)]
pub struct ProgressStore {
    records: DashMap<String, StoredRecord>,
    ttl: Duration,
}

impl ProgressStore {
    /// Creates a store whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
        }
    }

    /// Replaces the record for `key`.
    pub fn update(&self, key: &str, record: ProgressRecord) {
        self.records.insert(
            key.to_string(),
            StoredRecord {
                record,
                stored_at: Instant::now(),
            },
        );
    }

    /// Stores `record` unless `key` already has a live, non-terminal run.
    ///
    /// The check and the insert happen under the key's shard lock, so two
    /// concurrent callers cannot both begin. On conflict the live record is
    /// returned.
    pub fn try_begin(&self, key: &str, record: ProgressRecord) -> Result<(), ProgressRecord> {
        let stored = StoredRecord {
            record,
            stored_at: Instant::now(),
        };
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                if current.stored_at.elapsed() <= self.ttl && !current.record.is_terminal() {
                    return Err(current.record.clone());
                }
                entry.insert(stored);
            }
            Entry::Vacant(entry) => {
                entry.insert(stored);
            }
        }
        Ok(())
    }

    /// Returns the latest unexpired record for `key`.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<ProgressRecord> {
        let entry = self.records.get(key)?;
        if entry.stored_at.elapsed() > self.ttl {
            drop(entry);
            self.records
                .remove_if(key, |_, stored| stored.stored_at.elapsed() > self.ttl);
            return None;
        }
        Some(entry.record.clone())
    }

    /// Removes the record for `key`.
    pub fn remove(&self, key: &str) -> Option<ProgressRecord> {
        self.records.remove(key).map(|(_, stored)| stored.record)
    }

    /// Drops every expired record and returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, stored| stored.stored_at.elapsed() <= self.ttl);
        let evicted = before.saturating_sub(self.records.len());
        if evicted > 0 {
            debug!(evicted, "Evicted expired progress records");
        }
        evicted
    }

    /// Number of stored records, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
