//! Progress tracking for in-flight runs.
//!
//! The pipeline writes [`ProgressEvent`]s to a [`ProgressSink`]. The
//! [`ProgressTracker`] owns the keyed [`ProgressStore`] that pollers read,
//! and can consume events either synchronously ([`StoreProgressSink`]) or
//! from a channel ([`ChannelProgressSink`] + [`ProgressTracker::listen`]).

mod record;
mod sink;
mod store;

pub use record::{ProgressEvent, ProgressEventKind, ProgressRecord};
pub use sink::{
    ChannelProgressSink, CollectingProgressSink, FanoutProgressSink, LoggingProgressSink,
    NoOpProgressSink, ProgressSink, StoreProgressSink,
};
pub use store::ProgressStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::ConfigError;

/// Store retention and channel sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// How long a record stays readable after its last update, in seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// How often the eviction task runs, in seconds.
    #[serde(default = "default_eviction_interval_seconds")]
    pub eviction_interval_seconds: u64,
    /// Capacity of the event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_eviction_interval_seconds() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            eviction_interval_seconds: default_eviction_interval_seconds(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl ProgressConfig {
    /// Checks the config for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_seconds == 0 {
            return Err(ConfigError::invalid("progress.ttl_seconds", "must be positive"));
        }
        if self.eviction_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "progress.eviction_interval_seconds",
                "must be positive",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid("progress.channel_capacity", "must be positive"));
        }
        Ok(())
    }
}

/// Owns the progress store and feeds it from sinks.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    store: Arc<ProgressStore>,
    config: ProgressConfig,
}

impl ProgressTracker {
    /// Creates a tracker with an empty store.
    #[must_use]
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            store: Arc::new(ProgressStore::new(Duration::from_secs(config.ttl_seconds))),
            config,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> Arc<ProgressStore> {
        self.store.clone()
    }

    /// Latest record for `subject_key`.
    #[must_use]
    pub fn read(&self, subject_key: &str) -> Option<ProgressRecord> {
        self.store.read(subject_key)
    }

    /// A sink applying events to the store synchronously.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn ProgressSink> {
        Arc::new(StoreProgressSink::new(self.store.clone()))
    }

    /// A channel sink plus the task draining it into the store.
    #[must_use]
    pub fn channel(&self) -> (ChannelProgressSink, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let tracker = self.clone();
        let handle = tokio::spawn(async move { tracker.listen(rx).await });
        (ChannelProgressSink::new(tx), handle)
    }

    /// Applies events from `rx` until every sender is dropped. Returns the
    /// number of events applied.
    pub async fn listen(&self, mut rx: mpsc::Receiver<ProgressEvent>) -> usize {
        let mut applied = 0;
        while let Some(event) = rx.recv().await {
            let key = event.record.subject_key.clone();
            self.store.update(&key, event.record);
            applied += 1;
        }
        debug!(applied, "Progress channel drained");
        applied
    }

    /// Spawns a task evicting expired records on an interval.
    #[must_use]
    pub fn spawn_eviction(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let period = Duration::from_secs(self.config.eviction_interval_seconds.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.evict_expired();
            }
        })
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}
