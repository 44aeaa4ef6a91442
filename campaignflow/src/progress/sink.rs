//! Progress sink trait and implementations.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};

use super::record::ProgressEvent;
use super::store::ProgressStore;

/// Receives progress events from the pipeline.
///
/// The pipeline only writes events; what happens to them (store update,
/// channel forwarding, logging) is up to the sink.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Emits an event, waiting if the sink applies backpressure.
    async fn emit(&self, event: ProgressEvent);

    /// Emits an event without waiting. Never fails; drops are logged.
    fn try_emit(&self, event: ProgressEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn emit(&self, _event: ProgressEvent) {}

    fn try_emit(&self, _event: ProgressEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a sink logging at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &ProgressEvent) {
        let record = &event.record;
        if self.level == Level::DEBUG {
            debug!(
                event_type = event.kind.event_type(),
                run_id = %record.run_id,
                subject_key = %record.subject_key,
                percentage = record.percentage,
                stage = ?record.stage,
                "{}", record.message
            );
        } else {
            info!(
                event_type = event.kind.event_type(),
                run_id = %record.run_id,
                subject_key = %record.subject_key,
                percentage = record.percentage,
                stage = ?record.stage,
                "{}", record.message
            );
        }
    }
}

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        self.log_event(&event);
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: parking_lot::RwLock<Vec<ProgressEvent>>,
}

impl CollectingProgressSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Percentages in emission order.
    #[must_use]
    pub fn percentages(&self) -> Vec<u8> {
        self.events.read().iter().map(|e| e.record.percentage).collect()
    }

    /// The most recent event.
    #[must_use]
    pub fn last(&self) -> Option<ProgressEvent> {
        self.events.read().last().cloned()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }
}

/// Applies events directly to a [`ProgressStore`].
#[derive(Debug, Clone)]
pub struct StoreProgressSink {
    store: Arc<ProgressStore>,
}

impl StoreProgressSink {
    /// Creates a sink writing to `store`.
    #[must_use]
    pub fn new(store: Arc<ProgressStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProgressSink for StoreProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        self.try_emit(event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        let key = event.record.subject_key.clone();
        self.store.update(&key, event.record);
    }
}

/// Forwards events over a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelProgressSink {
    /// Creates a sink sending on `tx`.
    #[must_use]
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).await.is_err() {
            warn!("Progress channel closed, dropping event");
        }
    }

    fn try_emit(&self, event: ProgressEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!(error = %e, "Failed to forward progress event");
        }
    }
}

/// Sends every event to several sinks, in order.
#[derive(Clone, Default)]
pub struct FanoutProgressSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for FanoutProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutProgressSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutProgressSink {
    /// Creates a fan-out over `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn ProgressSink>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl ProgressSink for FanoutProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }

    fn try_emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.try_emit(event.clone());
        }
    }
}
