//! Shared handler state.

use std::sync::Arc;

use campaignflow::pipeline::CampaignPipeline;
use campaignflow::progress::{ProgressSink, ProgressTracker};

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The campaign pipeline.
    pub pipeline: Arc<CampaignPipeline>,
    /// Progress store that `/progress` reads.
    pub tracker: ProgressTracker,
    /// Sink runs publish to. Feeds `tracker`.
    pub sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state whose runs publish synchronously into `tracker`.
    pub fn new(pipeline: CampaignPipeline, tracker: ProgressTracker) -> Self {
        let sink = tracker.sink();
        Self {
            pipeline: Arc::new(pipeline),
            tracker,
            sink,
        }
    }

    /// Replaces the sink, e.g. to fan out to a logging sink as well.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }
}
