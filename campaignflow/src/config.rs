//! Top-level configuration.
//!
//! Every section has serde defaults, so a config file only needs the values
//! it overrides:
//!
//! ```json
//! {
//!   "pipeline": { "target_leads": 20, "trace_capture": true },
//!   "poll": { "max_attempts": 5, "interval_ms": 10000 },
//!   "source": { "kind": "async_job" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::enrichment::EnrichmentConfig;
use crate::errors::ConfigError;
use crate::generation::GenerationConfig;
use crate::pipeline::PipelineConfig;
use crate::poller::PollConfig;
use crate::progress::ProgressConfig;
use crate::source::SourceConfig;

/// Configuration for a campaign pipeline and its collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Sequencer settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Search job polling.
    #[serde(default)]
    pub poll: PollConfig,
    /// Enrichment loop limits.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    /// Content fan-out.
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Progress store retention.
    #[serde(default)]
    pub progress: ProgressConfig,
    /// Candidate source selection.
    #[serde(default)]
    pub source: SourceConfig,
}

impl CampaignConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the pipeline section.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Sets the poll section.
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the enrichment section.
    #[must_use]
    pub fn with_enrichment(mut self, enrichment: EnrichmentConfig) -> Self {
        self.enrichment = enrichment;
        self
    }

    /// Sets the generation section.
    #[must_use]
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Sets the progress section.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the source section.
    #[must_use]
    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.poll.validate()?;
        self.enrichment.validate()?;
        self.generation.validate()?;
        self.progress.validate()?;
        self.source.validate()?;
        if self.enrichment.provider_max_page_size > self.source.max_page_size {
            return Err(ConfigError::invalid(
                "enrichment.provider_max_page_size",
                "must not exceed source.max_page_size",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CampaignConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.target_leads, 10);
        assert_eq!(config.poll.max_attempts, 3);
        assert_eq!(config.enrichment.max_pages, 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CampaignConfig::from_json_str(
            r#"{"pipeline": {"trace_capture": true}, "source": {"kind": "async_job"}}"#,
        )
        .unwrap();

        assert!(config.pipeline.trace_capture);
        assert_eq!(config.pipeline.persona_count, 5);
        assert_eq!(config.source.kind, SourceKind::AsyncJob);
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"poll": {{"max_attempts": 5, "interval_ms": 1000}}}}"#).unwrap();

        let config = CampaignConfig::from_json_file(file.path()).unwrap();

        assert_eq!(config.poll.max_attempts, 5);
        assert_eq!(config.poll.interval_ms, 1000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CampaignConfig::from_json_file("/nonexistent/campaignflow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = CampaignConfig::from_json_str(r#"{"enrichment": {"max_pages": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = CampaignConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_builders() {
        let config = CampaignConfig::new()
            .with_poll(PollConfig::new().with_max_attempts(7))
            .with_generation(GenerationConfig::default().with_max_leads(3));
        assert_eq!(config.poll.max_attempts, 7);
        assert_eq!(config.generation.max_leads, 3);
    }
}
