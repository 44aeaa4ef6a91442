//! Best-effort per-lead content generation.
//!
//! One task per lead under a single [`JoinSet`]. Tasks are bounded by a
//! semaphore and a per-lead timeout, and a failure (error, timeout or panic)
//! only removes that lead from the result.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::core::{CampaignContext, EnrichedLead, OutreachContent, PersonalizedOutreach};
use crate::errors::ConfigError;
use crate::providers::ContentWriter;

/// Fan-out limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Most leads content is generated for.
    #[serde(default = "default_max_leads")]
    pub max_leads: usize,
    /// Concurrent writer calls.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Timeout per lead, in milliseconds.
    #[serde(default = "default_per_lead_timeout_ms")]
    pub per_lead_timeout_ms: u64,
}

fn default_max_leads() -> usize {
    10
}

fn default_max_concurrency() -> usize {
    5
}

fn default_per_lead_timeout_ms() -> u64 {
    60_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_leads: default_max_leads(),
            max_concurrency: default_max_concurrency(),
            per_lead_timeout_ms: default_per_lead_timeout_ms(),
        }
    }
}

impl GenerationConfig {
    /// Sets the lead cap.
    #[must_use]
    pub fn with_max_leads(mut self, max_leads: usize) -> Self {
        self.max_leads = max_leads;
        self
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the per-lead timeout.
    #[must_use]
    pub fn with_per_lead_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.per_lead_timeout_ms = timeout_ms;
        self
    }

    /// Checks the config for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid("generation.max_concurrency", "must be at least 1"));
        }
        if self.per_lead_timeout_ms == 0 {
            return Err(ConfigError::invalid("generation.per_lead_timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

/// How one lead's generation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The writer returned an error.
    Error,
    /// The writer did not answer in time.
    TimedOut,
    /// The writer panicked.
    Panicked,
}

/// A lead excluded from the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFailure {
    /// Position of the lead in the input.
    pub index: usize,
    /// Lead name.
    pub lead_name: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Details.
    pub message: String,
}

/// Result of one fan-out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Successful outreach, in input order.
    pub contents: Vec<PersonalizedOutreach>,
    /// Excluded leads, in input order.
    pub failures: Vec<LeadFailure>,
    /// Leads content was attempted for.
    pub requested: usize,
    /// Leads beyond `max_leads` that were not attempted.
    pub skipped: usize,
}

impl GenerationReport {
    /// Returns true if every attempted lead succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type TaskOutcome = (usize, EnrichedLead, Result<OutreachContent, (FailureKind, String)>);

/// Generates outreach for each lead independently.
#[derive(Clone)]
pub struct ContentGenerator {
    writer: Arc<dyn ContentWriter>,
    config: GenerationConfig,
}

impl std::fmt::Debug for ContentGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContentGenerator {
    /// Creates a generator over `writer`.
    #[must_use]
    pub fn new(writer: Arc<dyn ContentWriter>, config: GenerationConfig) -> Self {
        Self { writer, config }
    }

    /// Generates content for up to `max_leads` of `leads`.
    ///
    /// Always returns once every spawned task has finished; output size is
    /// at most the number of attempted leads.
    pub async fn generate(&self, leads: &[EnrichedLead], context: &CampaignContext) -> GenerationReport {
        let attempted = leads.len().min(self.config.max_leads);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let per_lead = Duration::from_millis(self.config.per_lead_timeout_ms);
        let context = Arc::new(context.clone());
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

        for (index, lead) in leads.iter().take(attempted).cloned().enumerate() {
            let writer = self.writer.clone();
            let semaphore = semaphore.clone();
            let context = context.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, lead, Err((FailureKind::Error, "generation cancelled".to_string())));
                };
                let call = AssertUnwindSafe(writer.write(&lead, &context)).catch_unwind();
                let outcome = match tokio::time::timeout(per_lead, call).await {
                    Err(_) => Err((
                        FailureKind::TimedOut,
                        format!("no content after {}ms", per_lead.as_millis()),
                    )),
                    Ok(Err(panic)) => Err((FailureKind::Panicked, panic_message(panic.as_ref()))),
                    Ok(Ok(Err(e))) => Err((FailureKind::Error, e.to_string())),
                    Ok(Ok(Ok(content))) => Ok(content),
                };
                (index, lead, outcome)
            });
        }

        let mut contents: Vec<(usize, PersonalizedOutreach)> = Vec::with_capacity(attempted);
        let mut failures: Vec<LeadFailure> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, lead, Ok(content))) => {
                    debug!(lead = %lead.name(), index, "Generated outreach");
                    contents.push((index, PersonalizedOutreach { lead, content }));
                }
                Ok((index, lead, Err((kind, message)))) => {
                    warn!(lead = %lead.name(), index, kind = ?kind, error = %message, "Outreach generation failed");
                    failures.push(LeadFailure {
                        index,
                        lead_name: lead.name().to_string(),
                        kind,
                        message,
                    });
                }
                Err(e) => {
                    error!(error = %e, "Generation task did not finish");
                }
            }
        }

        contents.sort_by_key(|(index, _)| *index);
        failures.sort_by_key(|f| f.index);

        GenerationReport {
            contents: contents.into_iter().map(|(_, c)| c).collect(),
            failures,
            requested: attempted,
            skipped: leads.len() - attempted,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("writer panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("writer panicked: {s}")
    } else {
        "writer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{campaign_context, enriched_leads};
    use crate::testing::mocks::FakeWriter;

    #[test]
    fn test_config_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_leads, 10);
        assert_eq!(config.max_concurrency, 5);
        assert!(config.validate().is_ok());
        assert!(config.with_max_concurrency(0).validate().is_err());
    }

    #[tokio::test]
    async fn test_all_succeed_in_input_order() {
        let writer = Arc::new(FakeWriter::new());
        let generator = ContentGenerator::new(writer, GenerationConfig::default());
        let leads = enriched_leads(4);

        let report = generator.generate(&leads, &campaign_context()).await;

        assert!(report.is_complete());
        assert_eq!(report.requested, 4);
        let names: Vec<&str> = report.contents.iter().map(|c| c.lead.name()).collect();
        let expected: Vec<&str> = leads.iter().map(EnrichedLead::name).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_one_failure_reduces_count_by_one() {
        let leads = enriched_leads(5);
        let writer = Arc::new(FakeWriter::new().failing_for(leads[2].name()));
        let generator = ContentGenerator::new(writer, GenerationConfig::default());

        let report = generator.generate(&leads, &campaign_context()).await;

        assert_eq!(report.contents.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
        assert_eq!(report.failures[0].kind, FailureKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_straggler_times_out() {
        let leads = enriched_leads(3);
        let writer = Arc::new(FakeWriter::new().slow_for(leads[0].name(), Duration::from_secs(600)));
        let config = GenerationConfig::default().with_per_lead_timeout_ms(1_000);
        let generator = ContentGenerator::new(writer, config);

        let report = generator.generate(&leads, &campaign_context()).await;

        assert_eq!(report.contents.len(), 2);
        assert_eq!(report.failures[0].kind, FailureKind::TimedOut);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let leads = enriched_leads(3);
        let writer = Arc::new(FakeWriter::new().panicking_for(leads[1].name()));
        let generator = ContentGenerator::new(writer, GenerationConfig::default());

        let report = generator.generate(&leads, &campaign_context()).await;

        assert_eq!(report.contents.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Panicked);
    }

    #[tokio::test]
    async fn test_respects_max_leads() {
        let writer = Arc::new(FakeWriter::new());
        let generator = ContentGenerator::new(writer.clone(), GenerationConfig::default().with_max_leads(3));

        let report = generator.generate(&enriched_leads(5), &campaign_context()).await;

        assert_eq!(report.contents.len(), 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(writer.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_respects_concurrency_limit() {
        let writer = Arc::new(FakeWriter::new().with_delay(Duration::from_millis(50)));
        let config = GenerationConfig::default().with_max_concurrency(2);
        let generator = ContentGenerator::new(writer.clone(), config);

        let report = generator.generate(&enriched_leads(6), &campaign_context()).await;

        assert_eq!(report.contents.len(), 6);
        assert!(writer.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let generator = ContentGenerator::new(Arc::new(FakeWriter::new()), GenerationConfig::default());
        let report = generator.generate(&[], &campaign_context()).await;
        assert!(report.contents.is_empty());
        assert_eq!(report.requested, 0);
    }
}
