//! Bounded polling of external asynchronous jobs.
//!
//! [`poll_job`] queries a job on an interval until it reports completion,
//! reports an error, or the attempt budget runs out. It never returns an
//! error: every ending is a [`PollOutcome`] variant, and retry or fallback
//! policy is left to the caller.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{ConfigError, ProviderError};

/// How the wait between polls grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = interval
    #[default]
    Constant,
    /// delay = interval * (attempt + 1)
    Linear,
    /// delay = interval * 2^attempt
    Exponential,
}

/// Randomization applied to each wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Exact delays.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Poll budget and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum status queries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base wait before each query, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter: JitterStrategy,
    /// Upper bound for a single wait, in milliseconds.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    30_000
}

fn default_max_interval_ms() -> u64 {
    120_000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            backoff: BackoffStrategy::Constant,
            jitter: JitterStrategy::None,
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

impl PollConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base interval.
    #[must_use]
    pub fn with_interval_ms(mut self, interval: u64) -> Self {
        self.interval_ms = interval;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Wait before the query numbered `attempt` (0-indexed), before jitter.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let interval = self.interval_ms;
        let delay = match self.backoff {
            BackoffStrategy::Constant => interval,
            BackoffStrategy::Linear => interval.saturating_mul(u64::from(attempt) + 1),
            BackoffStrategy::Exponential => {
                interval.saturating_mul(2u64.saturating_pow(attempt))
            }
        };
        Duration::from_millis(delay.min(self.max_interval_ms))
    }

    /// Wait before the query numbered `attempt`, with jitter applied.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = u64::try_from(self.base_delay(attempt).as_millis()).unwrap_or(u64::MAX);
        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };
        Duration::from_millis(jittered)
    }

    /// Worst-case wall-clock time spent waiting, ignoring query latency.
    #[must_use]
    pub fn budget(&self) -> Duration {
        (0..self.max_attempts).map(|a| self.base_delay(a)).sum()
    }

    /// Checks the config for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("poll.max_attempts", "must be at least 1"));
        }
        if self.max_interval_ms < self.interval_ms {
            return Err(ConfigError::invalid(
                "poll.max_interval_ms",
                "must not be smaller than interval_ms",
            ));
        }
        Ok(())
    }
}

/// Opaque handle of a submitted external job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl JobHandle {
    /// Creates a handle.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by one query of an external job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
    /// Still running; optional provider-reported progress in percent.
    Pending {
        /// Progress in percent, if known.
        progress: Option<u8>,
    },
    /// Finished with a payload.
    Complete(T),
    /// Finished with an error.
    Error(String),
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The job completed.
    Complete {
        /// Job payload.
        payload: T,
        /// Queries made.
        attempts: u32,
    },
    /// The job reported an error.
    Failed {
        /// Job error message.
        message: String,
        /// Queries made.
        attempts: u32,
    },
    /// The attempt budget ran out first.
    TimedOut {
        /// Queries made.
        attempts: u32,
        /// Wall-clock time spent.
        elapsed: Duration,
    },
}

impl<T> PollOutcome<T> {
    /// Number of status queries made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Complete { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// Returns true if the poll timed out.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Polls `handle` with `query` until completion, error, or budget exhaustion.
///
/// Each attempt waits first and then queries, so a job that never finishes
/// takes roughly `max_attempts * interval`. A failed query (transport or
/// decode error) uses up an attempt and is logged.
pub async fn poll_job<T, F, Fut>(config: &PollConfig, handle: &JobHandle, mut query: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus<T>, ProviderError>>,
{
    let started = Instant::now();
    let max_attempts = config.max_attempts.max(1);

    for attempt in 0..max_attempts {
        tokio::time::sleep(config.delay_for(attempt)).await;
        let attempts = attempt + 1;

        match query().await {
            Ok(JobStatus::Complete(payload)) => {
                info!(job = %handle, attempts, "Job completed");
                return PollOutcome::Complete { payload, attempts };
            }
            Ok(JobStatus::Error(message)) => {
                warn!(job = %handle, attempts, error = %message, "Job reported an error");
                return PollOutcome::Failed { message, attempts };
            }
            Ok(JobStatus::Pending { progress }) => {
                debug!(job = %handle, attempts, progress = ?progress, "Job still pending");
            }
            Err(e) => {
                warn!(job = %handle, attempts, error = %e, "Job status query failed");
            }
        }
    }

    let elapsed = started.elapsed();
    warn!(
        job = %handle,
        attempts = max_attempts,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "Job polling timed out"
    );
    PollOutcome::TimedOut {
        attempts: max_attempts,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_poll_config_default() {
        let config = PollConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.interval_ms, 30_000);
        assert_eq!(config.budget(), Duration::from_secs(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_delay_strategies() {
        let constant = PollConfig::new().with_interval_ms(100);
        assert_eq!(constant.base_delay(5), Duration::from_millis(100));

        let linear = PollConfig::new()
            .with_interval_ms(100)
            .with_backoff(BackoffStrategy::Linear);
        assert_eq!(linear.base_delay(2), Duration::from_millis(300));

        let exponential = PollConfig::new()
            .with_interval_ms(100)
            .with_backoff(BackoffStrategy::Exponential);
        assert_eq!(exponential.base_delay(3), Duration::from_millis(800));
        assert_eq!(exponential.base_delay(40), Duration::from_millis(120_000));
    }

    #[test]
    fn test_full_jitter_stays_below_delay() {
        let config = PollConfig::new()
            .with_interval_ms(100)
            .with_jitter(JitterStrategy::Full);
        for attempt in 0..10 {
            assert!(config.delay_for(attempt) <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = PollConfig::new().with_max_attempts(0);
        assert!(config.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_after_budget() {
        let config = PollConfig::new().with_max_attempts(3).with_interval_ms(30_000);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome: PollOutcome<Vec<u32>> = poll_job(&config, &JobHandle::new("job-1"), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(JobStatus::Pending { progress: Some(10) })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match outcome {
            PollOutcome::TimedOut { attempts, elapsed } => {
                assert_eq!(attempts, 3);
                assert!(elapsed >= Duration::from_secs(90));
                assert!(elapsed < Duration::from_secs(91));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_on_completion() {
        let config = PollConfig::new().with_max_attempts(5).with_interval_ms(1_000);
        let mut calls = 0;

        let outcome = poll_job(&config, &JobHandle::new("job-2"), || {
            calls += 1;
            let status = if calls == 2 {
                JobStatus::Complete("done")
            } else {
                JobStatus::Pending { progress: None }
            };
            async move { Ok(status) }
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Complete {
                payload: "done",
                attempts: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_job_error_without_retry() {
        let config = PollConfig::new().with_max_attempts(5).with_interval_ms(10);
        let mut calls = 0;

        let outcome: PollOutcome<()> = poll_job(&config, &JobHandle::new("job-3"), || {
            calls += 1;
            async { Ok(JobStatus::Error("quota exceeded".to_string())) }
        })
        .await;

        assert_eq!(calls, 1);
        assert_eq!(outcome.attempts(), 1);
        assert!(matches!(outcome, PollOutcome::Failed { ref message, .. } if message == "quota exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_errors_consume_attempts() {
        let config = PollConfig::new().with_max_attempts(3).with_interval_ms(10);
        let mut calls = 0;

        let outcome = poll_job(&config, &JobHandle::new("job-4"), || {
            calls += 1;
            let result = if calls < 3 {
                Err(ProviderError::Transport("reset".to_string()))
            } else {
                Ok(JobStatus::Complete(7))
            };
            async move { result }
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Complete {
                payload: 7,
                attempts: 3
            }
        );
    }
}
