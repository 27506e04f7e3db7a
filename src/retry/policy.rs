//! Bounded retry with exponential backoff for single venue API calls.
//!
//! Only failures that report themselves as retryable (network, rate limit,
//! server errors) are retried. Anything else is returned after one call.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::sleeper::{Sleeper, TokioSleeper};

/// Failure classification used by the retry loop
pub trait Retryable {
    /// True for transient failures worth another call
    fn is_retryable(&self) -> bool;

    /// Server-suggested minimum wait before the next call
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError<E> {
    /// Non-retryable failure, returned after a single call
    #[error("{0}")]
    Terminal(E),

    /// Retryable failure that persisted for every allowed call
    #[error("{last} (gave up after {attempts} attempts)")]
    Exhausted { attempts: u32, last: E },

    /// Cancellation was signalled before or between calls
    #[error("cancelled")]
    Cancelled,
}

/// Retry configuration (the `retry` section of the config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total calls allowed, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Multiplier applied per further retry
    pub factor: f64,
    /// Upper bound on a computed delay
    pub max_delay_ms: u64,
    /// Random spread applied to each delay, as a fraction (0.1 = ±10%)
    pub jitter_pct: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            factor: 2.0,
            max_delay_ms: 10_000,
            jitter_pct: 0.0,
        }
    }
}

/// Exponential backoff retry policy
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    factor: f64,
    max_delay: Duration,
    jitter_pct: f64,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        let base_delay = Duration::from_millis(config.base_delay_ms);
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay,
            factor: if config.factor.is_finite() { config.factor.max(1.0) } else { 1.0 },
            max_delay: Duration::from_millis(config.max_delay_ms).max(base_delay),
            jitter_pct: if config.jitter_pct.is_finite() { config.jitter_pct.clamp(0.0, 1.0) } else { 0.0 },
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper (tests use a RecordingSleeper)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The same policy limited to a single call
    pub fn single_shot(&self) -> Self {
        Self {
            max_attempts: 1,
            ..self.clone()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before retry number `retry` (1-based): base * factor^(retry-1), capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = self.factor.powi(retry.saturating_sub(1).min(i32::MAX as u32) as i32);
        let secs = self.base_delay.as_secs_f64() * exp;
        let max = self.max_delay.as_secs_f64();
        Duration::from_secs_f64(if secs.is_finite() { secs.min(max) } else { max })
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_pct == 0.0 || delay.is_zero() {
            return delay;
        }
        let spread = rand::rng().random_range(-self.jitter_pct..=self.jitter_pct);
        delay.mul_f64(1.0 + spread)
    }

    /// Run `op` until it succeeds, fails terminally, exhausts the bound or is cancelled.
    pub async fn run<T, E, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(RetryError::Terminal(err));
            }
            if attempt >= self.max_attempts {
                return Err(RetryError::Exhausted { attempts: attempt, last: err });
            }

            let mut delay = self.jittered(self.backoff(attempt));
            if let Some(hint) = err.retry_after() {
                delay = delay.max(hint);
            }

            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retryable failure, backing off"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = self.sleeper.sleep(delay) => {}
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("factor", &self.factor)
            .field("max_delay", &self.max_delay)
            .field("jitter_pct", &self.jitter_pct)
            .finish()
    }
}
