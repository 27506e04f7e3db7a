//! Ordered fallback across a job's attempts.
//!
//! Attempts run strictly in configured order with a fresh client each.
//! The first success ends the job; otherwise every failure is kept.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use log::{info, warn};

use super::executor::AttemptExecutor;
use crate::client::ClientFactory;
use crate::domain::{AttemptFailure, AttemptOutcome, BookingJob, FailureKind, JobOutcome};

/// The date a job books for: `days_ahead` days after `today`
pub fn target_date(today: NaiveDate, days_ahead: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(days_ahead)))
        .unwrap_or(NaiveDate::MAX)
}

pub struct AttemptOrchestrator {
    factory: Arc<dyn ClientFactory>,
    executor: AttemptExecutor,
}

impl AttemptOrchestrator {
    pub fn new(factory: Arc<dyn ClientFactory>, executor: AttemptExecutor) -> Self {
        Self { factory, executor }
    }

    /// Run `job` as of `today`, producing exactly one outcome
    pub async fn run(&self, job: &BookingJob, today: NaiveDate) -> JobOutcome {
        let date = target_date(today, job.days_ahead());
        info!(
            "Job '{}': booking for {} with {} attempt(s)",
            job.name(),
            date,
            job.attempts().len()
        );

        let mut failures = Vec::new();
        for (index, spec) in job.attempts().iter().enumerate() {
            let outcome = match self.factory.create(spec.credentials()) {
                Ok(client) => self.executor.execute(client.as_ref(), spec, date, index).await,
                Err(e) => AttemptOutcome::failure(index, FailureKind::AuthFailed, e.to_string()),
            };

            match outcome {
                AttemptOutcome::Success {
                    index,
                    confirmation,
                    slots,
                } => {
                    info!("Job '{}': attempt {} succeeded", job.name(), index + 1);
                    return JobOutcome::Success {
                        job: job.name().to_string(),
                        attempt: index,
                        confirmation,
                        slots,
                    };
                }
                AttemptOutcome::Failure(failure) => {
                    warn!("Job '{}': {}", job.name(), failure);
                    let cancelled = failure.kind == FailureKind::Cancelled;
                    failures.push(failure);
                    if cancelled {
                        break;
                    }
                }
            }
        }

        JobOutcome::AllFailed {
            job: job.name().to_string(),
            failures,
        }
    }
}

/// One-line summary of attempt failures, in attempt order
pub fn failures_summary(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
