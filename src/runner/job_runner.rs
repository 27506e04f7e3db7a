//! Runs configured jobs concurrently and delivers their outcomes.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use log::{error, warn};
use tokio_util::sync::CancellationToken;

use super::executor::AttemptExecutor;
use super::orchestrator::AttemptOrchestrator;
use crate::client::ClientFactory;
use crate::domain::{AttemptFailure, BookingJob, FailureKind, JobOutcome};
use crate::notify::{DiscordWebhookSink, NotificationSink};
use crate::retry::RetryPolicy;

/// Runs jobs, one tokio task each, sharing nothing mutable between them
#[derive(Clone)]
pub struct JobRunner {
    factory: Arc<dyn ClientFactory>,
    policy: RetryPolicy,
    sinks: Vec<Arc<dyn NotificationSink>>,
    job_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl JobRunner {
    pub fn new(factory: Arc<dyn ClientFactory>, policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            factory,
            policy,
            sinks: Vec::new(),
            job_timeout: None,
            cancel,
        }
    }

    /// Deliver every outcome to `sink` as well
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Cancel a job that runs longer than `timeout`
    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Run one job to its outcome and notify the sinks
    pub async fn run_job(&self, job: &BookingJob, today: NaiveDate) -> JobOutcome {
        let cancel = self.cancel.child_token();
        let executor = AttemptExecutor::new(self.policy.clone(), cancel.clone());
        let orchestrator = AttemptOrchestrator::new(Arc::clone(&self.factory), executor);

        let run = orchestrator.run(job, today);
        tokio::pin!(run);

        let outcome = match self.job_timeout {
            Some(limit) => {
                tokio::select! {
                    outcome = &mut run => outcome,
                    _ = tokio::time::sleep(limit) => {
                        warn!("Job '{}' exceeded {:?}, cancelling", job.name(), limit);
                        cancel.cancel();
                        mark_timed_out(run.await, limit)
                    }
                }
            }
            None => run.await,
        };

        self.notify(job, &outcome).await;
        outcome
    }

    /// Run every job concurrently; outcomes come back in input order
    pub async fn run_all(&self, jobs: &[BookingJob], today: NaiveDate) -> Vec<JobOutcome> {
        let handles: Vec<_> = jobs
            .iter()
            .cloned()
            .map(|job| {
                let runner = self.clone();
                tokio::spawn(async move { runner.run_job(&job, today).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(jobs)
            .map(|(result, job)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Job '{}' task failed: {}", job.name(), e);
                    JobOutcome::AllFailed {
                        job: job.name().to_string(),
                        failures: Vec::new(),
                    }
                }
            })
            .collect()
    }

    async fn notify(&self, job: &BookingJob, outcome: &JobOutcome) {
        let mut sinks = self.sinks.clone();
        if let Some(url) = job.discord_webhook_url() {
            match DiscordWebhookSink::new(url) {
                Ok(sink) => sinks.push(Arc::new(sink)),
                Err(e) => warn!("Job '{}': cannot create Discord sink: {}", job.name(), e),
            }
        }

        for sink in sinks {
            if let Err(e) = sink.notify(outcome).await {
                warn!("Job '{}': {} notification failed: {}", job.name(), sink.name(), e);
            }
        }
    }
}

/// Make sure a timed-out job's report ends with a `Cancelled` entry.
/// A booking that completed anyway stays a success.
fn mark_timed_out(outcome: JobOutcome, limit: Duration) -> JobOutcome {
    match outcome {
        JobOutcome::AllFailed { job, mut failures } => {
            if failures.last().is_none_or(|f| f.kind != FailureKind::Cancelled) {
                let index = failures.last().map_or(0, |f| f.index);
                failures.push(AttemptFailure::new(
                    index,
                    FailureKind::Cancelled,
                    format!("job exceeded {:?}", limit),
                ));
            }
            JobOutcome::AllFailed { job, failures }
        }
        success => success,
    }
}
