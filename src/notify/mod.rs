//! Outcome notification.
//!
//! Sinks are best-effort: a delivery error is reported to the caller,
//! which logs it and carries on. It never changes a job's outcome.

mod discord;

use std::sync::Mutex;

use async_trait::async_trait;
use log::{info, warn};

pub use discord::{DiscordWebhookSink, embed_payload};

use crate::domain::{JobOutcome, format_slots};

/// Errors delivering a notification
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Somewhere a JobOutcome can be delivered
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, outcome: &JobOutcome) -> Result<(), NotifyError>;
}

/// Writes outcomes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, outcome: &JobOutcome) -> Result<(), NotifyError> {
        match outcome {
            JobOutcome::Success {
                job,
                attempt,
                confirmation,
                slots,
            } => info!(
                "Job '{}' booked {} on attempt {} (order {})",
                job,
                format_slots(slots),
                attempt + 1,
                confirmation
            ),
            JobOutcome::AllFailed { job, failures } => {
                warn!("Job '{}' failed after {} attempt(s)", job, failures.len());
                for failure in failures {
                    warn!("  {}", failure);
                }
            }
        }
        Ok(())
    }
}

/// Keeps every outcome it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<JobOutcome>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<JobOutcome> {
        self.outcomes.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, outcome: &JobOutcome) -> Result<(), NotifyError> {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome.clone());
        }
        Ok(())
    }
}
