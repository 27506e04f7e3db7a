//! Discord webhook notifications

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use reqwest::Client;
use serde_json::{Value, json};

use super::{NotificationSink, NotifyError};
use crate::domain::{JobOutcome, format_slots};

const GREEN: u32 = 0x00FF00;
const RED: u32 = 0xFF0000;

/// Failures listed in full before the rest are summarised
const MAX_LISTED_FAILURES: usize = 5;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts one embed per job outcome to a Discord webhook
pub struct DiscordWebhookSink {
    client: Client,
    url: String,
}

impl DiscordWebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client, url: url.into() })
    }
}

impl std::fmt::Debug for DiscordWebhookSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // webhook URLs embed a secret token
        f.debug_struct("DiscordWebhookSink").field("url", &"<redacted>").finish()
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, outcome: &JobOutcome) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&embed_payload(outcome, Utc::now()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!("Discord notification sent for job '{}'", outcome.job());
        Ok(())
    }
}

/// Build the webhook body for an outcome
pub fn embed_payload(outcome: &JobOutcome, timestamp: DateTime<Utc>) -> Value {
    let (description, color) = match outcome {
        JobOutcome::Success {
            job,
            attempt,
            confirmation,
            slots,
        } => (
            format!(
                "**Booking Successful!** ✅\n\n**Job:** {}\n**Attempt:** {}\n**Slots:** {}\n**Order ID:** {}",
                job,
                attempt + 1,
                format_slots(slots),
                confirmation
            ),
            GREEN,
        ),
        JobOutcome::AllFailed { job, failures } => {
            let mut details: Vec<String> = failures
                .iter()
                .take(MAX_LISTED_FAILURES)
                .map(|f| format!("• {}", f))
                .collect();
            if failures.len() > MAX_LISTED_FAILURES {
                details.push(format!("... and {} more", failures.len() - MAX_LISTED_FAILURES));
            }
            (
                format!(
                    "**Booking Failed!** ❌\n\n**Job:** {}\n**Total Attempts:** {}\n\n**Errors:**\n{}",
                    job,
                    failures.len(),
                    details.join("\n")
                ),
                RED,
            )
        }
    };

    json!({
        "embeds": [{
            "description": description,
            "color": color,
            "timestamp": timestamp.to_rfc3339(),
        }]
    })
}
