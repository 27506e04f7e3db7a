//! Booking job sections of the config file and their validation

use serde::{Deserialize, Serialize};

use crate::domain::{AttemptSpec, BookingJob, Credentials, TimeWindow};
use crate::error::{Result, SlotbookError};

/// One entry under `bookings:`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    /// Cron-style expression, carried for display only
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub days_ahead: u32,
    #[serde(default)]
    pub discord_webhook_url: Option<String>,
    #[serde(default)]
    pub attempts: Vec<AttemptConfig>,
}

/// One entry under a job's `attempts:`
#[derive(Clone, Serialize, Deserialize)]
pub struct AttemptConfig {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub venue: String,
    pub activity: String,
    #[serde(default)]
    pub min_slot_time: Option<String>,
    #[serde(default)]
    pub max_slot_time: Option<String>,
    #[serde(default = "default_n_slots")]
    pub n_slots: usize,
}

fn default_n_slots() -> usize {
    1
}

impl std::fmt::Debug for AttemptConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("venue", &self.venue)
            .field("activity", &self.activity)
            .field("min_slot_time", &self.min_slot_time)
            .field("max_slot_time", &self.max_slot_time)
            .field("n_slots", &self.n_slots)
            .finish()
    }
}

/// Strip the variant prefix so config errors read as one sentence
fn reason(err: SlotbookError) -> String {
    match err {
        SlotbookError::Validation(msg) | SlotbookError::Config(msg) => msg,
        other => other.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl AttemptConfig {
    pub fn to_spec(&self) -> Result<AttemptSpec> {
        if self.username.trim().is_empty() {
            return Err(SlotbookError::Validation("username must not be empty".to_string()));
        }
        let window = TimeWindow::parse(
            non_empty(self.min_slot_time.as_deref()),
            non_empty(self.max_slot_time.as_deref()),
        )?;
        AttemptSpec::new(
            Credentials::new(self.username.trim(), self.password.clone()),
            self.venue.trim(),
            self.activity.trim(),
            window,
            self.n_slots,
        )
    }
}

impl JobConfig {
    /// Validate into a BookingJob; errors name the job and attempt number
    pub fn to_job(&self) -> Result<BookingJob> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SlotbookError::Config("booking job with an empty name".to_string()));
        }
        if self.attempts.is_empty() {
            return Err(SlotbookError::Config(format!("job '{}' has no attempts", name)));
        }

        let attempts = self
            .attempts
            .iter()
            .enumerate()
            .map(|(i, attempt)| {
                attempt
                    .to_spec()
                    .map_err(|e| SlotbookError::Config(format!("job '{}' attempt {}: {}", name, i + 1, reason(e))))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut job = BookingJob::new(name, self.days_ahead, attempts)
            .map_err(|e| SlotbookError::Config(format!("job '{}': {}", name, reason(e))))?;
        if let Some(schedule) = non_empty(self.schedule.as_deref()) {
            job = job.with_schedule(schedule);
        }
        if let Some(url) = non_empty(self.discord_webhook_url.as_deref()) {
            job = job.with_discord_webhook(url);
        }
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> AttemptConfig {
        AttemptConfig {
            username: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
            venue: "leisure-centre".to_string(),
            activity: "badminton-40min".to_string(),
            min_slot_time: Some("18:00".to_string()),
            max_slot_time: Some("20:00".to_string()),
            n_slots: 2,
        }
    }

    fn job(attempts: Vec<AttemptConfig>) -> JobConfig {
        JobConfig {
            name: "tuesday".to_string(),
            schedule: Some("0 22 * * 2".to_string()),
            days_ahead: 7,
            discord_webhook_url: Some(String::new()),
            attempts,
        }
    }

    #[test]
    fn test_to_job() {
        let job = job(vec![attempt()]).to_job().unwrap();
        assert_eq!(job.name(), "tuesday");
        assert_eq!(job.schedule(), Some("0 22 * * 2"));
        assert_eq!(job.days_ahead(), 7);
        assert_eq!(job.discord_webhook_url(), None);
        assert_eq!(job.attempts()[0].n_slots(), 2);
        assert_eq!(job.attempts()[0].window().to_string(), "18:00-20:00");
    }

    #[test]
    fn test_missing_bounds_are_unbounded() {
        let mut a = attempt();
        a.min_slot_time = None;
        a.max_slot_time = Some("".to_string());
        let job = job(vec![a]).to_job().unwrap();
        assert!(job.attempts()[0].window().is_unbounded());
    }

    #[test]
    fn test_errors_name_job_and_attempt() {
        let mut bad = attempt();
        bad.min_slot_time = Some("21:00".to_string());

        let err = job(vec![attempt(), bad]).to_job().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("job 'tuesday' attempt 2"), "{}", message);
        assert!(message.contains("after max_slot_time"), "{}", message);
    }

    #[test]
    fn test_zero_slots_rejected() {
        let mut bad = attempt();
        bad.n_slots = 0;
        let err = job(vec![bad]).to_job().unwrap_err();
        assert!(err.to_string().contains("n_slots must be at least 1"));
    }

    #[test]
    fn test_no_attempts_rejected() {
        let err = job(vec![]).to_job().unwrap_err();
        assert!(err.to_string().contains("has no attempts"));
    }

    #[test]
    fn test_debug_redacts_password() {
        assert!(!format!("{:?}", attempt()).contains("hunter2"));
    }

    #[test]
    fn test_serialized_attempt_omits_password() {
        let yaml = serde_yaml::to_string(&attempt()).unwrap();
        assert!(!yaml.contains("hunter2"), "{}", yaml);
        assert!(!yaml.contains("password"), "{}", yaml);
        assert!(yaml.contains("username"));
    }
}
