//! Booking preferences: credentials, attempts and jobs
//!
//! These are built once from validated configuration and are read-only after
//! that. A BookingJob is reused for every invocation of the job.

use std::fmt;
use std::num::NonZeroUsize;

use super::window::TimeWindow;
use crate::error::{Result, SlotbookError};

/// Venue account credentials
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The raw password, only for sending to the venue API
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"**********")
            .finish()
    }
}

/// One fully-specified booking preference
#[derive(Debug, Clone)]
pub struct AttemptSpec {
    credentials: Credentials,
    venue: String,
    activity: String,
    window: TimeWindow,
    n_slots: NonZeroUsize,
}

impl AttemptSpec {
    pub fn new(
        credentials: Credentials,
        venue: impl Into<String>,
        activity: impl Into<String>,
        window: TimeWindow,
        n_slots: usize,
    ) -> Result<Self> {
        let venue = venue.into();
        let activity = activity.into();

        if venue.trim().is_empty() {
            return Err(SlotbookError::Validation("venue must not be empty".to_string()));
        }
        if activity.trim().is_empty() {
            return Err(SlotbookError::Validation("activity must not be empty".to_string()));
        }
        let n_slots = NonZeroUsize::new(n_slots)
            .ok_or_else(|| SlotbookError::Validation("n_slots must be at least 1".to_string()))?;

        Ok(Self {
            credentials,
            venue,
            activity,
            window,
            n_slots,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn n_slots(&self) -> usize {
        self.n_slots.get()
    }
}

impl fmt::Display for AttemptSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "venue={}, activity={}, time={}, n_slots={}",
            self.venue, self.activity, self.window, self.n_slots
        )
    }
}

/// A named unit of work: an ordered list of attempts and a days-ahead offset
#[derive(Debug, Clone)]
pub struct BookingJob {
    name: String,
    schedule: Option<String>,
    days_ahead: u32,
    attempts: Vec<AttemptSpec>,
    discord_webhook_url: Option<String>,
}

impl BookingJob {
    pub fn new(name: impl Into<String>, days_ahead: u32, attempts: Vec<AttemptSpec>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SlotbookError::Validation("job name must not be empty".to_string()));
        }
        if attempts.is_empty() {
            return Err(SlotbookError::Validation(format!("job '{}' has no attempts", name)));
        }

        Ok(Self {
            name,
            schedule: None,
            days_ahead,
            attempts,
            discord_webhook_url: None,
        })
    }

    /// Attach the (uninterpreted) schedule expression from config
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// Attach a Discord webhook to notify with the outcome
    pub fn with_discord_webhook(mut self, url: impl Into<String>) -> Self {
        self.discord_webhook_url = Some(url.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    pub fn days_ahead(&self) -> u32 {
        self.days_ahead
    }

    pub fn attempts(&self) -> &[AttemptSpec] {
        &self.attempts
    }

    pub fn discord_webhook_url(&self) -> Option<&str> {
        self.discord_webhook_url.as_deref()
    }
}
