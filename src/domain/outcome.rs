//! Booking outcome types.
//!
//! An attempt produces an AttemptOutcome; a job produces exactly one JobOutcome.
//! "No matching slots" is an ordinary failure kind here, not an error.

use std::fmt;

use super::slot::{Slot, format_slots};

/// Pipeline stage that talks to the venue API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Auth,
    List,
    Reserve,
    Checkout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Auth => "auth",
            Stage::List => "list",
            Stage::Reserve => "reserve",
            Stage::Checkout => "checkout",
        };
        f.write_str(name)
    }
}

/// Why an attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    AuthFailed,
    ListFailed,
    NoMatchingSlots,
    ReservationFailed,
    CheckoutFailed,
    /// A retryable failure persisted past the retry bound at this stage
    RetriesExhausted(Stage),
    /// The job was cancelled before the attempt could finish
    Cancelled,
}

impl FailureKind {
    /// Terminal failure kind for a non-retryable error at a stage
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Auth => FailureKind::AuthFailed,
            Stage::List => FailureKind::ListFailed,
            Stage::Reserve => FailureKind::ReservationFailed,
            Stage::Checkout => FailureKind::CheckoutFailed,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::AuthFailed => f.write_str("AuthFailed"),
            FailureKind::ListFailed => f.write_str("ListFailed"),
            FailureKind::NoMatchingSlots => f.write_str("NoMatchingSlots"),
            FailureKind::ReservationFailed => f.write_str("ReservationFailed"),
            FailureKind::CheckoutFailed => f.write_str("CheckoutFailed"),
            FailureKind::RetriesExhausted(stage) => write!(f, "RetriesExhausted({})", stage),
            FailureKind::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// A failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// Zero-based position of the attempt in its job
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(index: usize, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attempt {}: {} - {}", self.index + 1, self.kind, self.message)
    }
}

/// Outcome of one attempt's pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success {
        index: usize,
        confirmation: String,
        slots: Vec<Slot>,
    },
    Failure(AttemptFailure),
}

impl AttemptOutcome {
    pub fn failure(index: usize, kind: FailureKind, message: impl Into<String>) -> Self {
        AttemptOutcome::Failure(AttemptFailure::new(index, kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }

    pub fn index(&self) -> usize {
        match self {
            AttemptOutcome::Success { index, .. } => *index,
            AttemptOutcome::Failure(failure) => failure.index,
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success {
                index,
                confirmation,
                slots,
            } => write!(
                f,
                "Attempt {} booked {} (order {})",
                index + 1,
                format_slots(slots),
                confirmation
            ),
            AttemptOutcome::Failure(failure) => failure.fmt(f),
        }
    }
}

/// The single outcome of one job execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success {
        job: String,
        /// Zero-based index of the attempt that succeeded
        attempt: usize,
        confirmation: String,
        slots: Vec<Slot>,
    },
    AllFailed {
        job: String,
        /// One entry per attempt that ran, in configured order
        failures: Vec<AttemptFailure>,
    },
}

impl JobOutcome {
    pub fn job(&self) -> &str {
        match self {
            JobOutcome::Success { job, .. } | JobOutcome::AllFailed { job, .. } => job,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success {
                job,
                attempt,
                confirmation,
                slots,
            } => write!(
                f,
                "[{}] booked {} on attempt {} (order {})",
                job,
                format_slots(slots),
                attempt + 1,
                confirmation
            ),
            JobOutcome::AllFailed { job, failures } => {
                write!(f, "[{}] all {} attempt(s) failed", job, failures.len())?;
                for failure in failures {
                    write!(f, "\n  {}", failure)?;
                }
                Ok(())
            }
        }
    }
}
