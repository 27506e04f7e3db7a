//! Domain types for slotbook
//!
//! This module contains the booking data model:
//! - Slot: a bookable interval discovered from the venue API
//! - TimeWindow: time-of-day bounds an attempt may book within
//! - Credentials / AttemptSpec / BookingJob: validated booking preferences
//! - AttemptOutcome / JobOutcome: per-execution results

pub mod attempt;
pub mod outcome;
pub mod slot;
pub mod window;

pub use attempt::{AttemptSpec, BookingJob, Credentials};
pub use outcome::{AttemptFailure, AttemptOutcome, FailureKind, JobOutcome, Stage};
pub use slot::{Slot, format_slots};
pub use window::{TimeWindow, parse_time_of_day};
