//! Booking execution.
//!
//! This module provides:
//! - AttemptExecutor for one attempt's stage pipeline
//! - AttemptOrchestrator for ordered fallback across a job's attempts
//! - JobRunner for concurrent jobs, timeouts and notification
//! - Credential validation ahead of a run

mod credentials;
mod executor;
mod job_runner;
mod orchestrator;

pub use credentials::{unique_credentials, validate_credentials};
pub use executor::AttemptExecutor;
pub use job_runner::JobRunner;
pub use orchestrator::{AttemptOrchestrator, failures_summary, target_date};
