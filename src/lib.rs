//! slotbook - automated booking of recurring leisure-venue activity slots
//!
//! A job is an ordered list of booking attempts. Each attempt logs in,
//! lists slots for the target date, picks the earliest run of consecutive
//! slots inside its time window, reserves them and pays with account
//! credit. The first attempt to succeed ends the job.

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod matching;
pub mod notify;
pub mod retry;
pub mod runner;

pub use error::{Result, SlotbookError};
