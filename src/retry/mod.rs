//! Retry layer for venue API calls.
//!
//! - RetryPolicy: bounded exponential backoff around one remote call
//! - Retryable: transient vs terminal failure classification
//! - Sleeper: how backoff delays are waited out (real or recorded)

mod policy;
mod sleeper;

pub use policy::{RetryConfig, RetryError, RetryPolicy, Retryable};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
