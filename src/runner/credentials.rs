//! Pre-flight credential validation

use std::collections::HashSet;

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::client::ClientFactory;
use crate::domain::{BookingJob, Credentials};
use crate::error::{Result, SlotbookError};
use crate::retry::RetryPolicy;

/// Every distinct credential pair across `jobs`, in first-seen order
pub fn unique_credentials(jobs: &[BookingJob]) -> Vec<&Credentials> {
    let mut seen = HashSet::new();
    jobs.iter()
        .flat_map(|job| job.attempts())
        .map(|spec| spec.credentials())
        .filter(|credentials| seen.insert(*credentials))
        .collect()
}

/// Authenticate each distinct account once.
///
/// Returns the number of accounts checked, or a Validation error naming
/// every account that was rejected.
pub async fn validate_credentials(
    factory: &dyn ClientFactory,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    jobs: &[BookingJob],
) -> Result<usize> {
    let accounts = unique_credentials(jobs);
    let mut rejected = Vec::new();

    for credentials in &accounts {
        let credentials: &Credentials = credentials;
        info!("Validating credentials for {}...", credentials.username);

        let result = match factory.create(credentials) {
            Ok(client) => {
                let client = client.as_ref();
                policy
                    .run(cancel, move || client.authenticate(credentials))
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => info!("Credentials valid for {}", credentials.username),
            Err(e) => {
                warn!("Credentials rejected for {}: {}", credentials.username, e);
                rejected.push(format!("{} ({})", credentials.username, e));
            }
        }
    }

    if rejected.is_empty() {
        Ok(accounts.len())
    } else {
        Err(SlotbookError::Validation(format!(
            "{} of {} account(s) failed to authenticate: {}",
            rejected.len(),
            accounts.len(),
            rejected.join(", ")
        )))
    }
}
