//! Single attempt pipeline: authenticate, list, match, reserve, checkout.
//!
//! Every remote stage runs through the RetryPolicy. Checkout runs at most
//! once unless the client declares it idempotent.

use chrono::NaiveDate;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::client::{BookingClient, ClientError};
use crate::domain::{AttemptFailure, AttemptOutcome, AttemptSpec, FailureKind, Stage, format_slots};
use crate::matching::{filter_slots, find_consecutive};
use crate::retry::{RetryError, RetryPolicy};

/// Runs one AttemptSpec against one client
#[derive(Debug, Clone)]
pub struct AttemptExecutor {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl AttemptExecutor {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Execute attempt `index` of a job for slots on `date`.
    ///
    /// Never panics and never returns early without an outcome: every
    /// failure is mapped to the stage it happened in.
    pub async fn execute(
        &self,
        client: &dyn BookingClient,
        spec: &AttemptSpec,
        date: NaiveDate,
        index: usize,
    ) -> AttemptOutcome {
        match self.pipeline(client, spec, date, index).await {
            Ok(outcome) => outcome,
            Err(failure) => AttemptOutcome::Failure(failure),
        }
    }

    async fn pipeline(
        &self,
        client: &dyn BookingClient,
        spec: &AttemptSpec,
        date: NaiveDate,
        index: usize,
    ) -> Result<AttemptOutcome, AttemptFailure> {
        let fail = |stage: Stage, err: RetryError<ClientError>| {
            let (kind, message) = classify(stage, err);
            AttemptFailure::new(index, kind, message)
        };
        let venue = spec.venue();
        let activity = spec.activity();

        info!("Attempt {}: {} on {}", index + 1, spec, date);

        let credentials = spec.credentials();
        let session = self
            .policy
            .run(&self.cancel, move || client.authenticate(credentials))
            .await
            .map_err(|e| fail(Stage::Auth, e))?;
        let session = &session;

        let slots = self
            .policy
            .run(&self.cancel, move || client.list_slots(session, venue, activity, date))
            .await
            .map_err(|e| fail(Stage::List, e))?;

        let in_window = filter_slots(&slots, &spec.window());
        debug!("Attempt {}: available [{}]", index + 1, format_slots(&slots));
        debug!(
            "Attempt {}: within {} [{}]",
            index + 1,
            spec.window(),
            format_slots(&in_window)
        );

        let run = find_consecutive(&in_window, spec.n_slots()).ok_or_else(|| {
            AttemptFailure::new(
                index,
                FailureKind::NoMatchingSlots,
                format!(
                    "no run of {} consecutive slots within {} ({} available, {} in window)",
                    spec.n_slots(),
                    spec.window(),
                    slots.len(),
                    in_window.len()
                ),
            )
        })?;
        info!("Attempt {}: matched {}", index + 1, format_slots(run));

        let reservation = self
            .policy
            .run(&self.cancel, move || client.reserve(session, venue, activity, run))
            .await
            .map_err(|e| fail(Stage::Reserve, e))?;
        let reservation = &reservation;

        if self.cancel.is_cancelled() {
            return Err(AttemptFailure::new(
                index,
                FailureKind::Cancelled,
                "cancelled before checkout",
            ));
        }

        let checkout_policy = if client.checkout_is_idempotent() {
            self.policy.clone()
        } else {
            self.policy.single_shot()
        };
        let confirmation = checkout_policy
            .run(&self.cancel, move || client.checkout(session, reservation))
            .await
            .map_err(|e| fail(Stage::Checkout, e))?;

        info!("Attempt {}: booked {} (order {})", index + 1, format_slots(run), confirmation);
        Ok(AttemptOutcome::Success {
            index,
            confirmation,
            slots: run.to_vec(),
        })
    }
}

/// Map a retry failure at `stage` to a failure kind and message
fn classify(stage: Stage, err: RetryError<ClientError>) -> (FailureKind, String) {
    match err {
        RetryError::Terminal(e) => (FailureKind::for_stage(stage), e.to_string()),
        RetryError::Exhausted { attempts, last } if attempts > 1 => (
            FailureKind::RetriesExhausted(stage),
            format!("{} (after {} attempts)", last, attempts),
        ),
        RetryError::Exhausted { last, .. } => (FailureKind::for_stage(stage), last.to_string()),
        RetryError::Cancelled => (FailureKind::Cancelled, format!("cancelled during {}", stage)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveTime;

    use super::*;
    use crate::client::FakeBookingClient;
    use crate::domain::{Credentials, Slot, TimeWindow};
    use crate::retry::{RecordingSleeper, RetryConfig};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn slot(start: &str, end: &str) -> Slot {
        let s = NaiveTime::parse_from_str(start, "%H:%M").unwrap();
        let e = NaiveTime::parse_from_str(end, "%H:%M").unwrap();
        Slot::new(format!("{}-{}", start, end), date(), s, e).unwrap()
    }

    fn evening() -> Vec<Slot> {
        vec![
            slot("17:00", "17:40"),
            slot("17:40", "18:20"),
            slot("18:20", "19:00"),
            slot("19:00", "19:40"),
        ]
    }

    fn spec(min: Option<&str>, max: Option<&str>, n: usize) -> AttemptSpec {
        AttemptSpec::new(
            Credentials::new("alice", "pw"),
            "leisure-centre",
            "badminton-40min",
            TimeWindow::parse(min, max).unwrap(),
            n,
        )
        .unwrap()
    }

    fn executor() -> (AttemptExecutor, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            ..Default::default()
        })
        .with_sleeper(sleeper.clone());
        (AttemptExecutor::new(policy, CancellationToken::new()), sleeper)
    }

    #[tokio::test]
    async fn test_books_first_consecutive_run_in_window() {
        let client = FakeBookingClient::new().with_slots(evening()).with_confirmation("ORD-1");
        let (executor, _) = executor();

        let outcome = executor
            .execute(&client, &spec(Some("17:30"), None, 2), date(), 0)
            .await;

        match outcome {
            AttemptOutcome::Success {
                index,
                confirmation,
                slots,
            } => {
                assert_eq!(index, 0);
                assert_eq!(confirmation, "ORD-1");
                assert_eq!(format_slots(&slots), "17:40-18:20, 18:20-19:00");
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(client.requested_dates(), vec![date()]);
        assert_eq!(client.reserved().len(), 1);
        assert_eq!(client.calls(Stage::Checkout), 1);
    }

    #[tokio::test]
    async fn test_no_matching_slots_skips_reserve() {
        let client = FakeBookingClient::new().with_slots(evening());
        let (executor, _) = executor();

        let outcome = executor
            .execute(&client, &spec(Some("18:00"), Some("19:00"), 2), date(), 1)
            .await;

        let AttemptOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.index, 1);
        assert_eq!(failure.kind, FailureKind::NoMatchingSlots);
        assert_eq!(client.calls(Stage::Reserve), 0);
        assert_eq!(client.calls(Stage::Checkout), 0);
    }

    #[tokio::test]
    async fn test_transient_auth_failure_is_retried() {
        let client = FakeBookingClient::new()
            .with_slots(evening())
            .fail_next(Stage::Auth, ClientError::Network("reset".into()));
        let (executor, sleeper) = executor();

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        assert!(outcome.is_success());
        assert_eq!(client.calls(Stage::Auth), 2);
        assert_eq!(sleeper.delays().len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_is_terminal() {
        let client = FakeBookingClient::new().fail_always(Stage::Auth, ClientError::Unauthorized("bad".into()));
        let (executor, sleeper) = executor();

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        let AttemptOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::AuthFailed);
        assert_eq!(client.calls(Stage::Auth), 1);
        assert_eq!(client.calls(Stage::List), 0);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_persistent_list_failure_exhausts_retries() {
        let client = FakeBookingClient::new().fail_always(
            Stage::List,
            ClientError::Server {
                status: 503,
                message: "unavailable".into(),
            },
        );
        let (executor, sleeper) = executor();

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        let AttemptOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::RetriesExhausted(Stage::List));
        assert_eq!(client.calls(Stage::List), 3);
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[tokio::test]
    async fn test_reserve_conflict_is_reservation_failure() {
        let client = FakeBookingClient::new()
            .with_slots(evening())
            .fail_always(Stage::Reserve, ClientError::SlotUnavailable("taken".into()));
        let (executor, _) = executor();

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        let AttemptOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::ReservationFailed);
        assert_eq!(client.calls(Stage::Checkout), 0);
    }

    #[tokio::test]
    async fn test_checkout_runs_once_when_not_idempotent() {
        let client = FakeBookingClient::new()
            .with_slots(evening())
            .fail_always(Stage::Checkout, ClientError::Network("timeout".into()));
        let (executor, sleeper) = executor();

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        let AttemptOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::CheckoutFailed);
        assert_eq!(client.calls(Stage::Checkout), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_checkout_is_retried() {
        let client = FakeBookingClient::new()
            .with_slots(evening())
            .with_idempotent_checkout()
            .fail_next(Stage::Checkout, ClientError::Network("timeout".into()));
        let (executor, _) = executor();

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        assert!(outcome.is_success());
        assert_eq!(client.calls(Stage::Checkout), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let client = FakeBookingClient::new().with_slots(evening());
        let (executor, _) = executor();
        executor.cancel_token().cancel();

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        let AttemptOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Cancelled);
        assert_eq!(client.calls(Stage::Auth), 0);
    }

    /// Cancels the token once slots are held
    struct CancelOnReserve {
        inner: FakeBookingClient,
        cancel: CancellationToken,
    }

    #[async_trait::async_trait]
    impl BookingClient for CancelOnReserve {
        async fn authenticate(&self, credentials: &Credentials) -> Result<crate::client::Session, ClientError> {
            self.inner.authenticate(credentials).await
        }

        async fn list_slots(
            &self,
            session: &crate::client::Session,
            venue: &str,
            activity: &str,
            date: NaiveDate,
        ) -> Result<Vec<Slot>, ClientError> {
            self.inner.list_slots(session, venue, activity, date).await
        }

        async fn reserve(
            &self,
            session: &crate::client::Session,
            venue: &str,
            activity: &str,
            slots: &[Slot],
        ) -> Result<crate::client::Reservation, ClientError> {
            let reservation = self.inner.reserve(session, venue, activity, slots).await;
            self.cancel.cancel();
            reservation
        }

        async fn checkout(
            &self,
            session: &crate::client::Session,
            reservation: &crate::client::Reservation,
        ) -> Result<String, ClientError> {
            self.inner.checkout(session, reservation).await
        }
    }

    #[tokio::test]
    async fn test_cancel_after_reserve_skips_checkout() {
        let (executor, _) = executor();
        let client = CancelOnReserve {
            inner: FakeBookingClient::new().with_slots(evening()),
            cancel: executor.cancel_token().clone(),
        };

        let outcome = executor.execute(&client, &spec(None, None, 1), date(), 0).await;

        let AttemptOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Cancelled);
        assert_eq!(client.inner.calls(Stage::Reserve), 1);
        assert_eq!(client.inner.calls(Stage::Checkout), 0);
    }

    #[test]
    fn test_classify() {
        let exhausted = RetryError::Exhausted {
            attempts: 3,
            last: ClientError::Network("x".into()),
        };
        assert_eq!(classify(Stage::Reserve, exhausted).0, FailureKind::RetriesExhausted(Stage::Reserve));

        let single = RetryError::Exhausted {
            attempts: 1,
            last: ClientError::Network("x".into()),
        };
        assert_eq!(classify(Stage::Checkout, single).0, FailureKind::CheckoutFailed);

        let terminal = RetryError::Terminal(ClientError::Unauthorized("no".into()));
        let (kind, message) = classify(Stage::Auth, terminal);
        assert_eq!(kind, FailureKind::AuthFailed);
        assert!(message.contains("Unauthorized"));

        assert_eq!(classify(Stage::List, RetryError::Cancelled).0, FailureKind::Cancelled);
    }
}
