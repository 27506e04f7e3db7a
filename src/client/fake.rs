//! In-memory BookingClient for tests and dry runs
//!
//! Failures are scripted per stage, either queued (consumed one call at a
//! time) or permanent. Every call is counted so tests can assert exactly
//! which stages ran.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::traits::{BookingClient, ClientError, ClientFactory, Reservation, Session};
use crate::domain::{Credentials, Slot, Stage};

#[derive(Debug, Default)]
struct FakeState {
    queued: HashMap<Stage, VecDeque<ClientError>>,
    always: HashMap<Stage, ClientError>,
    calls: HashMap<Stage, u32>,
    requested_dates: Vec<NaiveDate>,
    reserved: Vec<Vec<Slot>>,
}

/// Scriptable fake venue API
#[derive(Debug)]
pub struct FakeBookingClient {
    slots: Vec<Slot>,
    password: Option<String>,
    confirmation: String,
    idempotent_checkout: bool,
    delays: HashMap<Stage, Duration>,
    state: Mutex<FakeState>,
}

impl Default for FakeBookingClient {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            password: None,
            confirmation: "FAKE-ORDER-1".to_string(),
            idempotent_checkout: false,
            delays: HashMap::new(),
            state: Mutex::new(FakeState::default()),
        }
    }
}

impl FakeBookingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots returned by every `list_slots` call
    pub fn with_slots(mut self, slots: Vec<Slot>) -> Self {
        self.slots = slots;
        self
    }

    /// Only accept this password at authentication
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_confirmation(mut self, confirmation: impl Into<String>) -> Self {
        self.confirmation = confirmation.into();
        self
    }

    pub fn with_idempotent_checkout(mut self) -> Self {
        self.idempotent_checkout = true;
        self
    }

    /// Take `delay` to answer every call at `stage`
    pub fn with_delay(mut self, stage: Stage, delay: Duration) -> Self {
        self.delays.insert(stage, delay);
        self
    }

    /// Fail the next call at `stage` with `error` (queued failures are consumed in order)
    pub fn fail_next(self, stage: Stage, error: ClientError) -> Self {
        self.state().queued.entry(stage).or_default().push_back(error);
        self
    }

    /// Fail every call at `stage` once the queued failures are used up
    pub fn fail_always(self, stage: Stage, error: ClientError) -> Self {
        self.state().always.insert(stage, error);
        self
    }

    /// Number of calls made at a stage
    pub fn calls(&self, stage: Stage) -> u32 {
        self.state().calls.get(&stage).copied().unwrap_or(0)
    }

    /// Dates passed to `list_slots`, in call order
    pub fn requested_dates(&self) -> Vec<NaiveDate> {
        self.state().requested_dates.clone()
    }

    /// Slot runs passed to `reserve`, in call order
    pub fn reserved(&self) -> Vec<Vec<Slot>> {
        self.state().reserved.clone()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call, wait out any delay and return the scripted failure for it, if any
    async fn enter(&self, stage: Stage) -> Result<(), ClientError> {
        *self.state().calls.entry(stage).or_insert(0) += 1;
        if let Some(delay) = self.delays.get(&stage) {
            tokio::time::sleep(*delay).await;
        }

        let mut state = self.state();
        if let Some(error) = state.queued.get_mut(&stage).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        match state.always.get(&stage) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BookingClient for FakeBookingClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        self.enter(Stage::Auth).await?;
        if let Some(expected) = &self.password
            && expected != credentials.password()
        {
            return Err(ClientError::Unauthorized(format!(
                "invalid password for {}",
                credentials.username
            )));
        }
        Ok(Session::new(format!("fake-token-{}", credentials.username)).with_account_id(1))
    }

    async fn list_slots(
        &self,
        _session: &Session,
        _venue: &str,
        _activity: &str,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, ClientError> {
        self.enter(Stage::List).await?;
        self.state().requested_dates.push(date);
        Ok(self.slots.clone())
    }

    async fn reserve(
        &self,
        _session: &Session,
        _venue: &str,
        _activity: &str,
        slots: &[Slot],
    ) -> Result<Reservation, ClientError> {
        self.enter(Stage::Reserve).await?;
        let mut state = self.state();
        state.reserved.push(slots.to_vec());
        Ok(Reservation {
            id: format!("fake-cart-{}", state.reserved.len()),
            amount_due: 0,
            source: "fake".to_string(),
        })
    }

    async fn checkout(&self, _session: &Session, _reservation: &Reservation) -> Result<String, ClientError> {
        self.enter(Stage::Checkout).await?;
        Ok(self.confirmation.clone())
    }

    fn checkout_is_idempotent(&self) -> bool {
        self.idempotent_checkout
    }
}

/// Maps usernames to fake clients; unknown usernames cannot log in
#[derive(Debug, Default)]
pub struct FakeClientFactory {
    clients: HashMap<String, Arc<FakeBookingClient>>,
}

impl FakeClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, username: impl Into<String>, client: Arc<FakeBookingClient>) -> Self {
        self.clients.insert(username.into(), client);
        self
    }
}

impl ClientFactory for FakeClientFactory {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn BookingClient>, ClientError> {
        match self.clients.get(&credentials.username) {
            Some(client) => Ok(Arc::clone(client) as Arc<dyn BookingClient>),
            None => Err(ClientError::Unauthorized(format!(
                "unknown account {}",
                credentials.username
            ))),
        }
    }
}
