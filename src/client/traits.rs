//! Core venue API client types and trait definitions

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Credentials, Slot};
use crate::retry::Retryable;

/// Venue booking API - authenticate, discover, reserve, pay.
///
/// Implementations hold no authentication state between calls: every call
/// takes the Session returned by `authenticate`.
#[async_trait]
pub trait BookingClient: Send + Sync {
    /// Log in with an account's credentials
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ClientError>;

    /// Available slots for an activity at a venue on a date, in start-time order
    async fn list_slots(
        &self,
        session: &Session,
        venue: &str,
        activity: &str,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, ClientError>;

    /// Hold the given slots (e.g. add them to a cart)
    async fn reserve(
        &self,
        session: &Session,
        venue: &str,
        activity: &str,
        slots: &[Slot],
    ) -> Result<Reservation, ClientError>;

    /// Pay for a reservation with account credit, returning the order id
    async fn checkout(&self, session: &Session, reservation: &Reservation) -> Result<String, ClientError>;

    /// Whether repeating `checkout` for the same reservation can never double-book
    fn checkout_is_idempotent(&self) -> bool {
        false
    }
}

/// Creates a fresh client for each attempt so sessions never cross credentials
pub trait ClientFactory: Send + Sync {
    fn create(&self, credentials: &Credentials) -> Result<Arc<dyn BookingClient>, ClientError>;
}

/// An authenticated session
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    /// Venue-side account id, when the API needs it for cart operations
    pub account_id: Option<u64>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            account_id: None,
        }
    }

    pub fn with_account_id(mut self, account_id: u64) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Slots held for payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: String,
    /// Amount to pay in minor currency units; zero when covered by membership
    pub amount_due: u64,
    /// Opaque cart source handle required by checkout
    pub source: String,
}

/// Errors that can occur talking to the venue API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Bad request {status}: {message}")]
    BadRequest { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Map a non-success HTTP status to an error
    pub fn from_status(status: u16, retry_after: Option<Duration>, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ClientError::Unauthorized(message),
            409 | 410 => ClientError::SlotUnavailable(message),
            429 => ClientError::RateLimited { retry_after },
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::BadRequest { status, message },
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. })
    }
}

impl Retryable for ClientError {
    fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::RateLimited { .. } => true,
            ClientError::Server { .. } => true,
            ClientError::Unauthorized(_) => false,
            ClientError::SlotUnavailable(_) => false,
            ClientError::BadRequest { .. } => false,
            ClientError::InvalidResponse(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
