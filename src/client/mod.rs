//! Venue API client layer
//!
//! This module provides:
//! - BookingClient trait for API abstraction
//! - BetterClient implementation over reqwest
//! - FakeBookingClient for tests and offline runs

pub mod better;
pub mod fake;
pub mod traits;

pub use better::{BetterClient, BetterClientFactory, BetterConfig};
pub use fake::{FakeBookingClient, FakeClientFactory};
pub use traits::{BookingClient, ClientError, ClientFactory, Reservation, Session};
