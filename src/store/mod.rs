//! Persistence boundary
//!
//! Services hold an `Arc<dyn Store>` built once at startup. Every operation
//! that touches more than one row (seat reservation, payment completion,
//! hold release) is a single atomic unit inside the implementation.

mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::bookings::{Booking, BookingDetails, NewBooking, ReleasedHold};
use crate::catalog::{DepartureWindow, RouteTrip};
use crate::error::ApiError;
use crate::models::{Bus, Route, User};
use crate::payments::{NewPayment, Payment};
use crate::trips::{NewTrip, TripDetails};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The conditional seat decrement matched no row
    #[error("Not enough available seats ({available} left)")]
    CapacityExceeded { available: i32 },

    #[error("Booking code already in use")]
    DuplicateBookingCode,

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row"),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            // Callers that know the requested count map this themselves
            StoreError::CapacityExceeded { available } => ApiError::CapacityExceeded {
                requested: available + 1,
                available,
            },
            StoreError::DuplicateBookingCode => {
                ApiError::Internal("Booking code collision".to_string())
            }
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(msg) => ApiError::Database(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Trips departing at or after `now`, earliest first
    async fn list_upcoming_trips(&self, now: DateTime<Utc>) -> StoreResult<Vec<TripDetails>>;

    async fn find_trip(&self, id: Uuid) -> StoreResult<Option<TripDetails>>;

    async fn find_bus(&self, id: Uuid) -> StoreResult<Option<Bus>>;

    async fn find_route(&self, id: Uuid) -> StoreResult<Option<Route>>;

    /// Active routes ordered by origin city
    async fn list_active_routes(&self) -> StoreResult<Vec<Route>>;

    /// Active routes whose cities contain the given terms, ignoring case
    async fn search_routes(&self, origin: &str, destination: &str) -> StoreResult<Vec<Route>>;

    /// Trips of the given routes departing inside `window`, earliest first
    async fn list_route_trips(
        &self,
        route_ids: &[Uuid],
        window: DepartureWindow,
    ) -> StoreResult<Vec<RouteTrip>>;

    async fn insert_trip(&self, trip: NewTrip) -> StoreResult<TripDetails>;

    /// Decrement the trip's seats and insert the pending booking as one unit.
    ///
    /// Fails with `CapacityExceeded` when fewer seats remain than requested and
    /// with `DuplicateBookingCode` when the code is taken; neither leaves a
    /// partial write behind.
    async fn reserve_seats(&self, booking: NewBooking) -> StoreResult<Booking>;

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// The user's bookings with trip detail, newest first
    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>>;

    async fn insert_payment(&self, payment: NewPayment) -> StoreResult<Payment>;

    async fn find_payment_by_intent(&self, intent_id: &str) -> StoreResult<Option<Payment>>;

    /// Mark the payment completed and its booking confirmed as one unit.
    ///
    /// `processed_at` is only written the first time. A payment already
    /// marked failed, or a booking that is no longer pending or confirmed,
    /// yields `Conflict` and changes nothing.
    async fn complete_payment(
        &self,
        payment_id: Uuid,
        processor_payment_id: &str,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<(Payment, Booking)>;

    /// Cancel pending bookings created before `cutoff` that have no completed
    /// payment, return their seats and fail their pending payments.
    async fn release_expired_holds(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<ReleasedHold>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_api_errors() {
        let err: ApiError = StoreError::NotFound("Trip").into();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "Trip not found");

        let err: ApiError = StoreError::Conflict("Payment already failed".into()).into();
        assert_eq!(err.error_code(), "CONFLICT");

        let err: ApiError = StoreError::DuplicateBookingCode.into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
