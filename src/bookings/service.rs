use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::bookings::code::generate_booking_code;
use crate::bookings::model::{
    Booking, BookingDetails, CreateBookingRequest, NewBooking, ReleasedHold,
};
use crate::error::ApiError;
use crate::models::UserIdentity;
use crate::store::{Store, StoreError};
use crate::trips::{TripDetails, TripEvent};
use crate::websocket::WsState;

/// Attempts at finding an unused booking code before giving up
const CODE_ATTEMPTS: usize = 3;

type CodeGenerator = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    feed: WsState,
    next_code: CodeGenerator,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, feed: WsState) -> Self {
        Self {
            store,
            feed,
            next_code: Arc::new(generate_booking_code),
        }
    }

    /// Replace the booking code source
    pub fn with_code_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.next_code = Arc::new(generator);
        self
    }

    /// Reserve seats on a trip for the caller.
    ///
    /// The seat decrement and the booking insert commit together, so two
    /// requests racing for the last seats cannot both succeed.
    pub async fn create_booking(
        &self,
        user: &UserIdentity,
        request: CreateBookingRequest,
    ) -> Result<BookingDetails, ApiError> {
        request.validate()?;

        let trip = self
            .store
            .find_trip(request.trip_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Trip not found".to_string()))?;

        let requested = request.seat_numbers.len() as i32;
        if trip.trip.available_seats < requested {
            return Err(ApiError::CapacityExceeded {
                requested,
                available: trip.trip.available_seats,
            });
        }

        let owner = self.store.find_user(user.id).await?.map(|u| u.summary());

        let total_amount = trip.trip.price * Decimal::from(requested);
        let booking = self
            .reserve_with_fresh_code(user.id, request, total_amount)
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            booking_code = %booking.booking_code,
            trip_id = %booking.trip_id,
            user_id = %user.id,
            seats = requested,
            total = %booking.total_amount,
            "Booking created"
        );

        self.feed.publish(TripEvent::SeatsReserved {
            trip_id: booking.trip_id,
            booking_id: booking.id,
            seats: requested,
        });

        // The booking is committed; a failed re-read must not turn it into an error
        let trip = match self.store.find_trip(booking.trip_id).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => seats_taken(trip, requested),
            Err(e) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    error = %e,
                    "Trip re-read failed after booking, answering from snapshot"
                );
                seats_taken(trip, requested)
            }
        };

        Ok(BookingDetails {
            booking,
            trip,
            user: owner,
        })
    }

    async fn reserve_with_fresh_code(
        &self,
        user_id: Uuid,
        request: CreateBookingRequest,
        total_amount: Decimal,
    ) -> Result<Booking, ApiError> {
        let requested = request.seat_numbers.len() as i32;

        for attempt in 1..=CODE_ATTEMPTS {
            let new_booking = NewBooking {
                id: Uuid::new_v4(),
                user_id,
                trip_id: request.trip_id,
                seat_numbers: request.seat_numbers.clone(),
                total_amount,
                booking_code: (self.next_code)(),
            };

            match self.store.reserve_seats(new_booking).await {
                Ok(booking) => return Ok(booking),
                Err(StoreError::DuplicateBookingCode) => {
                    tracing::warn!(attempt, "Booking code collision, regenerating");
                }
                Err(StoreError::CapacityExceeded { available }) => {
                    return Err(ApiError::CapacityExceeded {
                        requested,
                        available,
                    });
                }
                Err(StoreError::NotFound(_)) => {
                    return Err(ApiError::NotFound("Trip not found".to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ApiError::Internal(format!(
            "No unique booking code after {} attempts",
            CODE_ATTEMPTS
        )))
    }

    /// Caller's bookings, newest first
    pub async fn list_bookings(&self, user_id: Uuid) -> Result<Vec<BookingDetails>, ApiError> {
        Ok(self.store.list_bookings_for_user(user_id).await?)
    }

    /// Single booking owned by the caller; other users' bookings read as absent
    pub async fn get_booking(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
    ) -> Result<BookingDetails, ApiError> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

        let trip = self
            .store
            .find_trip(booking.trip_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Trip not found".to_string()))?;
        let user = self.store.find_user(user_id).await?.map(|u| u.summary());

        Ok(BookingDetails {
            booking,
            trip,
            user,
        })
    }

    /// Cancel unpaid bookings older than `hold` and return their seats
    pub async fn release_expired_holds(
        &self,
        hold: Duration,
    ) -> Result<Vec<ReleasedHold>, ApiError> {
        let cutoff = Utc::now() - hold;
        let released = self.store.release_expired_holds(cutoff).await?;

        for expired in &released {
            tracing::info!(
                booking_id = %expired.booking_id,
                trip_id = %expired.trip_id,
                seats = expired.seats,
                "Released expired booking hold"
            );
            self.feed.publish(TripEvent::SeatsReleased {
                trip_id: expired.trip_id,
                booking_id: expired.booking_id,
                seats: expired.seats,
            });
        }

        Ok(released)
    }
}

fn seats_taken(mut trip: TripDetails, seats: i32) -> TripDetails {
    trip.trip.available_seats -= seats;
    trip
}
