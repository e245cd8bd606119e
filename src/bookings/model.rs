//! Booking models and data structures

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::UserSummary;
use crate::trips::TripDetails;

/// A user's reservation of one or more seats on a trip
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub seat_numbers: Vec<i32>,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub booking_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn seat_count(&self) -> i32 {
        self.seat_numbers.len() as i32
    }
}

/// Booking lifecycle: `Pending -> Confirmed` on payment, `Pending -> Cancelled`
/// when the hold expires
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Whether a succeeded payment may still settle this booking.
    /// `Confirmed` is accepted so repeat confirmations stay idempotent.
    pub fn accepts_payment(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// Booking expanded with trip (route, bus) and, on single reads, the owner
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub trip: TripDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Request DTO for creating a booking
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    #[validate(
        length(min = 1, message = "At least one seat must be requested"),
        custom = "validate_seat_numbers"
    )]
    pub seat_numbers: Vec<i32>,
}

fn validate_seat_numbers(seats: &[i32]) -> Result<(), ValidationError> {
    if seats.iter().any(|s| *s < 1) {
        return Err(ValidationError::new("seat_number_not_positive"));
    }
    Ok(())
}

/// Booking row ready to be persisted together with the seat decrement
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub seat_numbers: Vec<i32>,
    pub total_amount: Decimal,
    pub booking_code: String,
}

impl NewBooking {
    pub fn seat_count(&self) -> i32 {
        self.seat_numbers.len() as i32
    }
}

/// A pending booking whose hold was released by the sweeper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedHold {
    pub booking_id: Uuid,
    pub trip_id: Uuid,
    pub seats: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_seat_list_rejected() {
        let req = CreateBookingRequest {
            trip_id: Uuid::new_v4(),
            seat_numbers: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_non_positive_seat_rejected() {
        let req = CreateBookingRequest {
            trip_id: Uuid::new_v4(),
            seat_numbers: vec![3, 0],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_uses_client_field_names() {
        let req: CreateBookingRequest = serde_json::from_value(serde_json::json!({
            "tripId": "6f1c2d4e-8a7b-4c3d-9e2f-1a2b3c4d5e6f",
            "seatNumbers": [12, 13]
        }))
        .unwrap();
        assert_eq!(req.seat_numbers, vec![12, 13]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_only_live_bookings_accept_payment() {
        assert!(BookingStatus::Pending.accepts_payment());
        assert!(BookingStatus::Confirmed.accepts_payment());
        assert!(!BookingStatus::Cancelled.accepts_payment());
        assert!(!BookingStatus::Refunded.accepts_payment());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::Confirmed).unwrap(),
            "\"CONFIRMED\""
        );
    }
}
