//! Trip models and request DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{Bus, Route};

/// Scheduled departure of one bus on one route
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: Decimal,
    pub available_seats: i32,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "trip_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Scheduled,
    InTransit,
    Completed,
    Cancelled,
    Delayed,
}

/// Trip expanded with its route and bus
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    #[serde(flatten)]
    pub trip: Trip,
    pub route: Route,
    pub bus: Bus,
}

/// Request DTO for scheduling a trip
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_schedule"))]
pub struct CreateTripRequest {
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
}

fn validate_schedule(req: &CreateTripRequest) -> Result<(), ValidationError> {
    if req.arrival_time <= req.departure_time {
        return Err(ValidationError::new("arrival_before_departure"));
    }
    Ok(())
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        return Err(ValidationError::new("price_not_positive"));
    }
    Ok(())
}

/// Fully-resolved trip row ready for insertion
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: Decimal,
    pub available_seats: i32,
}

/// Seat inventory change pushed to trip feed subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum TripEvent {
    #[serde(rename_all = "camelCase")]
    SeatsReserved {
        trip_id: Uuid,
        booking_id: Uuid,
        seats: i32,
    },
    #[serde(rename_all = "camelCase")]
    SeatsReleased {
        trip_id: Uuid,
        booking_id: Uuid,
        seats: i32,
    },
    #[serde(rename_all = "camelCase")]
    BookingConfirmed {
        trip_id: Uuid,
        booking_id: Uuid,
    },
}

impl TripEvent {
    pub fn trip_id(&self) -> Uuid {
        match self {
            TripEvent::SeatsReserved { trip_id, .. }
            | TripEvent::SeatsReleased { trip_id, .. }
            | TripEvent::BookingConfirmed { trip_id, .. } => *trip_id,
        }
    }
}
