//! Booking routes

use axum::{routing::get, Router};

use crate::handlers::{create_booking, get_booking, list_bookings};
use crate::state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/:id", get(get_booking))
}
