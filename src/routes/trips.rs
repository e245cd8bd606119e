//! Trip catalog routes

use axum::{routing::get, Router};

use crate::handlers::{create_trip, get_trip, list_trips};
use crate::state::AppState;

pub fn trip_routes() -> Router<AppState> {
    Router::new()
        .route("/api/trips", get(list_trips).post(create_trip))
        .route("/api/trips/:id", get(get_trip))
}
