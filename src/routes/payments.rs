//! Payment routes

use axum::{routing::post, Router};

use crate::handlers::{confirm_payment, create_payment_intent};
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/create-intent", post(create_payment_intent))
        .route("/api/payments/confirm", post(confirm_payment))
}
