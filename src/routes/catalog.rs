//! Public route catalog

use axum::{routing::get, Router};

use crate::handlers::{get_route, list_routes, search_routes};
use crate::state::AppState;

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/routes", get(list_routes))
        .route("/api/routes/search/cities", get(search_routes))
        .route("/api/routes/:id", get(get_route))
}
