use axum::{extract::State, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::{AppPath, AppQuery};
use crate::catalog::{CatalogService, RouteSearchQuery, RouteWithTrips};
use crate::error::ApiError;
use crate::models::{ApiResponse, Route};

pub async fn list_routes(
    State(service): State<Arc<CatalogService>>,
) -> Result<Json<ApiResponse<Vec<Route>>>, ApiError> {
    let routes = service.list_routes().await?;
    Ok(Json(ApiResponse::ok(routes)))
}

pub async fn get_route(
    State(service): State<Arc<CatalogService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<RouteWithTrips>>, ApiError> {
    let route = service.get_route(id).await?;
    Ok(Json(ApiResponse::ok(route)))
}

pub async fn search_routes(
    State(service): State<Arc<CatalogService>>,
    AppQuery(query): AppQuery<RouteSearchQuery>,
) -> Result<Json<ApiResponse<Vec<RouteWithTrips>>>, ApiError> {
    let routes = service.search(query).await?;
    Ok(Json(ApiResponse::ok(routes)))
}
