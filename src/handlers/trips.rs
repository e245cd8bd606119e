use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::{AppJson, AppPath};
use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::models::ApiResponse;
use crate::trips::{CreateTripRequest, TripDetails, TripService};

pub async fn list_trips(
    State(service): State<Arc<TripService>>,
) -> Result<Json<ApiResponse<Vec<TripDetails>>>, ApiError> {
    let trips = service.list_upcoming().await?;
    Ok(Json(ApiResponse::ok(trips)))
}

pub async fn get_trip(
    State(service): State<Arc<TripService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<TripDetails>>, ApiError> {
    let trip = service.get_trip(id).await?;
    Ok(Json(ApiResponse::ok(trip)))
}

pub async fn create_trip(
    AdminUser(admin): AdminUser,
    State(service): State<Arc<TripService>>,
    AppJson(request): AppJson<CreateTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TripDetails>>), ApiError> {
    tracing::debug!(admin = %admin.id, "Admin scheduling trip");
    let trip = service.create_trip(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(trip))))
}
