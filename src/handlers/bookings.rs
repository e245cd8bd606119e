use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use uuid::Uuid;

use super::{AppJson, AppPath};
use crate::bookings::{BookingDetails, BookingService, CreateBookingRequest};
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::ApiResponse;

pub async fn create_booking(
    AuthenticatedUser(user): AuthenticatedUser,
    State(service): State<Arc<BookingService>>,
    AppJson(request): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingDetails>>), ApiError> {
    let booking = service.create_booking(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(booking))))
}

pub async fn list_bookings(
    AuthenticatedUser(user): AuthenticatedUser,
    State(service): State<Arc<BookingService>>,
) -> Result<Json<ApiResponse<Vec<BookingDetails>>>, ApiError> {
    let bookings = service.list_bookings(user.id).await?;
    Ok(Json(ApiResponse::ok(bookings)))
}

pub async fn get_booking(
    AuthenticatedUser(user): AuthenticatedUser,
    State(service): State<Arc<BookingService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<BookingDetails>>, ApiError> {
    let booking = service.get_booking(user.id, id).await?;
    Ok(Json(ApiResponse::ok(booking)))
}
