use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::AppJson;
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::ApiResponse;
use crate::payments::{
    ConfirmOutcome, ConfirmPaymentRequest, CreateIntentRequest, CreateIntentResponse,
    PaymentService,
};

pub async fn create_payment_intent(
    AuthenticatedUser(user): AuthenticatedUser,
    State(service): State<Arc<PaymentService>>,
    AppJson(request): AppJson<CreateIntentRequest>,
) -> Result<Json<ApiResponse<CreateIntentResponse>>, ApiError> {
    let intent = service.create_intent(&user, request).await?;
    Ok(Json(ApiResponse::ok(intent)))
}

/// 200 once the processor reports success, 400 while it has not settled
pub async fn confirm_payment(
    AuthenticatedUser(user): AuthenticatedUser,
    State(service): State<Arc<PaymentService>>,
    AppJson(request): AppJson<ConfirmPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    match service.confirm(&user, request).await? {
        ConfirmOutcome::Confirmed { .. } => Ok((
            StatusCode::OK,
            Json(ApiResponse::message(true, "Payment confirmed successfully")),
        )),
        ConfirmOutcome::NotCompleted { .. } => Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::message(false, "Payment not completed")),
        )),
    }
}
