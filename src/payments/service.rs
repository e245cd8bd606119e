use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use uuid::Uuid;

use crate::bookings::BookingStatus;
use crate::error::ApiError;
use crate::models::UserIdentity;
use crate::payments::gateway::{IntentRequest, PaymentGateway};
use crate::payments::model::{
    ConfirmOutcome, ConfirmPaymentRequest, CreateIntentRequest, CreateIntentResponse, NewPayment,
    PaymentStatus,
};
use crate::store::Store;
use crate::trips::TripEvent;
use crate::websocket::WsState;

/// Convert a decimal amount to integer minor units, rounding half away from zero
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    feed: WsState,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
        feed: WsState,
    ) -> Self {
        Self {
            store,
            gateway,
            currency: currency.into(),
            feed,
        }
    }

    /// Open a processor intent for the caller's booking and record a pending payment
    pub async fn create_intent(
        &self,
        user: &UserIdentity,
        request: CreateIntentRequest,
    ) -> Result<CreateIntentResponse, ApiError> {
        let booking = self
            .store
            .find_booking(request.booking_id)
            .await?
            .filter(|b| b.user_id == user.id)
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

        if booking.status != BookingStatus::Pending {
            return Err(ApiError::Conflict(format!(
                "Booking is {} and cannot take a new payment",
                booking.status.as_str()
            )));
        }

        let amount = to_minor_units(booking.total_amount).ok_or_else(|| {
            ApiError::Internal(format!("Amount out of range: {}", booking.total_amount))
        })?;

        let intent = self
            .gateway
            .create_intent(IntentRequest {
                amount,
                currency: self.currency.clone(),
                booking_id: booking.id,
                user_id: user.id,
            })
            .await?;

        let client_secret = intent.client_secret.clone().ok_or_else(|| {
            ApiError::UpstreamFailure(format!("Intent {} has no client secret", intent.id))
        })?;

        let payment = self
            .store
            .insert_payment(NewPayment {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                user_id: user.id,
                amount: booking.total_amount,
                currency: self.currency.clone(),
                processor_intent_id: intent.id.clone(),
            })
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            intent_id = %intent.id,
            amount_minor = amount,
            "Payment intent created"
        );

        Ok(CreateIntentResponse {
            client_secret,
            payment_id: payment.id,
        })
    }

    /// Finalize a payment once the processor reports the intent succeeded.
    ///
    /// Repeating a successful confirmation leaves the same state behind.
    pub async fn confirm(
        &self,
        user: &UserIdentity,
        request: ConfirmPaymentRequest,
    ) -> Result<ConfirmOutcome, ApiError> {
        let intent = self
            .gateway
            .retrieve_intent(&request.payment_intent_id)
            .await?;

        if !intent.is_succeeded() {
            tracing::debug!(
                intent_id = %intent.id,
                status = %intent.status,
                "Payment intent not settled"
            );
            return Ok(ConfirmOutcome::NotCompleted {
                processor_status: intent.status,
            });
        }

        let payment = self
            .store
            .find_payment_by_intent(&intent.id)
            .await?
            .filter(|p| p.user_id == user.id)
            .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

        if payment.status == PaymentStatus::Failed {
            return Err(ApiError::Conflict(
                "Payment was marked failed after its booking hold expired".to_string(),
            ));
        }

        let (payment, booking) = self
            .store
            .complete_payment(payment.id, &intent.payment_reference(), Utc::now())
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            booking_code = %booking.booking_code,
            "Payment confirmed"
        );

        self.feed.publish(TripEvent::BookingConfirmed {
            trip_id: booking.trip_id,
            booking_id: booking.id,
        });

        Ok(ConfirmOutcome::Confirmed {
            payment_id: payment.id,
            booking_id: booking.id,
            trip_id: booking.trip_id,
        })
    }
}
