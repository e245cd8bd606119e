//! Payment processor integration
//!
//! The processor is reached through the [`PaymentGateway`] trait so services
//! never depend on a concrete HTTP client. [`StripeGateway`] talks to the
//! Stripe REST API (or any server speaking the same `payment_intents` shape).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

/// Processor status string meaning the charge has settled
pub const INTENT_SUCCEEDED: &str = "succeeded";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Payment processor request failed: {0}")]
    Transport(String),

    #[error("Payment processor rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected payment processor response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::UpstreamFailure(err.to_string())
    }
}

/// Processor-side view of a payment intent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Charge created once the intent settles
    #[serde(default)]
    pub latest_charge: Option<String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == INTENT_SUCCEEDED
    }

    /// Identifier of the settled payment, falling back to the intent itself
    pub fn payment_reference(&self) -> String {
        self.latest_charge.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// Parameters for opening a charge intent
#[derive(Debug, Clone)]
pub struct IntentRequest {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub booking_id: Uuid,
    pub user_id: Uuid,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorBody {
    error: ProcessorErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorDetail {
    message: Option<String>,
}

/// Stripe REST client
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    async fn read_intent(response: reqwest::Response) -> Result<PaymentIntent, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ProcessorErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let form = [
            ("amount", request.amount.to_string()),
            ("currency", request.currency.clone()),
            ("metadata[bookingId]", request.booking_id.to_string()),
            ("metadata[userId]", request.user_id.to_string()),
        ];

        tracing::debug!(
            booking_id = %request.booking_id,
            amount = request.amount,
            currency = %request.currency,
            "Creating payment intent"
        );

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        Self::read_intent(response).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let well_formed = !intent_id.is_empty()
            && intent_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !well_formed {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "Malformed payment intent id".to_string(),
            });
        }

        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.api_base, intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::read_intent(response).await
    }
}
