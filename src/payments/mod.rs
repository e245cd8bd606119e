pub mod gateway;
pub mod model;
pub mod service;

pub use gateway::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent, StripeGateway};
pub use model::*;
pub use service::PaymentService;
