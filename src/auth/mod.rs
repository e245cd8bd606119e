//! Bearer token authentication

mod jwt;
mod service;

pub use jwt::{issue_token, verify_token, Claims, JwtError};
pub use service::AuthService;
