//! Bus ticket reservation backend
//!
//! Trip catalog, seat booking and card payment confirmation over a JSON API.

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod state;
pub mod store;
pub mod trips;
pub mod websocket;
