//! Application state shared across handlers

use axum::extract::FromRef;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::bookings::BookingService;
use crate::catalog::CatalogService;
use crate::payments::{PaymentGateway, PaymentService};
use crate::store::Store;
use crate::trips::TripService;
use crate::websocket::WsState;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog_service: Arc<CatalogService>,
    pub trip_service: Arc<TripService>,
    pub booking_service: Arc<BookingService>,
    pub payment_service: Arc<PaymentService>,
    pub auth_service: Arc<AuthService>,
    pub ws_state: WsState,
}

impl AppState {
    /// Wire every service to one store, gateway and trip feed
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        jwt_secret: &str,
        payment_currency: &str,
    ) -> Self {
        let ws_state = WsState::new();

        Self {
            catalog_service: Arc::new(CatalogService::new(store.clone())),
            trip_service: Arc::new(TripService::new(store.clone())),
            booking_service: Arc::new(BookingService::new(store.clone(), ws_state.clone())),
            payment_service: Arc::new(PaymentService::new(
                store.clone(),
                gateway,
                payment_currency,
                ws_state.clone(),
            )),
            auth_service: Arc::new(AuthService::new(store.clone(), jwt_secret)),
            store,
            ws_state,
        }
    }

    /// Swap in a preconfigured booking service
    pub fn with_booking_service(mut self, booking_service: BookingService) -> Self {
        self.booking_service = Arc::new(booking_service);
        self
    }
}

impl FromRef<AppState> for WsState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ws_state.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<CatalogService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.catalog_service.clone()
    }
}

impl FromRef<AppState> for Arc<TripService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.trip_service.clone()
    }
}

impl FromRef<AppState> for Arc<BookingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.booking_service.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}
