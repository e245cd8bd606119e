use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::store::Store;
use crate::trips::model::{CreateTripRequest, NewTrip, TripDetails};

#[derive(Clone)]
pub struct TripService {
    store: Arc<dyn Store>,
}

impl TripService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Trips that have not departed yet, earliest departure first
    pub async fn list_upcoming(&self) -> Result<Vec<TripDetails>, ApiError> {
        Ok(self.store.list_upcoming_trips(Utc::now()).await?)
    }

    pub async fn get_trip(&self, id: Uuid) -> Result<TripDetails, ApiError> {
        self.store
            .find_trip(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Trip not found".to_string()))
    }

    /// Schedule a trip; the whole bus is on sale initially
    pub async fn create_trip(&self, request: CreateTripRequest) -> Result<TripDetails, ApiError> {
        request.validate()?;

        let bus = self
            .store
            .find_bus(request.bus_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Bus not found".to_string()))?;

        if self.store.find_route(request.route_id).await?.is_none() {
            return Err(ApiError::NotFound("Route not found".to_string()));
        }

        let trip = self
            .store
            .insert_trip(NewTrip {
                id: Uuid::new_v4(),
                route_id: request.route_id,
                bus_id: bus.id,
                departure_time: request.departure_time,
                arrival_time: request.arrival_time,
                price: request.price,
                available_seats: bus.capacity,
            })
            .await?;

        tracing::info!(
            trip_id = %trip.trip.id,
            bus = %bus.plate_number,
            seats = trip.trip.available_seats,
            departure = %trip.trip.departure_time,
            "Trip scheduled"
        );

        Ok(trip)
    }
}
