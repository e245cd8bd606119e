use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::model::{
    parse_search_date, DepartureWindow, RouteSearchQuery, RouteTrip, RouteWithTrips,
};
use crate::error::ApiError;
use crate::models::Route;
use crate::store::Store;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Active routes ordered by origin city
    pub async fn list_routes(&self) -> Result<Vec<Route>, ApiError> {
        Ok(self.store.list_active_routes().await?)
    }

    /// One route with the trips that have not departed yet
    pub async fn get_route(&self, id: Uuid) -> Result<RouteWithTrips, ApiError> {
        let route = self
            .store
            .find_route(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Route not found".to_string()))?;

        let trips = self
            .store
            .list_route_trips(&[route.id], DepartureWindow::upcoming(Utc::now()))
            .await?;

        Ok(RouteWithTrips { route, trips })
    }

    pub async fn search(&self, query: RouteSearchQuery) -> Result<Vec<RouteWithTrips>, ApiError> {
        let origin = non_blank(query.origin.as_deref());
        let destination = non_blank(query.destination.as_deref());
        let (Some(origin), Some(destination)) = (origin, destination) else {
            return Err(ApiError::Validation("Origin and destination are required".to_string()));
        };

        let window = match non_blank(query.date.as_deref()) {
            Some(raw) => parse_search_date(raw)
                .map(DepartureWindow::day_from)
                .ok_or_else(|| ApiError::Validation(format!("Invalid date: {}", raw)))?,
            None => DepartureWindow::upcoming(Utc::now()),
        };

        let routes = self.store.search_routes(origin, destination).await?;
        if routes.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = routes.iter().map(|r| r.id).collect();
        let mut by_route: HashMap<Uuid, Vec<RouteTrip>> = HashMap::new();
        for trip in self.store.list_route_trips(&ids, window).await? {
            by_route.entry(trip.trip.route_id).or_default().push(trip);
        }

        tracing::debug!(origin, destination, routes = routes.len(), "Route search");

        Ok(routes
            .into_iter()
            .map(|route| {
                let trips = by_route.remove(&route.id).unwrap_or_default();
                RouteWithTrips { route, trips }
            })
            .collect())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
