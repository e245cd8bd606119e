//! Shared fixtures: in-memory store, scripted payment gateway, seed data

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use bus_ticket_server::auth::issue_token;
use bus_ticket_server::bookings::{Booking, BookingDetails, BookingStatus, NewBooking, ReleasedHold};
use bus_ticket_server::catalog::{DepartureWindow, RouteTrip};
use bus_ticket_server::models::{Bus, Route, User, UserIdentity, UserRole};
use bus_ticket_server::payments::{
    GatewayError, IntentRequest, NewPayment, Payment, PaymentGateway, PaymentIntent,
    PaymentStatus,
};
use bus_ticket_server::store::{Store, StoreError, StoreResult};
use bus_ticket_server::trips::{NewTrip, Trip, TripDetails, TripStatus};

pub const JWT_SECRET: &str = "test-secret";

pub fn money(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    routes: HashMap<Uuid, Route>,
    buses: HashMap<Uuid, Bus>,
    trips: HashMap<Uuid, Trip>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
    fail_trip_reads_after_reserve: bool,
    reserved: bool,
}

/// Store backed by hash maps; each operation holds one lock so multi-row
/// writes are atomic like their Postgres counterparts
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, role: UserRole) -> UserIdentity {
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: format!("{}@example.com", &id.simple().to_string()[..8]),
            first_name: "Ada".to_string(),
            last_name: "Rider".to_string(),
            role,
            is_verified: true,
        };
        let identity = user.identity();
        self.tables.lock().unwrap().users.insert(id, user);
        identity
    }

    /// Make `find_trip` error once any reservation has committed
    pub fn fail_trip_reads_after_reserve(&self) {
        self.tables.lock().unwrap().fail_trip_reads_after_reserve = true;
    }

    pub fn remove_user(&self, id: Uuid) {
        self.tables.lock().unwrap().users.remove(&id);
    }

    pub fn add_route(&self) -> Route {
        self.add_route_between("Lisbon", "Porto", true)
    }

    pub fn add_route_between(&self, origin: &str, destination: &str, is_active: bool) -> Route {
        let route = Route {
            id: Uuid::new_v4(),
            origin_city: origin.to_string(),
            destination_city: destination.to_string(),
            distance: 313,
            estimated_duration: 210,
            base_price: money("25.00"),
            is_active,
        };
        self.tables
            .lock()
            .unwrap()
            .routes
            .insert(route.id, route.clone());
        route
    }

    pub fn add_bus(&self, capacity: i32) -> Bus {
        let bus = Bus {
            id: Uuid::new_v4(),
            plate_number: format!("AA-{}", &Uuid::new_v4().simple().to_string()[..6]),
            model: "Volvo 9700".to_string(),
            capacity,
            amenities: vec!["wifi".to_string(), "usb".to_string()],
            is_active: true,
        };
        self.tables.lock().unwrap().buses.insert(bus.id, bus.clone());
        bus
    }

    /// Trip departing `departs_in` from now with `available` seats left
    pub fn add_trip(&self, price: &str, available: i32, departs_in: Duration) -> Trip {
        let route = self.add_route();
        self.add_trip_at(route.id, price, available, Utc::now() + departs_in)
    }

    /// Trip on an existing route departing at `departure`
    pub fn add_trip_at(
        &self,
        route_id: Uuid,
        price: &str,
        available: i32,
        departure: DateTime<Utc>,
    ) -> Trip {
        let bus = self.add_bus(available.max(1) + 10);
        let trip = Trip {
            id: Uuid::new_v4(),
            route_id,
            bus_id: bus.id,
            departure_time: departure,
            arrival_time: departure + Duration::hours(4),
            price: money(price),
            available_seats: available,
            status: TripStatus::Scheduled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.tables.lock().unwrap().trips.insert(trip.id, trip.clone());
        trip
    }

    pub fn trip(&self, id: Uuid) -> Trip {
        self.tables.lock().unwrap().trips[&id].clone()
    }

    pub fn booking(&self, id: Uuid) -> Booking {
        self.tables.lock().unwrap().bookings[&id].clone()
    }

    pub fn booking_count(&self) -> usize {
        self.tables.lock().unwrap().bookings.len()
    }

    pub fn payment(&self, id: Uuid) -> Payment {
        self.tables.lock().unwrap().payments[&id].clone()
    }

    pub fn payments_for_booking(&self, booking_id: Uuid) -> Vec<Payment> {
        self.tables
            .lock()
            .unwrap()
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect()
    }

    /// Insert a booking row directly, bypassing seat accounting
    pub fn insert_booking_with_code(&self, user_id: Uuid, trip_id: Uuid, code: &str) -> Booking {
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id,
            trip_id,
            seat_numbers: vec![1],
            total_amount: money("10.00"),
            status: BookingStatus::Pending,
            booking_code: code.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .bookings
            .insert(booking.id, booking.clone());
        booking
    }

    /// Move a booking's creation time into the past
    pub fn age_booking(&self, id: Uuid, by: Duration) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(b) = tables.bookings.get_mut(&id) {
            b.created_at = b.created_at - by;
        }
    }

    fn details(tables: &Tables, trip: &Trip) -> StoreResult<TripDetails> {
        let route = tables
            .routes
            .get(&trip.route_id)
            .cloned()
            .ok_or(StoreError::NotFound("Route"))?;
        let bus = tables
            .buses
            .get(&trip.bus_id)
            .cloned()
            .ok_or(StoreError::NotFound("Bus"))?;
        Ok(TripDetails {
            trip: trip.clone(),
            route,
            bus,
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn list_upcoming_trips(&self, now: DateTime<Utc>) -> StoreResult<Vec<TripDetails>> {
        let tables = self.tables.lock().unwrap();
        let mut trips: Vec<&Trip> = tables
            .trips
            .values()
            .filter(|t| t.departure_time >= now)
            .collect();
        trips.sort_by_key(|t| t.departure_time);
        trips.into_iter().map(|t| Self::details(&tables, t)).collect()
    }

    async fn find_trip(&self, id: Uuid) -> StoreResult<Option<TripDetails>> {
        let tables = self.tables.lock().unwrap();
        if tables.fail_trip_reads_after_reserve && tables.reserved {
            return Err(StoreError::Database("connection reset".to_string()));
        }
        tables
            .trips
            .get(&id)
            .map(|t| Self::details(&tables, t))
            .transpose()
    }

    async fn find_bus(&self, id: Uuid) -> StoreResult<Option<Bus>> {
        Ok(self.tables.lock().unwrap().buses.get(&id).cloned())
    }

    async fn find_route(&self, id: Uuid) -> StoreResult<Option<Route>> {
        Ok(self.tables.lock().unwrap().routes.get(&id).cloned())
    }

    async fn list_active_routes(&self) -> StoreResult<Vec<Route>> {
        let tables = self.tables.lock().unwrap();
        let mut routes: Vec<Route> = tables
            .routes
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        routes.sort_by(|a, b| a.origin_city.cmp(&b.origin_city));
        Ok(routes)
    }

    async fn search_routes(&self, origin: &str, destination: &str) -> StoreResult<Vec<Route>> {
        let origin = origin.to_lowercase();
        let destination = destination.to_lowercase();
        let tables = self.tables.lock().unwrap();
        let mut routes: Vec<Route> = tables
            .routes
            .values()
            .filter(|r| {
                r.is_active
                    && r.origin_city.to_lowercase().contains(&origin)
                    && r.destination_city.to_lowercase().contains(&destination)
            })
            .cloned()
            .collect();
        routes.sort_by(|a, b| {
            (&a.origin_city, &a.destination_city).cmp(&(&b.origin_city, &b.destination_city))
        });
        Ok(routes)
    }

    async fn list_route_trips(
        &self,
        route_ids: &[Uuid],
        window: DepartureWindow,
    ) -> StoreResult<Vec<RouteTrip>> {
        let tables = self.tables.lock().unwrap();
        let mut trips: Vec<&Trip> = tables
            .trips
            .values()
            .filter(|t| route_ids.contains(&t.route_id) && window.contains(t.departure_time))
            .collect();
        trips.sort_by_key(|t| t.departure_time);
        trips
            .into_iter()
            .map(|t| {
                let details = Self::details(&tables, t)?;
                Ok(RouteTrip {
                    trip: details.trip,
                    bus: details.bus,
                })
            })
            .collect()
    }

    async fn insert_trip(&self, trip: NewTrip) -> StoreResult<TripDetails> {
        let mut tables = self.tables.lock().unwrap();
        let row = Trip {
            id: trip.id,
            route_id: trip.route_id,
            bus_id: trip.bus_id,
            departure_time: trip.departure_time,
            arrival_time: trip.arrival_time,
            price: trip.price,
            available_seats: trip.available_seats,
            status: TripStatus::Scheduled,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        tables.trips.insert(row.id, row.clone());
        Self::details(&tables, &row)
    }

    async fn reserve_seats(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut tables = self.tables.lock().unwrap();

        if tables
            .bookings
            .values()
            .any(|b| b.booking_code == booking.booking_code)
        {
            return Err(StoreError::DuplicateBookingCode);
        }

        let seats = booking.seat_count();
        let trip = tables
            .trips
            .get_mut(&booking.trip_id)
            .ok_or(StoreError::NotFound("Trip"))?;
        if trip.available_seats < seats {
            return Err(StoreError::CapacityExceeded {
                available: trip.available_seats,
            });
        }
        trip.available_seats -= seats;

        let row = Booking {
            id: booking.id,
            user_id: booking.user_id,
            trip_id: booking.trip_id,
            seat_numbers: booking.seat_numbers,
            total_amount: booking.total_amount,
            status: BookingStatus::Pending,
            booking_code: booking.booking_code,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        tables.bookings.insert(row.id, row.clone());
        tables.reserved = true;
        Ok(row)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.lock().unwrap().bookings.get(&id).cloned())
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>> {
        let tables = self.tables.lock().unwrap();
        let mut bookings: Vec<&Booking> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        bookings
            .into_iter()
            .map(|b| {
                let trip = tables
                    .trips
                    .get(&b.trip_id)
                    .ok_or(StoreError::NotFound("Trip"))?;
                Ok(BookingDetails {
                    booking: b.clone(),
                    trip: Self::details(&tables, trip)?,
                    user: None,
                })
            })
            .collect()
    }

    async fn insert_payment(&self, payment: NewPayment) -> StoreResult<Payment> {
        let row = Payment {
            id: payment.id,
            booking_id: payment.booking_id,
            user_id: payment.user_id,
            amount: payment.amount,
            currency: payment.currency,
            processor_intent_id: payment.processor_intent_id,
            processor_payment_id: None,
            status: PaymentStatus::Pending,
            processed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .payments
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_payment_by_intent(&self, intent_id: &str) -> StoreResult<Option<Payment>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .payments
            .values()
            .filter(|p| p.processor_intent_id == intent_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn complete_payment(
        &self,
        payment_id: Uuid,
        processor_payment_id: &str,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<(Payment, Booking)> {
        let mut tables = self.tables.lock().unwrap();

        let booking_id = tables
            .payments
            .get(&payment_id)
            .map(|p| p.booking_id)
            .ok_or(StoreError::NotFound("Payment"))?;
        let booking_status = tables
            .bookings
            .get(&booking_id)
            .map(|b| b.status)
            .ok_or(StoreError::NotFound("Booking"))?;
        if !booking_status.accepts_payment() {
            return Err(StoreError::Conflict("Booking can no longer be paid".to_string()));
        }

        let payment = tables
            .payments
            .get_mut(&payment_id)
            .ok_or(StoreError::NotFound("Payment"))?;
        if payment.status == PaymentStatus::Failed {
            return Err(StoreError::Conflict("Payment already failed".to_string()));
        }
        payment.status = PaymentStatus::Completed;
        payment.processor_payment_id = Some(processor_payment_id.to_string());
        payment.processed_at = payment.processed_at.or(Some(processed_at));
        let payment = payment.clone();

        let booking = tables
            .bookings
            .get_mut(&payment.booking_id)
            .ok_or(StoreError::NotFound("Booking"))?;
        booking.status = BookingStatus::Confirmed;

        Ok((payment, booking.clone()))
    }

    async fn release_expired_holds(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<ReleasedHold>> {
        let mut tables = self.tables.lock().unwrap();

        let expired: Vec<ReleasedHold> = tables
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .filter(|b| {
                !tables.payments.values().any(|p| {
                    p.booking_id == b.id && p.status == PaymentStatus::Completed
                })
            })
            .map(|b| ReleasedHold {
                booking_id: b.id,
                trip_id: b.trip_id,
                seats: b.seat_count(),
            })
            .collect();

        for hold in &expired {
            if let Some(b) = tables.bookings.get_mut(&hold.booking_id) {
                b.status = BookingStatus::Cancelled;
            }
            if let Some(t) = tables.trips.get_mut(&hold.trip_id) {
                t.available_seats += hold.seats;
            }
            for p in tables.payments.values_mut() {
                if p.booking_id == hold.booking_id && p.status == PaymentStatus::Pending {
                    p.status = PaymentStatus::Failed;
                }
            }
        }

        Ok(expired)
    }
}

/// Gateway double: intents are created with ids `pi_test_<n>` and report
/// whatever status was scripted for them
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    statuses: Arc<Mutex<HashMap<String, String>>>,
    created: Arc<Mutex<Vec<IntentRequest>>>,
    failures: Arc<Mutex<VecDeque<GatewayError>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, intent_id: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(intent_id.to_string(), status.to_string());
    }

    /// Make the next call fail
    pub fn fail_next(&self, err: GatewayError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn created(&self) -> Vec<IntentRequest> {
        self.created.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Option<GatewayError> {
        self.failures.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut created = self.created.lock().unwrap();
        created.push(request);
        let id = format!("pi_test_{}", created.len());
        self.statuses
            .lock()
            .unwrap()
            .insert(id.clone(), "requires_payment_method".to_string());

        Ok(PaymentIntent {
            client_secret: Some(format!("{}_secret_abc", id)),
            id,
            status: "requires_payment_method".to_string(),
            latest_charge: None,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                message: "No such payment_intent".to_string(),
            })?;
        let latest_charge = (status == "succeeded").then(|| format!("ch_for_{}", intent_id));

        Ok(PaymentIntent {
            id: intent_id.to_string(),
            status,
            client_secret: None,
            latest_charge,
        })
    }
}

pub fn bearer(user: &UserIdentity) -> String {
    let token = issue_token(user, JWT_SECRET, Duration::hours(1)).unwrap();
    format!("Bearer {}", token)
}
