//! PostgreSQL implementation of [`Store`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::bookings::{Booking, BookingDetails, BookingStatus, NewBooking, ReleasedHold};
use crate::catalog::{DepartureWindow, RouteTrip};
use crate::models::{Bus, Route, User};
use crate::payments::{NewPayment, Payment, PaymentStatus};
use crate::trips::{NewTrip, Trip, TripDetails, TripStatus};

const TRIP_DETAILS_SELECT: &str = r#"
    SELECT
        t.id, t.route_id, t.bus_id, t.departure_time, t.arrival_time, t.price,
        t.available_seats, t.status, t.created_at, t.updated_at,
        r.origin_city, r.destination_city, r.distance, r.estimated_duration,
        r.base_price, r.is_active AS route_is_active,
        b.plate_number, b.model, b.capacity, b.amenities, b.is_active AS bus_is_active
    FROM trips t
    JOIN routes r ON r.id = t.route_id
    JOIN buses b ON b.id = t.bus_id
"#;

const UNIQUE_VIOLATION: &str = "23505";
const BOOKING_CODE_CONSTRAINT: &str = "bookings_booking_code_key";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn trip_details_by_ids(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, TripDetails>> {
        let rows = sqlx::query(&format!("{} WHERE t.id = ANY($1)", TRIP_DETAILS_SELECT))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| trip_details_from_row(row).map(|d| (d.trip.id, d)))
            .collect::<Result<_, _>>()
            .map_err(StoreError::from)
    }
}

fn trip_details_from_row(row: &PgRow) -> Result<TripDetails, sqlx::Error> {
    let trip = Trip {
        id: row.try_get("id")?,
        route_id: row.try_get("route_id")?,
        bus_id: row.try_get("bus_id")?,
        departure_time: row.try_get("departure_time")?,
        arrival_time: row.try_get("arrival_time")?,
        price: row.try_get("price")?,
        available_seats: row.try_get("available_seats")?,
        status: row.try_get::<TripStatus, _>("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };

    let route = Route {
        id: trip.route_id,
        origin_city: row.try_get("origin_city")?,
        destination_city: row.try_get("destination_city")?,
        distance: row.try_get("distance")?,
        estimated_duration: row.try_get("estimated_duration")?,
        base_price: row.try_get("base_price")?,
        is_active: row.try_get("route_is_active")?,
    };

    let bus = Bus {
        id: trip.bus_id,
        plate_number: row.try_get("plate_number")?,
        model: row.try_get("model")?,
        capacity: row.try_get("capacity")?,
        amenities: row.try_get("amenities")?,
        is_active: row.try_get("bus_is_active")?,
    };

    Ok(TripDetails { trip, route, bus })
}

/// `%term%` for ILIKE with the term's own wildcards escaped
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn map_booking_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
            && db_err.constraint() == Some(BOOKING_CODE_CONSTRAINT)
        {
            return StoreError::DuplicateBookingCode;
        }
    }
    StoreError::from(err)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, first_name, last_name, role, is_verified FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_upcoming_trips(&self, now: DateTime<Utc>) -> StoreResult<Vec<TripDetails>> {
        let rows = sqlx::query(&format!(
            "{} WHERE t.departure_time >= $1 ORDER BY t.departure_time ASC",
            TRIP_DETAILS_SELECT
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(trip_details_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn find_trip(&self, id: Uuid) -> StoreResult<Option<TripDetails>> {
        let row = sqlx::query(&format!("{} WHERE t.id = $1", TRIP_DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(trip_details_from_row)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn find_bus(&self, id: Uuid) -> StoreResult<Option<Bus>> {
        let bus = sqlx::query_as::<_, Bus>("SELECT * FROM buses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bus)
    }

    async fn find_route(&self, id: Uuid) -> StoreResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(route)
    }

    async fn list_active_routes(&self) -> StoreResult<Vec<Route>> {
        let routes = sqlx::query_as::<_, Route>(
            "SELECT * FROM routes WHERE is_active = TRUE ORDER BY origin_city ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }

    async fn search_routes(&self, origin: &str, destination: &str) -> StoreResult<Vec<Route>> {
        let routes = sqlx::query_as::<_, Route>(
            r#"
            SELECT * FROM routes
            WHERE is_active = TRUE
              AND origin_city ILIKE $1
              AND destination_city ILIKE $2
            ORDER BY origin_city ASC, destination_city ASC
            "#,
        )
        .bind(contains_pattern(origin))
        .bind(contains_pattern(destination))
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }

    async fn list_route_trips(
        &self,
        route_ids: &[Uuid],
        window: DepartureWindow,
    ) -> StoreResult<Vec<RouteTrip>> {
        let rows = sqlx::query(&format!(
            r#"{}
            WHERE t.route_id = ANY($1)
              AND t.departure_time >= $2
              AND ($3::timestamptz IS NULL OR t.departure_time < $3)
            ORDER BY t.departure_time ASC"#,
            TRIP_DETAILS_SELECT
        ))
        .bind(route_ids)
        .bind(window.from)
        .bind(window.until)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                trip_details_from_row(row).map(|d| RouteTrip {
                    trip: d.trip,
                    bus: d.bus,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn insert_trip(&self, trip: NewTrip) -> StoreResult<TripDetails> {
        sqlx::query(
            r#"
            INSERT INTO trips (
                id, route_id, bus_id, departure_time, arrival_time, price,
                available_seats, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(trip.id)
        .bind(trip.route_id)
        .bind(trip.bus_id)
        .bind(trip.departure_time)
        .bind(trip.arrival_time)
        .bind(trip.price)
        .bind(trip.available_seats)
        .bind(TripStatus::Scheduled)
        .execute(&self.pool)
        .await?;

        self.find_trip(trip.id)
            .await?
            .ok_or(StoreError::NotFound("Trip"))
    }

    async fn reserve_seats(&self, booking: NewBooking) -> StoreResult<Booking> {
        let seats = booking.seat_count();
        let mut tx = self.pool.begin().await?;

        let decremented = sqlx::query(
            r#"
            UPDATE trips
            SET available_seats = available_seats - $1, updated_at = NOW()
            WHERE id = $2 AND available_seats >= $1
            "#,
        )
        .bind(seats)
        .bind(booking.trip_id)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            let available: Option<i32> =
                sqlx::query_scalar("SELECT available_seats FROM trips WHERE id = $1")
                    .bind(booking.trip_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Err(match available {
                Some(available) => StoreError::CapacityExceeded { available },
                None => StoreError::NotFound("Trip"),
            });
        }

        let inserted = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, user_id, trip_id, seat_numbers, total_amount, status, booking_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.trip_id)
        .bind(&booking.seat_numbers)
        .bind(booking.total_amount)
        .bind(BookingStatus::Pending)
        .bind(&booking.booking_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_booking_insert_error)?;

        tx.commit().await?;

        Ok(inserted)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut trip_ids: Vec<Uuid> = bookings.iter().map(|b| b.trip_id).collect();
        trip_ids.sort();
        trip_ids.dedup();
        let trips = self.trip_details_by_ids(&trip_ids).await?;

        bookings
            .into_iter()
            .map(|booking| {
                let trip = trips
                    .get(&booking.trip_id)
                    .cloned()
                    .ok_or(StoreError::NotFound("Trip"))?;
                Ok(BookingDetails {
                    booking,
                    trip,
                    user: None,
                })
            })
            .collect()
    }

    async fn insert_payment(&self, payment: NewPayment) -> StoreResult<Payment> {
        let inserted = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, booking_id, user_id, amount, currency, processor_intent_id, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.processor_intent_id)
        .bind(PaymentStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn find_payment_by_intent(&self, intent_id: &str) -> StoreResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE processor_intent_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn complete_payment(
        &self,
        payment_id: Uuid,
        processor_payment_id: &str,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<(Payment, Booking)> {
        let mut tx = self.pool.begin().await?;

        // Lock order matches the hold sweeper: booking first, then payment
        let (booking_id, booking_status) = sqlx::query_as::<_, (Uuid, BookingStatus)>(
            r#"
            SELECT b.id, b.status FROM bookings b
            JOIN payments p ON p.booking_id = b.id
            WHERE p.id = $1
            FOR UPDATE OF b
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Payment"))?;

        if !booking_status.accepts_payment() {
            tx.rollback().await?;
            return Err(StoreError::Conflict(format!(
                "Booking is {} and can no longer be paid",
                booking_status.as_str()
            )));
        }

        let current: PaymentStatus =
            sqlx::query_scalar("SELECT status FROM payments WHERE id = $1 FOR UPDATE")
                .bind(payment_id)
                .fetch_one(&mut *tx)
                .await?;

        if current == PaymentStatus::Failed {
            tx.rollback().await?;
            return Err(StoreError::Conflict(
                "Payment was marked failed after its booking hold expired".to_string(),
            ));
        }

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2,
                processor_payment_id = $3,
                processed_at = COALESCE(processed_at, $4),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(PaymentStatus::Completed)
        .bind(processor_payment_id)
        .bind(processed_at)
        .fetch_one(&mut *tx)
        .await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(BookingStatus::Confirmed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((payment, booking))
    }

    async fn release_expired_holds(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<ReleasedHold>> {
        let mut tx = self.pool.begin().await?;

        let released = sqlx::query_as::<_, (Uuid, Uuid, i32)>(
            r#"
            WITH expired AS (
                SELECT b.id
                FROM bookings b
                WHERE b.status = $1
                  AND b.created_at < $2
                  AND NOT EXISTS (
                      SELECT 1 FROM payments p
                      WHERE p.booking_id = b.id AND p.status = $3
                  )
                FOR UPDATE OF b SKIP LOCKED
            )
            UPDATE bookings
            SET status = $4, updated_at = NOW()
            FROM expired
            WHERE bookings.id = expired.id
            RETURNING bookings.id, bookings.trip_id, cardinality(bookings.seat_numbers)
            "#,
        )
        .bind(BookingStatus::Pending)
        .bind(cutoff)
        .bind(PaymentStatus::Completed)
        .bind(BookingStatus::Cancelled)
        .fetch_all(&mut *tx)
        .await?;

        if released.is_empty() {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        for (_, trip_id, seats) in &released {
            sqlx::query(
                r#"
                UPDATE trips
                SET available_seats = available_seats + $1, updated_at = NOW()
                WHERE id = $2
                "#,
            )
            .bind(*seats)
            .bind(*trip_id)
            .execute(&mut *tx)
            .await?;
        }

        let booking_ids: Vec<Uuid> = released.iter().map(|(id, _, _)| *id).collect();
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, updated_at = NOW()
            WHERE booking_id = ANY($2) AND status = $3
            "#,
        )
        .bind(PaymentStatus::Failed)
        .bind(&booking_ids)
        .bind(PaymentStatus::Pending)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(released
            .into_iter()
            .map(|(booking_id, trip_id, seats)| ReleasedHold {
                booking_id,
                trip_id,
                seats,
            })
            .collect())
    }
}
