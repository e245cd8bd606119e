//! Background release of abandoned booking holds

use chrono::Duration as HoldDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::bookings::BookingService;

/// Periodically cancel pending bookings older than `hold` and restore their seats
pub async fn hold_sweeper(service: Arc<BookingService>, hold: HoldDuration, every: Duration) {
    tracing::info!(
        hold_minutes = hold.num_minutes(),
        interval_secs = every.as_secs(),
        "Starting booking hold sweeper"
    );

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match service.release_expired_holds(hold).await {
            Ok(released) if !released.is_empty() => {
                tracing::info!(count = released.len(), "Booking holds released");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Error releasing expired booking holds: {}", e);
            }
        }
    }
}
