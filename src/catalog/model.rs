//! Route catalog views and search parameters

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Bus, Route};
use crate::trips::Trip;

/// Trip listed under its route, with the bus that runs it
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouteTrip {
    #[serde(flatten)]
    pub trip: Trip,
    pub bus: Bus,
}

/// Route expanded with its trips in the requested window
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouteWithTrips {
    #[serde(flatten)]
    pub route: Route,
    pub trips: Vec<RouteTrip>,
}

/// Query string of `GET /api/routes/search/cities`
#[derive(Debug, Default, Deserialize)]
pub struct RouteSearchQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<String>,
}

/// Departure window for trips attached to catalog routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartureWindow {
    pub from: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

impl DepartureWindow {
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            from: now,
            until: None,
        }
    }

    /// The 24 hours starting at `start`
    pub fn day_from(start: DateTime<Utc>) -> Self {
        Self {
            from: start,
            until: Some(start + Duration::days(1)),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && self.until.map_or(true, |until| at < until)
    }
}

/// Accepts `YYYY-MM-DD` (UTC midnight) or a full RFC 3339 timestamp
pub fn parse_search_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_plain_date_is_utc_midnight() {
        let at = parse_search_date("2025-03-14").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rfc3339_date_keeps_offset() {
        let at = parse_search_date("2025-03-14T10:00:00+02:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_garbage_date_is_rejected() {
        assert!(parse_search_date("next friday").is_none());
        assert!(parse_search_date("2025-13-01").is_none());
    }

    #[test]
    fn test_day_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap();
        let window = DepartureWindow::day_from(start);

        assert!(window.contains(start));
        assert!(window.contains(start + Duration::hours(23)));
        assert!(!window.contains(start + Duration::days(1)));
        assert!(!window.contains(start - Duration::seconds(1)));
    }
}
