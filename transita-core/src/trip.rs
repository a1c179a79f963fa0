use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only view of a trip. The trip lifecycle itself (scheduling, departure,
/// completion) belongs to the fleet service; the reservation core only needs
/// the departure time to drive the cancellation and modification tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub route: String,
    pub departure_time: DateTime<Utc>,
}

impl Trip {
    /// Fractional hours between `now` and departure. Negative once the trip
    /// has departed.
    pub fn hours_until_departure(&self, now: DateTime<Utc>) -> f64 {
        (self.departure_time - now).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_time <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hours_until_departure_is_fractional() {
        let now = Utc::now();
        let trip = Trip {
            id: Uuid::new_v4(),
            route: "Saigon - Da Lat".to_string(),
            departure_time: now + Duration::minutes(90),
        };
        let hours = trip.hours_until_departure(now);
        assert!((hours - 1.5).abs() < 1e-9);
        assert!(!trip.has_departed(now));
    }

    #[test]
    fn departed_trips_report_negative_hours() {
        let now = Utc::now();
        let trip = Trip {
            id: Uuid::new_v4(),
            route: "Hanoi - Sapa".to_string(),
            departure_time: now - Duration::hours(2),
        };
        assert!(trip.hours_until_departure(now) < 0.0);
        assert!(trip.has_departed(now));
    }
}
