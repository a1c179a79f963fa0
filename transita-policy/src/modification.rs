use serde::Serialize;
use transita_core::booking::BookingStatus;

/// Modification bracket. Same `[min_hours, next)` shape as the cancellation
/// table, but tracks two independent permission flags plus a base fee and a
/// per-seat-change fee.
#[derive(Debug, Clone, Serialize)]
pub struct ModificationTier {
    pub name: &'static str,
    pub min_hours: f64,
    pub allow_seat_change: bool,
    pub allow_passenger_update: bool,
    pub base_fee: i64,
    pub per_seat_fee: i64,
}

pub const MODIFICATION_TIERS: [ModificationTier; 4] = [
    ModificationTier {
        name: "flexible",
        min_hours: 48.0,
        allow_seat_change: true,
        allow_passenger_update: true,
        base_fee: 0,
        per_seat_fee: 0,
    },
    ModificationTier {
        name: "standard",
        min_hours: 24.0,
        allow_seat_change: true,
        allow_passenger_update: true,
        base_fee: 10_000,
        per_seat_fee: 5_000,
    },
    ModificationTier {
        name: "late",
        min_hours: 6.0,
        allow_seat_change: true,
        allow_passenger_update: true,
        base_fee: 15_000,
        per_seat_fee: 10_000,
    },
    ModificationTier {
        name: "restricted",
        min_hours: 2.0,
        allow_seat_change: false,
        allow_passenger_update: true,
        base_fee: 20_000,
        per_seat_fee: 0,
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct ModificationAssessment {
    pub allowed: bool,
    pub tier: Option<&'static str>,
    pub allow_seat_change: bool,
    pub allow_passenger_update: bool,
    pub modification_fee: i64,
    pub reason: Option<String>,
}

impl ModificationAssessment {
    fn rejected(reason: &str) -> Self {
        Self {
            allowed: false,
            tier: None,
            allow_seat_change: false,
            allow_passenger_update: false,
            modification_fee: 0,
            reason: Some(reason.to_string()),
        }
    }
}

pub struct ModificationPolicy;

impl ModificationPolicy {
    pub fn evaluate(
        status: &BookingStatus,
        hours_until_departure: f64,
        seat_changes: usize,
        passenger_updates: usize,
    ) -> ModificationAssessment {
        match status {
            BookingStatus::Cancelled => {
                return ModificationAssessment::rejected("booking is already cancelled")
            }
            BookingStatus::Completed => {
                return ModificationAssessment::rejected("booking is already completed")
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        if hours_until_departure < 0.0 {
            return ModificationAssessment::rejected("trip has already departed");
        }
        if hours_until_departure < 2.0 {
            return ModificationAssessment::rejected(
                "changes are closed within 2 hours of departure",
            );
        }

        let last = &MODIFICATION_TIERS[MODIFICATION_TIERS.len() - 1];
        let tier = MODIFICATION_TIERS
            .iter()
            .find(|t| hours_until_departure >= t.min_hours)
            .unwrap_or(last);

        if seat_changes > 0 && !tier.allow_seat_change {
            return ModificationAssessment {
                allowed: false,
                tier: Some(tier.name),
                allow_seat_change: tier.allow_seat_change,
                allow_passenger_update: tier.allow_passenger_update,
                modification_fee: 0,
                reason: Some(format!(
                    "seat changes are closed within {} hours of departure",
                    MODIFICATION_TIERS[MODIFICATION_TIERS.len() - 2].min_hours
                )),
            };
        }

        if passenger_updates > 0 && !tier.allow_passenger_update {
            return ModificationAssessment {
                allowed: false,
                tier: Some(tier.name),
                allow_seat_change: tier.allow_seat_change,
                allow_passenger_update: tier.allow_passenger_update,
                modification_fee: 0,
                reason: Some("passenger updates are closed for this departure".to_string()),
            };
        }

        let modification_fee = tier.base_fee + tier.per_seat_fee * seat_changes as i64;

        ModificationAssessment {
            allowed: true,
            tier: Some(tier.name),
            allow_seat_change: tier.allow_seat_change,
            allow_passenger_update: tier.allow_passenger_update,
            modification_fee,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed(hours: f64, seat_changes: usize, passenger_updates: usize) -> ModificationAssessment {
        ModificationPolicy::evaluate(
            &BookingStatus::Confirmed,
            hours,
            seat_changes,
            passenger_updates,
        )
    }

    #[test]
    fn flexible_window_is_free() {
        let result = confirmed(72.0, 2, 1);
        assert!(result.allowed);
        assert_eq!(result.tier, Some("flexible"));
        assert_eq!(result.modification_fee, 0);
    }

    #[test]
    fn seat_change_fees_sum_linearly() {
        let one = confirmed(30.0, 1, 0);
        let three = confirmed(30.0, 3, 0);
        assert_eq!(one.modification_fee, 15_000);
        assert_eq!(three.modification_fee, 25_000);
        assert_eq!(
            three.modification_fee - one.modification_fee,
            2 * 5_000
        );
    }

    #[test]
    fn late_window_charges_more_per_seat() {
        let result = confirmed(12.0, 2, 0);
        assert_eq!(result.tier, Some("late"));
        assert_eq!(result.modification_fee, 15_000 + 2 * 10_000);
    }

    #[test]
    fn restricted_window_blocks_seat_changes_but_not_passenger_updates() {
        let seats = confirmed(3.0, 1, 0);
        assert!(!seats.allowed);
        assert!(seats.reason.is_some());

        let passengers = confirmed(3.0, 0, 2);
        assert!(passengers.allowed);
        assert_eq!(passengers.tier, Some("restricted"));
        assert_eq!(passengers.modification_fee, 20_000);
        assert!(!passengers.allow_seat_change);
        assert!(passengers.allow_passenger_update);
    }

    #[test]
    fn everything_is_rejected_below_2_hours() {
        let result = confirmed(1.999, 0, 1);
        assert!(!result.allowed);
        assert!(!result.allow_seat_change);
        assert!(!result.allow_passenger_update);
    }

    #[test]
    fn boundary_at_exactly_2_hours_is_restricted_not_closed() {
        let result = confirmed(2.0, 0, 1);
        assert!(result.allowed);
        assert_eq!(result.tier, Some("restricted"));
    }

    #[test]
    fn departed_and_terminal_bookings_are_rejected() {
        assert!(!confirmed(-1.0, 0, 1).allowed);
        let cancelled =
            ModificationPolicy::evaluate(&BookingStatus::Cancelled, 72.0, 1, 0);
        assert!(!cancelled.allowed);
    }
}
