use serde::Serialize;
use transita_core::booking::{BookingStatus, PaymentStatus};

/// A refund bracket keyed by hours remaining before departure. Brackets are
/// `[min_hours, next_min_hours)`; the table is ordered and the first match
/// wins.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationTier {
    pub name: &'static str,
    pub min_hours: f64,
    pub refund_percent: u32,
    pub flat_fee: i64,
}

pub const CANCELLATION_TIERS: [CancellationTier; 5] = [
    CancellationTier {
        name: "full_refund",
        min_hours: 48.0,
        refund_percent: 100,
        flat_fee: 0,
    },
    CancellationTier {
        name: "standard",
        min_hours: 24.0,
        refund_percent: 80,
        flat_fee: 5_000,
    },
    CancellationTier {
        name: "late",
        min_hours: 6.0,
        refund_percent: 50,
        flat_fee: 10_000,
    },
    CancellationTier {
        name: "very_late",
        min_hours: 2.0,
        refund_percent: 20,
        flat_fee: 15_000,
    },
    CancellationTier {
        name: "no_refund",
        min_hours: 0.0,
        refund_percent: 0,
        flat_fee: 0,
    },
];

/// Outcome of a cancellation evaluation. A disallowed request is a normal
/// negative business result, not an error; `reason` carries the
/// human-readable explanation either way.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationAssessment {
    pub allowed: bool,
    pub tier: Option<&'static str>,
    pub refund_percent: u32,
    pub cancellation_fee: i64,
    pub refund_amount: i64,
    pub total_refund: i64,
    pub reason: Option<String>,
}

impl CancellationAssessment {
    fn rejected(reason: &str) -> Self {
        Self {
            allowed: false,
            tier: None,
            refund_percent: 0,
            cancellation_fee: 0,
            refund_amount: 0,
            total_refund: 0,
            reason: Some(reason.to_string()),
        }
    }
}

/// Stateless, deterministic fee/refund rules. No I/O; callers supply the
/// booking state and the elapsed-time input.
pub struct CancellationPolicy;

impl CancellationPolicy {
    /// `refundable_amount` is the booking subtotal: the service fee is never
    /// refunded.
    pub fn evaluate(
        status: &BookingStatus,
        payment_status: &PaymentStatus,
        refundable_amount: i64,
        hours_until_departure: f64,
    ) -> CancellationAssessment {
        match status {
            BookingStatus::Cancelled => {
                return CancellationAssessment::rejected("booking is already cancelled")
            }
            BookingStatus::Completed => {
                return CancellationAssessment::rejected("booking is already completed")
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        if hours_until_departure < 0.0 {
            return CancellationAssessment::rejected("trip has already departed");
        }

        let last = &CANCELLATION_TIERS[CANCELLATION_TIERS.len() - 1];
        let tier = CANCELLATION_TIERS
            .iter()
            .find(|t| hours_until_departure >= t.min_hours)
            .unwrap_or(last);

        if *payment_status != PaymentStatus::Paid {
            // Cancellation itself is permitted; there is just nothing to refund.
            return CancellationAssessment {
                allowed: true,
                tier: Some(tier.name),
                refund_percent: tier.refund_percent,
                cancellation_fee: 0,
                refund_amount: 0,
                total_refund: 0,
                reason: Some("booking has not been paid; no refund applies".to_string()),
            };
        }

        let refund_amount = refundable_amount * tier.refund_percent as i64 / 100;
        let total_refund = (refund_amount - tier.flat_fee).max(0);

        CancellationAssessment {
            allowed: true,
            tier: Some(tier.name),
            refund_percent: tier.refund_percent,
            cancellation_fee: tier.flat_fee,
            refund_amount,
            total_refund,
            reason: None,
        }
    }
}
