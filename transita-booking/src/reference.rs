use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, warn};
use transita_core::repository::{BookingRepository, SequenceStore};
use transita_core::rules::BookingRules;
use transita_core::{ReservationError, ReservationResult};

/// Allocates human-readable booking references: `PREFIX + YYYYMMDD + NNN`,
/// 13 characters with the default 2-character prefix.
///
/// The counter store is fast but not durable; the booking store is durable
/// but too slow to be the sole allocator under load. So: optimistic atomic
/// sequence, verified against the durable store, with a timestamp-derived
/// fallback once the attempt budget runs out.
pub struct ReferenceGenerator {
    sequences: Arc<dyn SequenceStore>,
    bookings: Arc<dyn BookingRepository>,
    prefix: String,
    max_attempts: u32,
    counter_ttl_seconds: u64,
}

impl ReferenceGenerator {
    pub fn new(
        sequences: Arc<dyn SequenceStore>,
        bookings: Arc<dyn BookingRepository>,
        rules: &BookingRules,
    ) -> Self {
        Self {
            sequences,
            bookings,
            prefix: rules.reference_prefix.clone(),
            max_attempts: rules.reference_max_attempts,
            counter_ttl_seconds: rules.counter_ttl_seconds,
        }
    }

    pub async fn next_reference(&self) -> ReservationResult<String> {
        self.next_reference_at(Utc::now()).await
    }

    /// Allocation pinned to an explicit clock reading. `next_reference` passes
    /// the current time.
    pub async fn next_reference_at(&self, now: DateTime<Utc>) -> ReservationResult<String> {
        let date_key = date_key(now);

        for attempt in 1..=self.max_attempts {
            let sequence = self
                .sequences
                .next_in_sequence(&date_key, self.counter_ttl_seconds)
                .await
                .map_err(ReservationError::Persistence)?;
            let candidate = format_reference(&self.prefix, &date_key, sequence);

            // The counter can restart (data loss, flush); the durable store
            // keeps the final word on uniqueness.
            if !self
                .bookings
                .reference_exists(&candidate)
                .await
                .map_err(ReservationError::Persistence)?
            {
                return Ok(candidate);
            }
            warn!(
                "Booking reference {} already taken (attempt {}/{})",
                candidate, attempt, self.max_attempts
            );
        }

        // Sequence budget exhausted. Derive the suffix from the clock instead:
        // same format and length, no longer a contiguous sequence.
        let fallback = format_reference(
            &self.prefix,
            &date_key,
            (now.timestamp_millis() % 1000) as u64,
        );
        match self
            .bookings
            .reference_exists(&fallback)
            .await
            .map_err(ReservationError::Persistence)?
        {
            false => Ok(fallback),
            true => {
                error!(
                    "Booking reference space exhausted for {}; fallback {} also taken",
                    date_key, fallback
                );
                Err(ReservationError::ReferenceExhausted)
            }
        }
    }
}

pub(crate) fn date_key(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

pub(crate) fn format_reference(prefix: &str, date_key: &str, sequence: u64) -> String {
    format!("{}{}{:03}", prefix, date_key, sequence)
}
