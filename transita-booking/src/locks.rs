use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use transita_core::repository::{SeatLockStore, StoreError};
use uuid::Uuid;

/// Result of a batch acquisition attempt.
#[derive(Debug)]
pub enum AcquireOutcome {
    /// Every requested seat is now held under `holder`.
    Acquired { holder: String },
    /// At least one seat was already held. Any seats this call did acquire
    /// have been released again before the outcome is returned, so the caller
    /// never owns a partial lock set.
    Conflict { holders: HashMap<String, String> },
}

/// Short-lived, per-seat mutual exclusion. All state lives in the expiring
/// lock store; this type only drives the batch protocol around it.
pub struct SeatLockManager {
    store: Arc<dyn SeatLockStore>,
}

impl SeatLockManager {
    pub fn new(store: Arc<dyn SeatLockStore>) -> Self {
        Self { store }
    }

    /// Attempts to lock every seat in the batch. Per-seat operations are
    /// independent rather than one multi-key transaction, so the first
    /// already-held seat aborts the batch and triggers a compensating release
    /// of whatever was taken.
    pub async fn acquire(
        &self,
        trip_id: Uuid,
        seat_codes: &[String],
        holder: &str,
        ttl_seconds: u64,
    ) -> Result<AcquireOutcome, StoreError> {
        let mut taken: Vec<String> = Vec::with_capacity(seat_codes.len());

        for seat in seat_codes {
            match self
                .store
                .try_lock_seat(trip_id, seat, holder, ttl_seconds)
                .await
            {
                Ok(true) => taken.push(seat.clone()),
                Ok(false) => {
                    self.rollback(trip_id, &taken).await;
                    let existing = self
                        .store
                        .seat_lock_holder(trip_id, seat)
                        .await
                        .unwrap_or(None);
                    let mut holders = HashMap::new();
                    holders.insert(
                        seat.clone(),
                        // The key can expire between the failed set and this
                        // read; report what is known.
                        existing.unwrap_or_else(|| "expired".to_string()),
                    );
                    warn!(
                        "Seat lock conflict on trip {}: seat {} already held",
                        trip_id, seat
                    );
                    return Ok(AcquireOutcome::Conflict { holders });
                }
                Err(e) => {
                    self.rollback(trip_id, &taken).await;
                    return Err(e);
                }
            }
        }

        info!(
            "Locked {} seat(s) on trip {} for {}s",
            seat_codes.len(),
            trip_id,
            ttl_seconds
        );
        Ok(AcquireOutcome::Acquired {
            holder: holder.to_string(),
        })
    }

    /// Existence pre-check used to report "currently held" before an acquire
    /// attempt. Advisory only: a seat can be taken between this read and the
    /// acquire, which the acquire conflict path then catches.
    pub async fn locked_seats(
        &self,
        trip_id: Uuid,
        seat_codes: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let mut locked = Vec::new();
        for seat in seat_codes {
            if self.store.is_seat_locked(trip_id, seat).await? {
                locked.push(seat.clone());
            }
        }
        Ok(locked)
    }

    pub async fn is_locked(
        &self,
        trip_id: Uuid,
        seat_codes: &[String],
    ) -> Result<HashMap<String, bool>, StoreError> {
        let mut map = HashMap::with_capacity(seat_codes.len());
        for seat in seat_codes {
            map.insert(
                seat.clone(),
                self.store.is_seat_locked(trip_id, seat).await?,
            );
        }
        Ok(map)
    }

    pub async fn holder_of(
        &self,
        trip_id: Uuid,
        seat_code: &str,
    ) -> Result<Option<String>, StoreError> {
        self.store.seat_lock_holder(trip_id, seat_code).await
    }

    /// Unconditional delete; releasing seats that were never locked or whose
    /// holds already expired is a no-op.
    pub async fn release(&self, trip_id: Uuid, seat_codes: &[String]) -> Result<(), StoreError> {
        self.store.release_seats(trip_id, seat_codes).await
    }

    async fn rollback(&self, trip_id: Uuid, taken: &[String]) {
        if taken.is_empty() {
            return;
        }
        if let Err(e) = self.store.release_seats(trip_id, taken).await {
            // The hold TTL bounds how long these stay stuck.
            error!(
                "Failed to roll back {} partial seat lock(s) on trip {}: {}",
                taken.len(),
                trip_id,
                e
            );
        }
    }
}
