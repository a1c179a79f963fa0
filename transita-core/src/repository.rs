use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, PassengerUpdate, SeatChange};
use crate::trip::Trip;

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Advisory, self-expiring mutual exclusion over (trip, seat) pairs, backed by
/// a shared expiring key-value store so correctness holds across service
/// instances, not just threads.
#[async_trait]
pub trait SeatLockStore: Send + Sync {
    /// Set-if-absent with expiry. Returns true when this call took the lock,
    /// false when some holder already has it. The atomic set is the only
    /// serialization point for a seat.
    async fn try_lock_seat(
        &self,
        trip_id: Uuid,
        seat_code: &str,
        holder: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError>;

    /// Current holder token, if the seat is held. Lets callers distinguish
    /// "held by someone else" from "I already hold it".
    async fn seat_lock_holder(
        &self,
        trip_id: Uuid,
        seat_code: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn is_seat_locked(&self, trip_id: Uuid, seat_code: &str) -> Result<bool, StoreError>;

    /// Unconditional delete. Releasing an expired or absent key is a no-op.
    async fn release_seats(&self, trip_id: Uuid, seat_codes: &[String]) -> Result<(), StoreError>;
}

/// Day-scoped atomic counters for booking reference allocation.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically increments the counter for `date_key`, applying `ttl_seconds`
    /// when the counter is fresh so stale days garbage-collect themselves.
    async fn next_in_sequence(&self, date_key: &str, ttl_seconds: u64)
        -> Result<u64, StoreError>;
}

/// The durable system of record for bookings and their passenger tickets.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Seats among `seat_codes` already attached to a non-cancelled booking on
    /// the trip. `exclude_booking` lets modification flows ignore the booking
    /// being modified.
    async fn find_booked_seats(
        &self,
        trip_id: Uuid,
        seat_codes: &[String],
        exclude_booking: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError>;

    async fn reference_exists(&self, reference: &str) -> Result<bool, StoreError>;

    /// Inserts the booking row and all passenger ticket rows in one
    /// transaction.
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Booking>, StoreError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    async fn mark_confirmed(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn mark_cancelled(
        &self,
        id: Uuid,
        cancelled_at: DateTime<Utc>,
        refund_amount: i64,
        refunded: bool,
    ) -> Result<(), StoreError>;

    /// Applies seat reassignments and passenger detail updates in one
    /// transaction.
    async fn apply_modifications(
        &self,
        id: Uuid,
        seat_changes: &[SeatChange],
        passenger_updates: &[PassengerUpdate],
    ) -> Result<(), StoreError>;

    async fn set_ticket_artifacts(
        &self,
        id: Uuid,
        ticket_url: &str,
        qr_code: &str,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn find_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct TicketArtifacts {
    pub ticket_url: String,
    pub qr_code: String,
}

/// Downstream ticket rendering pipeline. Invoked fire-and-forget after
/// confirmation; retries and backoff are the caller's concern.
#[async_trait]
pub trait TicketGenerator: Send + Sync {
    async fn generate(&self, booking_id: Uuid) -> Result<TicketArtifacts, StoreError>;
}
