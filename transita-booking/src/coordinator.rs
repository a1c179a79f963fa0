use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};
use transita_core::booking::{
    Booking, BookingModifications, BookingStatus, CreateBookingRequest, PassengerTicket,
    PaymentStatus, TicketStatus,
};
use transita_core::repository::{
    BookingRepository, SeatLockStore, SequenceStore, TicketGenerator, TripRepository,
};
use transita_core::rules::BookingRules;
use transita_core::trip::Trip;
use transita_core::{ReservationError, ReservationResult};
use transita_policy::{
    CancellationAssessment, CancellationPolicy, ModificationAssessment, ModificationPolicy,
};
use transita_shared::events::{BookingCancelledEvent, BookingConfirmedEvent};
use transita_shared::Masked;
use uuid::Uuid;

use crate::locks::{AcquireOutcome, SeatLockManager};
use crate::reference::ReferenceGenerator;
use crate::tickets::TicketPipeline;

/// The only component allowed to create a booking. A successful return means
/// the seats were free, are now held, and the booking is durably recorded; a
/// failure leaves no residual lock behind.
pub struct BookingCoordinator {
    locks: SeatLockManager,
    references: ReferenceGenerator,
    bookings: Arc<dyn BookingRepository>,
    trips: Arc<dyn TripRepository>,
    tickets: TicketPipeline,
    rules: BookingRules,
}

impl BookingCoordinator {
    pub fn new(
        lock_store: Arc<dyn SeatLockStore>,
        sequences: Arc<dyn SequenceStore>,
        bookings: Arc<dyn BookingRepository>,
        trips: Arc<dyn TripRepository>,
        ticket_generator: Arc<dyn TicketGenerator>,
        rules: BookingRules,
    ) -> Self {
        let tickets = TicketPipeline::start(
            ticket_generator,
            bookings.clone(),
            rules.ticket_retry_attempts,
            rules.ticket_retry_delay_ms,
        );
        Self {
            locks: SeatLockManager::new(lock_store),
            references: ReferenceGenerator::new(sequences, bookings.clone(), &rules),
            bookings,
            trips,
            tickets,
            rules,
        }
    }

    /// Creates a booking in `pending`/`unpaid`: durable availability read,
    /// advisory lock pre-check, batch acquire, reference allocation, then one
    /// durable transaction for the booking and its passenger tickets. Every
    /// failure after the acquire releases the locks before propagating.
    pub async fn create_booking(&self, req: CreateBookingRequest) -> ReservationResult<Booking> {
        validate_request(&req)?;
        let seat_codes: Vec<String> =
            req.passengers.iter().map(|p| p.seat_code.clone()).collect();

        let now = Utc::now();
        let trip = self.load_trip(req.trip_id).await?;
        if trip.has_departed(now) {
            return Err(ReservationError::Validation(
                "trip has already departed".to_string(),
            ));
        }

        // Durable occupancy is authoritative for booked seats.
        let booked = self
            .bookings
            .find_booked_seats(req.trip_id, &seat_codes, None)
            .await
            .map_err(ReservationError::Persistence)?;
        if !booked.is_empty() {
            return Err(ReservationError::SeatsAlreadyBooked { seats: booked });
        }

        // Advisory pre-check. Saves the acquire round-trips on the common
        // conflict, nothing more; the acquire below is the real gate.
        let held = self
            .locks
            .locked_seats(req.trip_id, &seat_codes)
            .await
            .map_err(ReservationError::Persistence)?;
        if !held.is_empty() {
            return Err(ReservationError::SeatsCurrentlyLocked { seats: held });
        }

        let holder = Uuid::new_v4().to_string();
        match self
            .locks
            .acquire(
                req.trip_id,
                &seat_codes,
                &holder,
                self.rules.seat_hold_seconds,
            )
            .await
            .map_err(ReservationError::Persistence)?
        {
            AcquireOutcome::Acquired { .. } => {}
            AcquireOutcome::Conflict { holders } => {
                let mut seats: Vec<String> = holders.into_keys().collect();
                seats.sort();
                return Err(ReservationError::SeatsCurrentlyLocked { seats });
            }
        }

        match self.persist_new_booking(&req, now).await {
            Ok(booking) => {
                info!(
                    "Booking {} created on trip {} holding {} seat(s) for {}s (contact {:?})",
                    booking.reference,
                    booking.trip_id,
                    booking.passengers.len(),
                    self.rules.seat_hold_seconds,
                    booking.contact_email
                );
                Ok(booking)
            }
            Err(e) => {
                // The hold must never outlive a failed durable write.
                if let Err(release_err) = self.locks.release(req.trip_id, &seat_codes).await {
                    error!(
                        "Failed to release seat locks after aborted booking on trip {}: {}",
                        req.trip_id, release_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn persist_new_booking(
        &self,
        req: &CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> ReservationResult<Booking> {
        let service_fee = req.total_price * self.rules.service_fee_percent as i64 / 100;
        let subtotal = req.total_price - service_fee;
        let reference = self.references.next_reference_at(now).await?;

        let booking_id = Uuid::new_v4();
        let passengers: Vec<PassengerTicket> = req
            .passengers
            .iter()
            .map(|p| PassengerTicket {
                id: Uuid::new_v4(),
                booking_id,
                full_name: p.full_name.clone(),
                document_id: p.document_id.clone(),
                phone: p.phone.clone().map(Masked),
                seat_code: p.seat_code.clone(),
                price: p.price,
                status: TicketStatus::Active,
            })
            .collect();

        let booking = Booking {
            id: booking_id,
            reference,
            trip_id: req.trip_id,
            user_id: req.user_id,
            contact_email: req.contact_email.clone(),
            contact_phone: req.contact_phone.clone(),
            subtotal,
            service_fee,
            total_price: req.total_price,
            payment_method: req.payment_method.clone(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            locked_until: now + Duration::seconds(self.rules.seat_hold_seconds as i64),
            ticket_url: None,
            qr_code: None,
            refund_amount: None,
            paid_at: None,
            cancelled_at: None,
            passengers,
            created_at: now,
            updated_at: now,
        };

        self.bookings
            .insert_booking(&booking)
            .await
            .map_err(ReservationError::Persistence)?;
        Ok(booking)
    }

    /// Transitions to `confirmed`/`paid` and queues ticket generation.
    /// Idempotent: the upstream payment notifier retries its webhook, so
    /// confirming an already-confirmed booking is a no-op success.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> ReservationResult<Booking> {
        let mut booking = self.load_booking(booking_id).await?;

        match booking.status {
            BookingStatus::Confirmed => {
                if booking.ticket_url.is_none() {
                    // Artifacts never landed; queue another generation pass.
                    self.submit_ticket_job(&booking);
                }
                return Ok(booking);
            }
            BookingStatus::Cancelled => {
                return Err(ReservationError::PolicyRejection {
                    reason: "booking has been cancelled".to_string(),
                })
            }
            BookingStatus::Completed => {
                return Err(ReservationError::PolicyRejection {
                    reason: "booking is already completed".to_string(),
                })
            }
            BookingStatus::Pending => {}
        }

        let paid_at = Utc::now();
        self.bookings
            .mark_confirmed(booking_id, paid_at)
            .await
            .map_err(ReservationError::Persistence)?;

        booking.status = BookingStatus::Confirmed;
        booking.payment_status = PaymentStatus::Paid;
        booking.paid_at = Some(paid_at);
        booking.updated_at = paid_at;

        info!("Booking {} confirmed", booking.reference);
        self.submit_ticket_job(&booking);
        Ok(booking)
    }

    fn submit_ticket_job(&self, booking: &Booking) {
        self.tickets.submit(BookingConfirmedEvent {
            booking_id: booking.id,
            booking_reference: booking.reference.clone(),
            confirmed_at: booking.paid_at.unwrap_or(booking.updated_at).timestamp(),
        });
    }

    pub async fn cancellation_preview(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> ReservationResult<CancellationAssessment> {
        let (booking, trip) = self.load_booking_with_trip(booking_id).await?;
        Ok(CancellationPolicy::evaluate(
            &booking.status,
            &booking.payment_status,
            booking.subtotal,
            trip.hours_until_departure(now),
        ))
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> ReservationResult<Booking> {
        let (mut booking, trip) = self.load_booking_with_trip(booking_id).await?;

        let assessment = CancellationPolicy::evaluate(
            &booking.status,
            &booking.payment_status,
            booking.subtotal,
            trip.hours_until_departure(now),
        );
        if !assessment.allowed {
            return Err(ReservationError::PolicyRejection {
                reason: assessment
                    .reason
                    .unwrap_or_else(|| "cancellation is not permitted".to_string()),
            });
        }

        let refunded =
            booking.payment_status == PaymentStatus::Paid && assessment.total_refund > 0;
        self.bookings
            .mark_cancelled(booking_id, now, assessment.total_refund, refunded)
            .await
            .map_err(ReservationError::Persistence)?;

        // Holds are advisory; release is an unconditional delete and expired
        // keys make it a no-op.
        let seats = booking.seat_codes();
        if let Err(e) = self.locks.release(booking.trip_id, &seats).await {
            error!(
                "Failed to release seat holds for cancelled booking {}: {}",
                booking.reference, e
            );
        }

        booking.status = BookingStatus::Cancelled;
        if refunded {
            booking.payment_status = PaymentStatus::Refunded;
        }
        for ticket in &mut booking.passengers {
            ticket.status = TicketStatus::Cancelled;
        }
        booking.refund_amount = Some(assessment.total_refund);
        booking.cancelled_at = Some(now);
        booking.updated_at = now;

        let event = BookingCancelledEvent {
            booking_id: booking.id,
            booking_reference: booking.reference.clone(),
            refund_amount: assessment.total_refund,
            cancelled_at: now.timestamp(),
        };
        info!(event = ?event, "Booking cancelled");
        Ok(booking)
    }

    pub async fn modification_preview(
        &self,
        booking_id: Uuid,
        modifications: &BookingModifications,
        now: DateTime<Utc>,
    ) -> ReservationResult<ModificationAssessment> {
        let (booking, trip) = self.load_booking_with_trip(booking_id).await?;
        Ok(ModificationPolicy::evaluate(
            &booking.status,
            trip.hours_until_departure(now),
            modifications.seat_changes.len(),
            modifications.passenger_updates.len(),
        ))
    }

    /// Applies seat reassignments and passenger detail updates. Target seats
    /// go through the same availability-check-then-acquire protocol as
    /// creation; once the durable rewrite lands, both the vacated seats and
    /// the transient target holds are released.
    pub async fn modify_booking(
        &self,
        booking_id: Uuid,
        modifications: BookingModifications,
        now: DateTime<Utc>,
    ) -> ReservationResult<Booking> {
        if modifications.is_empty() {
            return Err(ReservationError::Validation(
                "no modifications requested".to_string(),
            ));
        }

        let (booking, trip) = self.load_booking_with_trip(booking_id).await?;

        let assessment = ModificationPolicy::evaluate(
            &booking.status,
            trip.hours_until_departure(now),
            modifications.seat_changes.len(),
            modifications.passenger_updates.len(),
        );
        if !assessment.allowed {
            return Err(ReservationError::PolicyRejection {
                reason: assessment
                    .reason
                    .unwrap_or_else(|| "modification is not permitted".to_string()),
            });
        }

        let (target_seats, vacated_seats) =
            validate_modifications(&booking, &modifications)?;

        if !target_seats.is_empty() {
            let booked = self
                .bookings
                .find_booked_seats(booking.trip_id, &target_seats, Some(booking.id))
                .await
                .map_err(ReservationError::Persistence)?;
            if !booked.is_empty() {
                return Err(ReservationError::SeatsAlreadyBooked { seats: booked });
            }

            let holder = Uuid::new_v4().to_string();
            match self
                .locks
                .acquire(
                    booking.trip_id,
                    &target_seats,
                    &holder,
                    self.rules.seat_hold_seconds,
                )
                .await
                .map_err(ReservationError::Persistence)?
            {
                AcquireOutcome::Acquired { .. } => {}
                AcquireOutcome::Conflict { holders } => {
                    let mut seats: Vec<String> = holders.into_keys().collect();
                    seats.sort();
                    return Err(ReservationError::SeatsCurrentlyLocked { seats });
                }
            }
        }

        if let Err(e) = self
            .bookings
            .apply_modifications(
                booking_id,
                &modifications.seat_changes,
                &modifications.passenger_updates,
            )
            .await
        {
            if !target_seats.is_empty() {
                if let Err(release_err) =
                    self.locks.release(booking.trip_id, &target_seats).await
                {
                    error!(
                        "Failed to release target seat locks after aborted modification of {}: {}",
                        booking.reference, release_err
                    );
                }
            }
            return Err(ReservationError::Persistence(e));
        }

        // The durable rows are authoritative now; drop every advisory hold
        // this operation touched.
        let mut to_release = target_seats;
        to_release.extend(vacated_seats);
        if !to_release.is_empty() {
            if let Err(e) = self.locks.release(booking.trip_id, &to_release).await {
                error!(
                    "Failed to release seat holds after modifying {}: {}",
                    booking.reference, e
                );
            }
        }

        info!(
            "Booking {} modified ({} seat change(s), {} passenger update(s), fee {})",
            booking.reference,
            modifications.seat_changes.len(),
            modifications.passenger_updates.len(),
            assessment.modification_fee
        );
        self.load_booking(booking_id).await
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> ReservationResult<Booking> {
        self.load_booking(booking_id).await
    }

    pub async fn get_booking_by_reference(&self, reference: &str) -> ReservationResult<Booking> {
        self.bookings
            .find_by_reference(reference)
            .await
            .map_err(ReservationError::Persistence)?
            .ok_or_else(|| ReservationError::NotFound(format!("booking {}", reference)))
    }

    pub async fn list_bookings_for_user(&self, user_id: Uuid) -> ReservationResult<Vec<Booking>> {
        self.bookings
            .list_for_user(user_id)
            .await
            .map_err(ReservationError::Persistence)
    }

    async fn load_booking(&self, booking_id: Uuid) -> ReservationResult<Booking> {
        self.bookings
            .find_booking(booking_id)
            .await
            .map_err(ReservationError::Persistence)?
            .ok_or_else(|| ReservationError::NotFound(format!("booking {}", booking_id)))
    }

    async fn load_trip(&self, trip_id: Uuid) -> ReservationResult<Trip> {
        self.trips
            .find_trip(trip_id)
            .await
            .map_err(ReservationError::Persistence)?
            .ok_or_else(|| ReservationError::NotFound(format!("trip {}", trip_id)))
    }

    async fn load_booking_with_trip(
        &self,
        booking_id: Uuid,
    ) -> ReservationResult<(Booking, Trip)> {
        let booking = self.load_booking(booking_id).await?;
        let trip = self.load_trip(booking.trip_id).await?;
        Ok((booking, trip))
    }
}

fn validate_request(req: &CreateBookingRequest) -> ReservationResult<()> {
    if req.passengers.is_empty() {
        return Err(ReservationError::Validation(
            "a booking needs at least one passenger".to_string(),
        ));
    }
    if req.total_price <= 0 {
        return Err(ReservationError::Validation(
            "total price must be positive".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for passenger in &req.passengers {
        let seat = passenger.seat_code.trim();
        if seat.is_empty() {
            return Err(ReservationError::Validation(
                "every passenger needs a seat code".to_string(),
            ));
        }
        if !seen.insert(seat.to_string()) {
            return Err(ReservationError::Validation(format!(
                "seat {} selected more than once",
                seat
            )));
        }
        if passenger.full_name.trim().is_empty() {
            return Err(ReservationError::Validation(
                "every passenger needs a name".to_string(),
            ));
        }
    }
    Ok(())
}

/// Checks every referenced ticket belongs to the booking and works out which
/// seats the change set acquires and vacates.
fn validate_modifications(
    booking: &Booking,
    modifications: &BookingModifications,
) -> ReservationResult<(Vec<String>, Vec<String>)> {
    let current_seats: HashSet<String> = booking.seat_codes().into_iter().collect();
    let mut target_seats = Vec::new();
    let mut vacated_seats = Vec::new();
    let mut seen_targets = HashSet::new();

    for change in &modifications.seat_changes {
        let ticket = booking
            .ticket(change.ticket_id)
            .ok_or_else(|| ReservationError::NotFound(format!("ticket {}", change.ticket_id)))?;

        let target = change.new_seat_code.trim();
        if target.is_empty() {
            return Err(ReservationError::Validation(
                "target seat code cannot be empty".to_string(),
            ));
        }
        if current_seats.contains(target) {
            return Err(ReservationError::Validation(format!(
                "seat {} is already assigned to this booking",
                target
            )));
        }
        if !seen_targets.insert(target.to_string()) {
            return Err(ReservationError::Validation(format!(
                "seat {} targeted more than once",
                target
            )));
        }
        target_seats.push(target.to_string());
        vacated_seats.push(ticket.seat_code.clone());
    }

    for update in &modifications.passenger_updates {
        if booking.ticket(update.ticket_id).is_none() {
            return Err(ReservationError::NotFound(format!(
                "ticket {}",
                update.ticket_id
            )));
        }
    }

    Ok((target_seats, vacated_seats))
}
