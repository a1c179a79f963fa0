use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use transita_core::booking::{
    Booking, BookingStatus, PassengerTicket, PassengerUpdate, PaymentStatus, SeatChange,
    TicketStatus,
};
use transita_core::repository::{BookingRepository, StoreError, TripRepository};
use transita_core::trip::Trip;
use transita_shared::Masked;
use uuid::Uuid;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    trip_id: Uuid,
    user_id: Option<Uuid>,
    contact_email: String,
    contact_phone: Option<String>,
    subtotal: i64,
    service_fee: i64,
    total_price: i64,
    payment_method: Option<String>,
    status: String,
    payment_status: String,
    locked_until: DateTime<Utc>,
    ticket_url: Option<String>,
    qr_code: Option<String>,
    refund_amount: Option<i64>,
    paid_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    booking_id: Uuid,
    full_name: String,
    document_id: Option<String>,
    phone: Option<String>,
    seat_code: String,
    price: i64,
    status: String,
}

fn into_ticket(row: TicketRow) -> Result<PassengerTicket, StoreError> {
    let status = TicketStatus::parse(&row.status)
        .ok_or_else(|| format!("unknown ticket status {}", row.status))?;
    Ok(PassengerTicket {
        id: row.id,
        booking_id: row.booking_id,
        full_name: row.full_name,
        document_id: row.document_id,
        phone: row.phone.map(Masked),
        seat_code: row.seat_code,
        price: row.price,
        status,
    })
}

fn into_booking(row: BookingRow, tickets: Vec<TicketRow>) -> Result<Booking, StoreError> {
    let status = BookingStatus::parse(&row.status)
        .ok_or_else(|| format!("unknown booking status {}", row.status))?;
    let payment_status = PaymentStatus::parse(&row.payment_status)
        .ok_or_else(|| format!("unknown payment status {}", row.payment_status))?;
    let passengers = tickets
        .into_iter()
        .map(into_ticket)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Booking {
        id: row.id,
        reference: row.reference,
        trip_id: row.trip_id,
        user_id: row.user_id,
        contact_email: Masked(row.contact_email),
        contact_phone: row.contact_phone.map(Masked),
        subtotal: row.subtotal,
        service_fee: row.service_fee,
        total_price: row.total_price,
        payment_method: row.payment_method,
        status,
        payment_status,
        locked_until: row.locked_until,
        ticket_url: row.ticket_url,
        qr_code: row.qr_code,
        refund_amount: row.refund_amount,
        paid_at: row.paid_at,
        cancelled_at: row.cancelled_at,
        passengers,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl PgBookingRepository {
    async fn fetch_booking_row(&self, row: BookingRow) -> Result<Booking, StoreError> {
        let tickets = sqlx::query_as::<_, TicketRow>(
            "SELECT id, booking_id, full_name, document_id, phone, seat_code, price, status
             FROM passenger_tickets WHERE booking_id = $1 ORDER BY seat_code",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        into_booking(row, tickets)
    }
}

const BOOKING_COLUMNS: &str = "id, reference, trip_id, user_id, contact_email, contact_phone, \
     subtotal, service_fee, total_price, payment_method, status, payment_status, locked_until, \
     ticket_url, qr_code, refund_amount, paid_at, cancelled_at, created_at, updated_at";

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find_booked_seats(
        &self,
        trip_id: Uuid,
        seat_codes: &[String],
        exclude_booking: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError> {
        let seats = sqlx::query_scalar::<_, String>(
            "SELECT seat_code FROM passenger_tickets
             WHERE trip_id = $1 AND status = 'ACTIVE' AND seat_code = ANY($2)
               AND ($3::uuid IS NULL OR booking_id <> $3)
             ORDER BY seat_code",
        )
        .bind(trip_id)
        .bind(seat_codes)
        .bind(exclude_booking)
        .fetch_all(&self.pool)
        .await?;
        Ok(seats)
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE reference = $1)",
        )
        .bind(reference)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO bookings (id, reference, trip_id, user_id, contact_email, contact_phone,
                 subtotal, service_fee, total_price, payment_method, status, payment_status,
                 locked_until, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(booking.trip_id)
        .bind(booking.user_id)
        .bind(booking.contact_email.as_inner())
        .bind(booking.contact_phone.as_ref().map(|p| p.as_inner().clone()))
        .bind(booking.subtotal)
        .bind(booking.service_fee)
        .bind(booking.total_price)
        .bind(&booking.payment_method)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.locked_until)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        for ticket in &booking.passengers {
            sqlx::query(
                "INSERT INTO passenger_tickets (id, booking_id, trip_id, full_name, document_id,
                     phone, seat_code, price, status)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(ticket.id)
            .bind(ticket.booking_id)
            .bind(booking.trip_id)
            .bind(&ticket.full_name)
            .bind(&ticket.document_id)
            .bind(ticket.phone.as_ref().map(|p| p.as_inner().clone()))
            .bind(&ticket.seat_code)
            .bind(ticket.price)
            .bind(ticket.status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.fetch_booking_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE reference = $1",
            BOOKING_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.fetch_booking_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut bookings = Vec::with_capacity(rows.len());
        for row in rows {
            bookings.push(self.fetch_booking_row(row).await?);
        }
        Ok(bookings)
    }

    async fn mark_confirmed(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE bookings
             SET status = $2, payment_status = $3, paid_at = $4, updated_at = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(BookingStatus::Confirmed.as_str())
        .bind(PaymentStatus::Paid.as_str())
        .bind(paid_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Err(format!("booking {} not found", id).into());
        }
        Ok(())
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        cancelled_at: DateTime<Utc>,
        refund_amount: i64,
        refunded: bool,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE bookings
             SET status = $2,
                 payment_status = CASE WHEN $5 THEN $6 ELSE payment_status END,
                 refund_amount = $4, cancelled_at = $3, updated_at = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(BookingStatus::Cancelled.as_str())
        .bind(cancelled_at)
        .bind(refund_amount)
        .bind(refunded)
        .bind(PaymentStatus::Refunded.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(format!("booking {} not found", id).into());
        }

        // Ticket rows stay behind as history; flipping their status frees the
        // seats for the occupancy check and the partial unique index.
        sqlx::query("UPDATE passenger_tickets SET status = $2 WHERE booking_id = $1")
            .bind(id)
            .bind(TicketStatus::Cancelled.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn apply_modifications(
        &self,
        id: Uuid,
        seat_changes: &[SeatChange],
        passenger_updates: &[PassengerUpdate],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for change in seat_changes {
            let result = sqlx::query(
                "UPDATE passenger_tickets SET seat_code = $3
                 WHERE id = $2 AND booking_id = $1 AND status = 'ACTIVE'",
            )
            .bind(id)
            .bind(change.ticket_id)
            .bind(&change.new_seat_code)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                return Err(format!("ticket {} not found", change.ticket_id).into());
            }
        }

        for update in passenger_updates {
            let result = sqlx::query(
                "UPDATE passenger_tickets
                 SET full_name = COALESCE($3, full_name),
                     document_id = COALESCE($4, document_id),
                     phone = COALESCE($5, phone)
                 WHERE id = $2 AND booking_id = $1",
            )
            .bind(id)
            .bind(update.ticket_id)
            .bind(&update.full_name)
            .bind(&update.document_id)
            .bind(&update.phone)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                return Err(format!("ticket {} not found", update.ticket_id).into());
            }
        }

        sqlx::query("UPDATE bookings SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_ticket_artifacts(
        &self,
        id: Uuid,
        ticket_url: &str,
        qr_code: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE bookings SET ticket_url = $2, qr_code = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(ticket_url)
        .bind(qr_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    route: String,
    departure_time: DateTime<Utc>,
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn find_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query_as::<_, TripRow>(
            "SELECT id, route, departure_time FROM trips WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Trip {
            id: r.id,
            route: r.route,
            departure_time: r.departure_time,
        }))
    }
}
