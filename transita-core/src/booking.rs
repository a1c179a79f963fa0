use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use transita_shared::Masked;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UNPAID" => Some(PaymentStatus::Unpaid),
            "PAID" => Some(PaymentStatus::Paid),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Status of an individual passenger ticket row. Cancelled rows stay in the
/// durable store (never deleted) so the seat-occupancy history survives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Active,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "ACTIVE",
            TicketStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(TicketStatus::Active),
            "CANCELLED" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }
}

/// The system of record for a reservation. Owns its passenger tickets; both
/// are written in the same durable transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub trip_id: Uuid,
    /// None for guest checkouts.
    pub user_id: Option<Uuid>,
    pub contact_email: Masked<String>,
    pub contact_phone: Option<Masked<String>>,
    pub subtotal: i64,
    pub service_fee: i64,
    pub total_price: i64,
    pub payment_method: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Soft hold expiry mirrored from the advisory seat locks.
    pub locked_until: DateTime<Utc>,
    pub ticket_url: Option<String>,
    pub qr_code: Option<String>,
    pub refund_amount: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub passengers: Vec<PassengerTicket>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Seat codes of the active (non-cancelled) tickets.
    pub fn seat_codes(&self) -> Vec<String> {
        self.passengers
            .iter()
            .filter(|p| p.status == TicketStatus::Active)
            .map(|p| p.seat_code.clone())
            .collect()
    }

    pub fn ticket(&self, ticket_id: Uuid) -> Option<&PassengerTicket> {
        self.passengers.iter().find(|p| p.id == ticket_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerTicket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub full_name: String,
    pub document_id: Option<String>,
    pub phone: Option<Masked<String>>,
    pub seat_code: String,
    pub price: i64,
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    /// None for guest checkouts; the reservation path is identical.
    pub user_id: Option<Uuid>,
    pub contact_email: Masked<String>,
    pub contact_phone: Option<Masked<String>>,
    pub payment_method: Option<String>,
    pub total_price: i64,
    pub passengers: Vec<PassengerInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassengerInput {
    pub full_name: String,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub seat_code: String,
    pub price: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingModifications {
    pub seat_changes: Vec<SeatChange>,
    pub passenger_updates: Vec<PassengerUpdate>,
}

impl BookingModifications {
    pub fn is_empty(&self) -> bool {
        self.seat_changes.is_empty() && self.passenger_updates.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeatChange {
    pub ticket_id: Uuid,
    pub new_seat_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassengerUpdate {
    pub ticket_id: Uuid,
    pub full_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
}
