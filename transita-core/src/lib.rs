pub mod booking;
pub mod repository;
pub mod rules;
pub mod trip;

/// Failure taxonomy for the reservation core. Every variant carries a stable
/// machine-readable code so callers at the API boundary can map it without
/// string matching.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Seats already booked: {}", .seats.join(", "))]
    SeatsAlreadyBooked { seats: Vec<String> },

    #[error("Seats currently held by another checkout: {}", .seats.join(", "))]
    SeatsCurrentlyLocked { seats: Vec<String> },

    #[error("Booking reference space exhausted for the current day")]
    ReferenceExhausted,

    #[error("{reason}")]
    PolicyRejection { reason: String },

    #[error("Durable store failure: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl ReservationError {
    pub fn code(&self) -> &'static str {
        match self {
            ReservationError::SeatsAlreadyBooked { .. } => "SEATS_ALREADY_BOOKED",
            ReservationError::SeatsCurrentlyLocked { .. } => "SEATS_CURRENTLY_LOCKED",
            ReservationError::ReferenceExhausted => "REFERENCE_EXHAUSTED",
            ReservationError::PolicyRejection { .. } => "POLICY_REJECTED",
            ReservationError::Persistence(_) => "PERSISTENCE_FAILURE",
            ReservationError::NotFound(_) => "NOT_FOUND",
            ReservationError::Validation(_) => "VALIDATION_FAILED",
        }
    }

    /// Conflicts are retryable by the client with a different seat selection,
    /// never automatically.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ReservationError::SeatsAlreadyBooked { .. }
                | ReservationError::SeatsCurrentlyLocked { .. }
        )
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
