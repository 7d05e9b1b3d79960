use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::cui::CuiError;
use crate::repository::StoreError;

/// Errors surfaced by reservation creation. Request-level variants carry
/// enough context (seat, date, destination) for the caller to act; store
/// failures roll the whole transaction back before reaching here.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid reservation request: {0}")]
    InvalidRequest(String),

    #[error("flight {0} not found or inactive")]
    FlightNotFound(Uuid),

    #[error("seat {0} does not exist in the cabin layout")]
    SeatNotFound(String),

    #[error("seat {seat} is not available for {destination} on {date}")]
    SeatUnavailable {
        seat: String,
        date: NaiveDate,
        destination: String,
    },

    #[error("invalid CUI for passenger {passenger}: {reason}")]
    InvalidCui {
        passenger: String,
        #[source]
        reason: CuiError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Folds the store-level seat conflict into the caller-visible
    /// `SeatUnavailable`, leaving other store failures opaque.
    pub fn from_commit(err: StoreError) -> Self {
        match err {
            StoreError::SeatTaken {
                seat,
                date,
                destination,
            } => BookingError::SeatUnavailable {
                seat,
                date,
                destination,
            },
            other => BookingError::Store(other),
        }
    }
}
