use std::sync::Arc;

use chrono::NaiveDate;

use quetzal_core::models::Seat;
use quetzal_core::{BookingError, BookingStore};

/// Answers "is this seat free for that flight date and destination?".
///
/// Occupancy is a compound condition: a passenger row holding the label,
/// joined through its reservation to a flight with the same destination,
/// on the same departure date. The same label is legitimately reused
/// across other dates and destinations.
///
/// This pre-check keeps obviously conflicting requests out of the commit
/// path; the store repeats it inside the commit transaction, which is
/// what actually arbitrates concurrent bookings.
pub struct SeatAvailability {
    store: Arc<dyn BookingStore>,
}

impl SeatAvailability {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Resolves the seat from the catalog and verifies it is free for the
    /// (date, destination) pair. Returns the catalog seat so callers can
    /// price it without a second lookup.
    pub async fn ensure_free(
        &self,
        seat_label: &str,
        date: NaiveDate,
        destination: &str,
    ) -> Result<Seat, BookingError> {
        let seat = self
            .store
            .seat(seat_label)
            .await?
            .ok_or_else(|| BookingError::SeatNotFound(seat_label.to_string()))?;

        if self.store.seat_occupied(seat_label, date, destination).await? {
            return Err(BookingError::SeatUnavailable {
                seat: seat_label.to_string(),
                date,
                destination: destination.to_string(),
            });
        }

        Ok(seat)
    }

    /// Free seats of the whole catalog for a (date, destination) pair, in
    /// catalog order.
    pub async fn free_seats(
        &self,
        catalog: &[Seat],
        date: NaiveDate,
        destination: &str,
    ) -> Result<Vec<Seat>, BookingError> {
        let mut free = Vec::new();
        for seat in catalog {
            if !self.store.seat_occupied(&seat.label, date, destination).await? {
                free.push(seat.clone());
            }
        }
        Ok(free)
    }
}
