use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, ExportRow, Flight, NewAccount, Reservation, ReservationDraft, Seat};

/// Failures from the persistence layer. `SeatTaken` is the one conflict a
/// backend must report with full context: it is how the losing side of a
/// concurrent booking race learns which seat collided.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seat {seat} is taken for {destination} on {date}")]
    SeatTaken {
        seat: String,
        date: NaiveDate,
        destination: String,
    },

    #[error("account {0} does not exist")]
    AccountMissing(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Data access required by the booking core.
///
/// `commit_reservation` is the single atomic unit of work: implementations
/// must re-check every seat of the draft against its (departure date,
/// destination) pair inside the same transaction that inserts the
/// reservation and passenger rows, so that two concurrent commits of the
/// same seat cannot both succeed. On conflict nothing is persisted and
/// `SeatTaken` is returned.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn flight(&self, id: Uuid) -> Result<Option<Flight>, StoreError>;

    async fn seat(&self, label: &str) -> Result<Option<Seat>, StoreError>;

    /// The full seat catalog in cabin order.
    async fn seats(&self) -> Result<Vec<Seat>, StoreError>;

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// True iff a passenger row, joined through its reservation to its
    /// flight, matches all of (seat label, departure date, destination).
    async fn seat_occupied(
        &self,
        seat_label: &str,
        date: NaiveDate,
        destination: &str,
    ) -> Result<bool, StoreError>;

    /// Atomically persists the draft: reservation row, passenger rows,
    /// loyalty counter bump (when requested) and the VIP flip once the
    /// counter reaches the draft's threshold. Returns the hydrated
    /// reservation.
    async fn commit_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, StoreError>;

    /// Every passenger row joined to its reservation and account, ordered
    /// by reservation creation time descending.
    async fn export_rows(&self) -> Result<Vec<ExportRow>, StoreError>;
}
